//! Logical key identifiers and the modifier synonym table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A logical key identifier as reported by the platform key source.
///
/// Side-specific modifiers (`ShiftLeft`, `ShiftRight`, ...) are what
/// platforms actually report as pressed; the generic forms (`Shift`,
/// `Control`, ...) exist so tables can bind "any shift" without enumerating
/// both sides. Dispatch bridges the two via [`Key::synonyms`].
///
/// `Ord` is derived so key sets can keep sorted storage; the ordering itself
/// carries no meaning.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Key {
    // Generic modifiers (synonym targets).
    Shift,
    Control,
    Alt,
    Meta,
    // Side-specific modifiers.
    ShiftLeft,
    ShiftRight,
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,
    MetaLeft,
    MetaRight,
    // Named keys.
    Enter,
    Escape,
    Tab,
    Space,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// Function keys F1..=F12.
    F(u8),
    /// Printable character key, stored lowercase.
    Char(char),
}

impl Key {
    /// Canonical synonyms for this key, used for fallback shortcut matching.
    ///
    /// A side-specific modifier maps to its generic counterpart; all other
    /// keys map to nothing. Matching substitutes only the first synonym per
    /// key (no key currently carries more than one), so the slice shape is
    /// kept even though every populated entry is a singleton today.
    pub fn synonyms(&self) -> &'static [Key] {
        match self {
            Key::ShiftLeft | Key::ShiftRight => &[Key::Shift],
            Key::ControlLeft | Key::ControlRight => &[Key::Control],
            Key::AltLeft | Key::AltRight => &[Key::Alt],
            Key::MetaLeft | Key::MetaRight => &[Key::Meta],
            _ => &[],
        }
    }

    /// True for any modifier key, side-specific or generic.
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Key::Shift
                | Key::Control
                | Key::Alt
                | Key::Meta
                | Key::ShiftLeft
                | Key::ShiftRight
                | Key::ControlLeft
                | Key::ControlRight
                | Key::AltLeft
                | Key::AltRight
                | Key::MetaLeft
                | Key::MetaRight
        )
    }

    /// Canonical token for chord strings ("ctrl", "shiftleft", "slash", "k").
    pub fn canonical_token(&self) -> String {
        match self {
            Key::Shift => "shift".into(),
            Key::Control => "ctrl".into(),
            Key::Alt => "alt".into(),
            Key::Meta => "meta".into(),
            Key::ShiftLeft => "shiftleft".into(),
            Key::ShiftRight => "shiftright".into(),
            Key::ControlLeft => "ctrlleft".into(),
            Key::ControlRight => "ctrlright".into(),
            Key::AltLeft => "altleft".into(),
            Key::AltRight => "altright".into(),
            Key::MetaLeft => "metaleft".into(),
            Key::MetaRight => "metaright".into(),
            Key::Enter => "enter".into(),
            Key::Escape => "escape".into(),
            Key::Tab => "tab".into(),
            Key::Space => "space".into(),
            Key::Backspace => "backspace".into(),
            Key::Delete => "delete".into(),
            Key::Up => "up".into(),
            Key::Down => "down".into(),
            Key::Left => "left".into(),
            Key::Right => "right".into(),
            Key::Home => "home".into(),
            Key::End => "end".into(),
            Key::PageUp => "pageup".into(),
            Key::PageDown => "pagedown".into(),
            Key::F(n) => format!("f{}", n),
            Key::Char(c) => match c {
                '/' => "slash".into(),
                '\\' => "backslash".into(),
                ';' => "semicolon".into(),
                '\'' => "quote".into(),
                ',' => "comma".into(),
                '.' => "period".into(),
                '[' => "bracketleft".into(),
                ']' => "bracketright".into(),
                '-' => "minus".into(),
                '=' => "equal".into(),
                '`' => "backquote".into(),
                c => c.to_string(),
            },
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_modifiers_map_to_generic() {
        assert_eq!(Key::ShiftLeft.synonyms(), &[Key::Shift]);
        assert_eq!(Key::ShiftRight.synonyms(), &[Key::Shift]);
        assert_eq!(Key::ControlRight.synonyms(), &[Key::Control]);
        assert_eq!(Key::AltLeft.synonyms(), &[Key::Alt]);
        assert_eq!(Key::MetaRight.synonyms(), &[Key::Meta]);
    }

    #[test]
    fn non_modifiers_have_no_synonyms() {
        assert!(Key::Char('a').synonyms().is_empty());
        assert!(Key::Enter.synonyms().is_empty());
        // Generic modifiers are already canonical.
        assert!(Key::Shift.synonyms().is_empty());
    }

    #[test]
    fn canonical_tokens() {
        assert_eq!(Key::Control.canonical_token(), "ctrl");
        assert_eq!(Key::Char('/').canonical_token(), "slash");
        assert_eq!(Key::Char('k').canonical_token(), "k");
        assert_eq!(Key::F(5).canonical_token(), "f5");
    }
}
