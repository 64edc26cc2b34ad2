//! Chord string parsing and serde support for [`KeySet`].
//!
//! Chords round-trip through the canonical form produced by
//! `KeySet::to_string()` ("ctrl+shift+k"); parsing additionally accepts
//! common alias tokens ("control", "esc", "pgup", "⌘", ...) and whitespace
//! as a separator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::error::KeySetError;
use crate::shortcuts::{Key, KeySet};

/// Errors from parsing a chord string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShortcutParseError {
    #[error("chord string is empty")]
    Empty,
    #[error("unknown token '{0}' in chord")]
    UnknownToken(String),
    #[error(transparent)]
    Invalid(#[from] KeySetError),
}

/// Parse a single chord token into a key.
pub fn parse_key_token(token: &str) -> Option<Key> {
    let token = token.to_lowercase();
    let key = match token.as_str() {
        "shift" | "shft" | "⇧" => Key::Shift,
        "ctrl" | "control" | "ctl" | "^" => Key::Control,
        "alt" | "opt" | "option" | "⌥" => Key::Alt,
        "meta" | "cmd" | "command" | "super" | "win" | "⌘" => Key::Meta,
        "shiftleft" | "leftshift" | "lshift" => Key::ShiftLeft,
        "shiftright" | "rightshift" | "rshift" => Key::ShiftRight,
        "ctrlleft" | "leftctrl" | "lctrl" => Key::ControlLeft,
        "ctrlright" | "rightctrl" | "rctrl" => Key::ControlRight,
        "altleft" | "leftalt" | "lalt" => Key::AltLeft,
        "altright" | "rightalt" | "ralt" => Key::AltRight,
        "metaleft" | "leftmeta" | "lmeta" => Key::MetaLeft,
        "metaright" | "rightmeta" | "rmeta" => Key::MetaRight,
        "enter" | "return" => Key::Enter,
        "escape" | "esc" => Key::Escape,
        "tab" => Key::Tab,
        "space" => Key::Space,
        "backspace" | "back" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "up" | "arrowup" | "uparrow" => Key::Up,
        "down" | "arrowdown" | "downarrow" => Key::Down,
        "left" | "arrowleft" | "leftarrow" => Key::Left,
        "right" | "arrowright" | "rightarrow" => Key::Right,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" | "pgup" => Key::PageUp,
        "pagedown" | "pgdn" | "pgdown" => Key::PageDown,
        "slash" | "/" | "forwardslash" => Key::Char('/'),
        "backslash" | "\\" => Key::Char('\\'),
        "semicolon" | ";" => Key::Char(';'),
        "quote" | "'" | "apostrophe" => Key::Char('\''),
        "comma" | "," => Key::Char(','),
        "period" | "." | "dot" => Key::Char('.'),
        "bracketleft" | "[" | "leftbracket" => Key::Char('['),
        "bracketright" | "]" | "rightbracket" => Key::Char(']'),
        "minus" | "-" | "dash" | "hyphen" => Key::Char('-'),
        "equal" | "=" | "equals" => Key::Char('='),
        "backquote" | "`" | "backtick" | "grave" => Key::Char('`'),
        _ => {
            if let Some(n) = token.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                if (1..=12).contains(&n) {
                    return Some(Key::F(n));
                }
                return None;
            }
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => Key::Char(c),
                _ => return None,
            }
        }
    };
    Some(key)
}

impl FromStr for KeySet {
    type Err = ShortcutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('+', " ");
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(ShortcutParseError::Empty);
        }
        let mut keys = Vec::with_capacity(tokens.len());
        for token in tokens {
            let key = parse_key_token(token)
                .ok_or_else(|| ShortcutParseError::UnknownToken(token.to_string()))?;
            keys.push(key);
        }
        // Explicit constructor so "ctrl+ctrl+s" is flagged as a duplicate
        // rather than silently collapsed.
        Ok(KeySet::new(&keys)?)
    }
}

impl Serialize for KeySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for KeySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChordVisitor;

        impl serde::de::Visitor<'_> for ChordVisitor {
            type Value = KeySet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a chord string like 'ctrl+shift+k'")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<KeySet, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(ChordVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_chord() {
        let set: KeySet = "ctrl+shift+k".parse().unwrap();
        assert_eq!(
            set,
            KeySet::new(&[Key::Control, Key::Shift, Key::Char('k')]).unwrap()
        );
    }

    #[test]
    fn parses_aliases_and_whitespace() {
        let set: KeySet = "control shift K".parse().unwrap();
        assert_eq!(
            set,
            KeySet::new(&[Key::Control, Key::Shift, Key::Char('k')]).unwrap()
        );
        let set: KeySet = "cmd+return".parse().unwrap();
        assert_eq!(set, KeySet::new(&[Key::Meta, Key::Enter]).unwrap());
    }

    #[test]
    fn modifier_only_chord_is_valid() {
        let set: KeySet = "shift".parse().unwrap();
        assert_eq!(set, KeySet::single(Key::Shift));
    }

    #[test]
    fn empty_string_fails() {
        assert_eq!(
            "   ".parse::<KeySet>().unwrap_err(),
            ShortcutParseError::Empty
        );
    }

    #[test]
    fn unknown_token_fails() {
        assert_eq!(
            "ctrl+banana".parse::<KeySet>().unwrap_err(),
            ShortcutParseError::UnknownToken("banana".to_string())
        );
    }

    #[test]
    fn duplicate_token_fails() {
        assert!(matches!(
            "ctrl+ctrl+s".parse::<KeySet>().unwrap_err(),
            ShortcutParseError::Invalid(KeySetError::DuplicateKey(_))
        ));
    }

    #[test]
    fn out_of_range_function_key_fails() {
        assert!("f13".parse::<KeySet>().is_err());
    }

    #[test]
    fn display_round_trip() {
        for chord in ["ctrl+shift+k", "alt+tab", "shift", "meta+slash", "f5"] {
            let set: KeySet = chord.parse().unwrap();
            assert_eq!(set.to_string(), chord);
            let reparsed: KeySet = set.to_string().parse().unwrap();
            assert_eq!(set, reparsed);
        }
    }

    #[test]
    fn serde_round_trip() {
        let set: KeySet = "ctrl+s".parse().unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "\"ctrl+s\"");
        let back: KeySet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
