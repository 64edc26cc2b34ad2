//! Keyboard shortcut dispatch.
//!
//! This module provides:
//! - [`Key`] / [`KeySet`] - order-independent chord identity
//! - [`ShortcutManager`] - chord table ownership and key-down dispatch,
//!   with synonym fallback so a binding on generic `shift` matches either
//!   physical shift key
//! - [`ShortcutScope`] - the binding layer between a platform key source
//!   and a manager, including modal swallowing
//! - chord string parsing and JSON persistence
//!
//! # Example
//!
//! ```ignore
//! use tapestry_ui::shortcuts::{Key, KeySet, ShortcutScope};
//!
//! let chord: KeySet = "ctrl+shift+k".parse()?;
//! let mut scope = ShortcutScope::with_table([(chord, MyIntent::Palette)].into());
//! // Host event loop: scope.on_key_event(&event, &platform_keys, &mut dispatcher)
//! ```

mod key;
mod key_set;
mod manager;
mod parse;
mod persistence;
mod scope;

pub use key::Key;
pub use key_set::KeySet;
pub use manager::{
    FocusTargetId, IntentDispatcher, KeyEvent, KeyEventKind, PressedKeySource, ShortcutManager,
};
pub use parse::{parse_key_token, ShortcutParseError};
pub use persistence::{default_table_path, PersistenceError, ShortcutTableFile};
pub use scope::{KeyDisposition, ShortcutScope};
