//! Shortcut table ownership and key-event dispatch.
//!
//! [`ShortcutManager`] maps pressed-key chords to opaque intents and resolves
//! raw key-down events against that table. It performs no platform work
//! itself: the live pressed-key snapshot and the intent invocation sink are
//! threaded in explicitly per event, so nested scopes can share or chain
//! managers without any implicit tree lookup.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::shortcuts::{Key, KeySet};

/// Discriminant of a raw platform key event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
    /// Held-key auto-repeat. Never triggers dispatch.
    Repeat,
}

/// A raw key event as delivered by the platform key source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    pub fn down(key: Key) -> Self {
        Self {
            key,
            kind: KeyEventKind::Down,
        }
    }

    pub fn up(key: Key) -> Self {
        Self {
            key,
            kind: KeyEventKind::Up,
        }
    }

    pub fn is_down(&self) -> bool {
        self.kind == KeyEventKind::Down
    }
}

/// Live view of the platform's currently-pressed keys.
pub trait PressedKeySource {
    /// Snapshot of every key currently held down, in no particular order.
    fn pressed_keys(&self) -> Vec<Key>;
}

/// Opaque handle to the UI node that currently has focus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FocusTargetId(pub u64);

/// Invocation sink for matched intents.
///
/// The host resolves focus and performs the action. `invoke` reports whether
/// the intent was successfully invoked; a focus target with no handler
/// registered for the intent is a no-op success and must report `true`.
pub trait IntentDispatcher<I> {
    fn focused_target(&self) -> Option<FocusTargetId>;
    fn invoke(&mut self, target: FocusTargetId, intent: &I) -> bool;
}

/// A mapping from key chords to intents, plus the modal flag the owning
/// scope consults when deciding whether to swallow unmatched events.
pub struct ShortcutManager<I> {
    table: HashMap<KeySet, I>,
    modal: bool,
    observers: Vec<Box<dyn FnMut()>>,
}

impl<I> Default for ShortcutManager<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> ShortcutManager<I> {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
            modal: false,
            observers: Vec::new(),
        }
    }

    pub fn with_table(table: HashMap<KeySet, I>) -> Self {
        Self {
            table,
            modal: false,
            observers: Vec::new(),
        }
    }

    /// When true, the owning scope swallows every key-down event whether or
    /// not it matched, hiding it from ancestor scopes.
    pub fn modal(&self) -> bool {
        self.modal
    }

    pub fn set_modal(&mut self, modal: bool) {
        self.modal = modal;
    }

    pub fn table(&self) -> &HashMap<KeySet, I> {
        &self.table
    }

    /// Register a callback fired whenever the table's contents change.
    pub fn observe(&mut self, observer: Box<dyn FnMut()>) {
        self.observers.push(observer);
    }
}

impl<I: Clone + PartialEq + std::fmt::Debug> ShortcutManager<I> {
    /// Replace the table, notifying observers only if the new table differs
    /// from the old one by value (replacing with an equal table is silent).
    pub fn set_table(&mut self, table: HashMap<KeySet, I>) {
        if self.table == table {
            return;
        }
        self.table = table;
        debug!(bindings = self.table.len(), "shortcut table replaced");
        for observer in &mut self.observers {
            observer();
        }
    }

    /// Resolve a raw key event against the table and invoke the matched
    /// intent, if any, on the focused target.
    ///
    /// Only key-down events dispatch; key-up and auto-repeat always return
    /// false. The effective pressed set is `pressed_override` when supplied
    /// (tests, event replay), otherwise the source's live snapshot. A direct
    /// table lookup is tried first, then a synonym-normalized lookup so a
    /// binding on the generic `shift` matches either physical shift key.
    ///
    /// Read-only with respect to the table.
    pub fn handle_keypress(
        &self,
        event: &KeyEvent,
        source: &dyn PressedKeySource,
        dispatcher: &mut dyn IntentDispatcher<I>,
        pressed_override: Option<&KeySet>,
    ) -> bool {
        if !event.is_down() {
            return false;
        }

        let pressed = match pressed_override {
            Some(set) => set.clone(),
            None => match KeySet::from_keys(source.pressed_keys()) {
                Ok(set) => set,
                // Nothing reported down; nothing can match.
                Err(_) => return false,
            },
        };

        let intent = self.table.get(&pressed).or_else(|| {
            if pressed.has_synonym_members() {
                self.table.get(&pressed.with_synonyms())
            } else {
                None
            }
        });

        let Some(intent) = intent else {
            trace!(chord = %pressed, "no shortcut bound for chord");
            return false;
        };

        let Some(target) = dispatcher.focused_target() else {
            trace!(chord = %pressed, "shortcut matched but nothing has focus");
            return false;
        };

        debug!(chord = %pressed, intent = ?intent, "dispatching shortcut");
        dispatcher.invoke(target, intent)
    }
}
