//! Binding layer between a focus-aware key-event source and a
//! [`ShortcutManager`].
//!
//! A scope either owns its manager or adopts one shared with other parts of
//! the host. Ownership decides teardown: an owned manager drops with the
//! scope, an adopted one merely loses a reference. Nested scopes form an
//! independent chain - when an event is not consumed here the host is
//! expected to offer it to the ancestor scope.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::shortcuts::{
    IntentDispatcher, KeyEvent, KeySet, PressedKeySource, ShortcutManager,
};

/// What the host should do with a key event after offering it to a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Event was handled here (or swallowed by a modal manager); ancestors
    /// must not see it.
    Consumed,
    /// Not handled; offer it to the ancestor scope.
    Propagate,
}

enum ManagerHandle<I> {
    Owned(ShortcutManager<I>),
    Adopted(Rc<RefCell<ShortcutManager<I>>>),
}

/// A focus-scoped shortcut binding site.
pub struct ShortcutScope<I> {
    manager: ManagerHandle<I>,
}

impl<I> Default for ShortcutScope<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> ShortcutScope<I> {
    /// Create a scope owning a fresh, empty manager.
    pub fn new() -> Self {
        Self {
            manager: ManagerHandle::Owned(ShortcutManager::new()),
        }
    }

    /// Create a scope owning a manager pre-loaded with `table`.
    pub fn with_table(table: HashMap<KeySet, I>) -> Self {
        Self {
            manager: ManagerHandle::Owned(ShortcutManager::with_table(table)),
        }
    }

    /// Adopt an externally owned manager. The scope never tears it down;
    /// dropping the scope only releases this reference.
    pub fn adopt(manager: Rc<RefCell<ShortcutManager<I>>>) -> Self {
        Self {
            manager: ManagerHandle::Adopted(manager),
        }
    }

    pub fn is_modal(&self) -> bool {
        match &self.manager {
            ManagerHandle::Owned(m) => m.modal(),
            ManagerHandle::Adopted(m) => m.borrow().modal(),
        }
    }

    pub fn set_modal(&mut self, modal: bool) {
        match &mut self.manager {
            ManagerHandle::Owned(m) => m.set_modal(modal),
            ManagerHandle::Adopted(m) => m.borrow_mut().set_modal(modal),
        }
    }
}

impl<I: Clone + PartialEq + std::fmt::Debug> ShortcutScope<I> {
    /// Push the scope's configured table down to the manager. The manager
    /// compares by value, so re-supplying an equal table (as retained-UI
    /// rebuilds do on every pass) notifies nobody.
    pub fn set_table(&mut self, table: HashMap<KeySet, I>) {
        match &mut self.manager {
            ManagerHandle::Owned(m) => m.set_table(table),
            ManagerHandle::Adopted(m) => m.borrow_mut().set_table(table),
        }
    }

    /// Offer a raw key event to this scope.
    ///
    /// Consumed when the manager handled it, or when the manager is modal
    /// and the event is a key-down (modal managers swallow every key-down,
    /// matched or not). Key-up and repeat events always propagate.
    pub fn on_key_event(
        &self,
        event: &KeyEvent,
        source: &dyn PressedKeySource,
        dispatcher: &mut dyn IntentDispatcher<I>,
    ) -> KeyDisposition {
        let (handled, modal) = match &self.manager {
            ManagerHandle::Owned(m) => (
                m.handle_keypress(event, source, dispatcher, None),
                m.modal(),
            ),
            ManagerHandle::Adopted(m) => {
                let m = m.borrow();
                (
                    m.handle_keypress(event, source, dispatcher, None),
                    m.modal(),
                )
            }
        };

        if handled || (modal && event.is_down()) {
            KeyDisposition::Consumed
        } else {
            KeyDisposition::Propagate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcuts::{FocusTargetId, Key, KeyEventKind};

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Open;

    struct Keys(Vec<Key>);

    impl PressedKeySource for Keys {
        fn pressed_keys(&self) -> Vec<Key> {
            self.0.clone()
        }
    }

    struct Sink {
        invoked: usize,
    }

    impl IntentDispatcher<Open> for Sink {
        fn focused_target(&self) -> Option<FocusTargetId> {
            Some(FocusTargetId(7))
        }

        fn invoke(&mut self, _target: FocusTargetId, _intent: &Open) -> bool {
            self.invoked += 1;
            true
        }
    }

    fn open_table() -> HashMap<KeySet, Open> {
        let mut table = HashMap::new();
        table.insert(KeySet::new(&[Key::Meta, Key::Char('o')]).unwrap(), Open);
        table
    }

    #[test]
    fn matched_event_is_consumed() {
        let scope = ShortcutScope::with_table(open_table());
        let source = Keys(vec![Key::Meta, Key::Char('o')]);
        let mut sink = Sink { invoked: 0 };

        let disposition = scope.on_key_event(&KeyEvent::down(Key::Char('o')), &source, &mut sink);
        assert_eq!(disposition, KeyDisposition::Consumed);
        assert_eq!(sink.invoked, 1);
    }

    #[test]
    fn unmatched_event_propagates_when_not_modal() {
        let scope = ShortcutScope::with_table(open_table());
        let source = Keys(vec![Key::Char('z')]);
        let mut sink = Sink { invoked: 0 };

        let disposition = scope.on_key_event(&KeyEvent::down(Key::Char('z')), &source, &mut sink);
        assert_eq!(disposition, KeyDisposition::Propagate);
        assert_eq!(sink.invoked, 0);
    }

    #[test]
    fn modal_scope_swallows_unmatched_key_down() {
        let mut scope = ShortcutScope::with_table(open_table());
        scope.set_modal(true);
        let source = Keys(vec![Key::Char('z')]);
        let mut sink = Sink { invoked: 0 };

        let disposition = scope.on_key_event(&KeyEvent::down(Key::Char('z')), &source, &mut sink);
        assert_eq!(disposition, KeyDisposition::Consumed);
        assert_eq!(sink.invoked, 0);
    }

    #[test]
    fn modal_scope_still_propagates_key_up() {
        let mut scope = ShortcutScope::with_table(open_table());
        scope.set_modal(true);
        let source = Keys(vec![]);
        let mut sink = Sink { invoked: 0 };

        let up = KeyEvent::up(Key::Char('z'));
        assert_eq!(
            scope.on_key_event(&up, &source, &mut sink),
            KeyDisposition::Propagate
        );
        let repeat = KeyEvent {
            key: Key::Char('z'),
            kind: KeyEventKind::Repeat,
        };
        assert_eq!(
            scope.on_key_event(&repeat, &source, &mut sink),
            KeyDisposition::Propagate
        );
    }

    #[test]
    fn adopted_manager_survives_scope_teardown() {
        let shared = Rc::new(RefCell::new(ShortcutManager::with_table(open_table())));
        let scope = ShortcutScope::adopt(shared.clone());
        drop(scope);

        // Still usable by other scopes afterwards.
        assert_eq!(Rc::strong_count(&shared), 1);
        let scope = ShortcutScope::adopt(shared.clone());
        let source = Keys(vec![Key::Meta, Key::Char('o')]);
        let mut sink = Sink { invoked: 0 };
        let disposition = scope.on_key_event(&KeyEvent::down(Key::Char('o')), &source, &mut sink);
        assert_eq!(disposition, KeyDisposition::Consumed);
    }

    #[test]
    fn table_updates_through_scope_reach_shared_manager() {
        let shared = Rc::new(RefCell::new(ShortcutManager::<Open>::new()));
        let mut scope = ShortcutScope::adopt(shared.clone());
        scope.set_table(open_table());
        assert_eq!(shared.borrow().table().len(), 1);
    }
}
