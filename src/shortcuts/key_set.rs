//! Order-independent key chord value type.

use std::fmt;

use smallvec::SmallVec;

use crate::error::KeySetError;
use crate::shortcuts::Key;

/// An unordered, duplicate-free set of keys representing a chord.
///
/// Storage is kept sorted, so the derived `Eq`/`Hash` are pure functions of
/// membership: two sets built from the same keys in different orders are
/// interchangeable as map keys. Chords are 1-4 keys in practice; inline
/// storage avoids heap allocation for them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeySet {
    keys: SmallVec<[Key; 4]>,
}

impl KeySet {
    /// Build a chord from explicitly listed keys.
    ///
    /// Fails with [`KeySetError::DuplicateKey`] if any two supplied keys are
    /// identical - an explicit chord listing the same key twice is a caller
    /// bug, not a set to silently collapse.
    pub fn new(keys: &[Key]) -> Result<Self, KeySetError> {
        if keys.is_empty() {
            return Err(KeySetError::Empty);
        }
        let mut sorted: SmallVec<[Key; 4]> = keys.iter().copied().collect();
        sorted.sort_unstable();
        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                return Err(KeySetError::DuplicateKey(pair[0].canonical_token()));
            }
        }
        Ok(Self { keys: sorted })
    }

    /// Build a chord from an arbitrary collection with set semantics:
    /// duplicates collapse, but an empty collection is rejected.
    pub fn from_keys(keys: impl IntoIterator<Item = Key>) -> Result<Self, KeySetError> {
        let mut sorted: SmallVec<[Key; 4]> = keys.into_iter().collect();
        if sorted.is_empty() {
            return Err(KeySetError::Empty);
        }
        sorted.sort_unstable();
        sorted.dedup();
        Ok(Self { keys: sorted })
    }

    /// Single-key chord.
    pub fn single(key: Key) -> Self {
        Self {
            keys: smallvec::smallvec![key],
        }
    }

    /// Immutable view of the members, in storage (sorted) order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn contains(&self, key: Key) -> bool {
        self.keys.binary_search(&key).is_ok()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Project each member onto its first synonym, keeping keys that have
    /// none. `ShiftLeft` becomes `Shift`; `Char('s')` stays.
    ///
    /// Substitution is deliberately first-synonym-only with no combinatorial
    /// expansion; results that collide (both shift sides pressed) collapse
    /// under set semantics.
    pub fn with_synonyms(&self) -> KeySet {
        let mut mapped: SmallVec<[Key; 4]> = self
            .keys
            .iter()
            .map(|key| key.synonyms().first().copied().unwrap_or(*key))
            .collect();
        mapped.sort_unstable();
        mapped.dedup();
        Self { keys: mapped }
    }

    /// True if any member has a synonym, i.e. the normalized projection can
    /// differ from this set.
    pub fn has_synonym_members(&self) -> bool {
        self.keys.iter().any(|key| !key.synonyms().is_empty())
    }
}

impl From<Key> for KeySet {
    fn from(key: Key) -> Self {
        Self::single(key)
    }
}

impl fmt::Display for KeySet {
    /// Canonical chord string: modifiers first, then remaining keys, each
    /// group alphabetical by token, joined with '+'.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens: Vec<(bool, String)> = self
            .keys
            .iter()
            .map(|key| (!key.is_modifier(), key.canonical_token()))
            .collect();
        tokens.sort();
        let joined: Vec<String> = tokens.into_iter().map(|(_, token)| token).collect();
        write!(f, "{}", joined.join("+"))
    }
}
