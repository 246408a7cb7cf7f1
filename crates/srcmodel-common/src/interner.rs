//! Name table for identifier deduplication.
//!
//! Declarations, definitions and expressions never hold `String`s for
//! names. Every identifier is interned once into a [`NameTable`] and passed
//! around as an [`Atom`], so name comparison during aggregation and lookup
//! is an integer comparison.
//!
//! The table is sharded and thread-safe because names are also produced
//! lazily (synthesized accessors such as `get_Length`) from whichever
//! thread first touches a cache.

use rustc_hash::{FxHashMap, FxHasher};
use serde::Serialize;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

/// An interned name.
///
/// Atoms are cheap to copy and compare. To get the text, use
/// [`NameTable::resolve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Default, PartialOrd, Ord)]
pub struct Atom(pub u32);

impl Atom {
    /// The empty name.
    pub const NONE: Atom = Atom(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

const SHARD_BITS: u32 = 5;
const SHARD_COUNT: usize = 1 << SHARD_BITS;
const SHARD_MASK: u32 = (SHARD_COUNT as u32) - 1;

/// Names the aggregator and synthesizer ask for by text.
const WELL_KNOWN_NAMES: &[&str] = &[
    ".ctor",
    ".cctor",
    "Invoke",
    "BeginInvoke",
    "EndInvoke",
    "object",
    "method",
    "callback",
    "result",
    "value",
    "value__",
];

#[derive(Default)]
struct Shard {
    map: FxHashMap<Arc<str>, Atom>,
    strings: Vec<Arc<str>>,
}

/// Sharded name interner with a case-folding side table.
pub struct NameTable {
    shards: [RwLock<Shard>; SHARD_COUNT],
    folded: RwLock<FxHashMap<Atom, Atom>>,
}

impl NameTable {
    /// Create a table with the empty name pre-interned as [`Atom::NONE`].
    pub fn new() -> Self {
        let shards: [RwLock<Shard>; SHARD_COUNT] = std::array::from_fn(|_| RwLock::default());
        {
            let mut first = shards[0].write().unwrap_or_else(PoisonError::into_inner);
            let empty: Arc<str> = Arc::from("");
            first.strings.push(empty.clone());
            first.map.insert(empty, Atom::NONE);
        }
        let table = NameTable {
            shards,
            folded: RwLock::new(FxHashMap::default()),
        };
        for name in WELL_KNOWN_NAMES {
            table.intern(name);
        }
        table
    }

    /// Intern `s`, returning the existing atom if it was seen before.
    pub fn intern(&self, s: &str) -> Atom {
        if s.is_empty() {
            return Atom::NONE;
        }
        let shard_idx = Self::shard_for(s);
        {
            let shard = self.shards[shard_idx]
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(&atom) = shard.map.get(s) {
                return atom;
            }
        }
        let mut shard = self.shards[shard_idx]
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(&atom) = shard.map.get(s) {
            return atom;
        }
        let local_index = shard.strings.len() as u32;
        if local_index > (u32::MAX >> SHARD_BITS) {
            tracing::warn!(name = s, "name table shard overflow");
            return Atom::NONE;
        }
        let atom = Atom((local_index << SHARD_BITS) | (shard_idx as u32 & SHARD_MASK));
        let owned: Arc<str> = Arc::from(s);
        shard.strings.push(owned.clone());
        shard.map.insert(owned, atom);
        atom
    }

    /// Resolve an atom to its text. Unknown atoms resolve to `""`.
    pub fn resolve(&self, atom: Atom) -> Arc<str> {
        self.try_resolve(atom).unwrap_or_else(|| Arc::from(""))
    }

    pub fn try_resolve(&self, atom: Atom) -> Option<Arc<str>> {
        if atom.is_none() {
            return Some(Arc::from(""));
        }
        let shard_idx = (atom.0 & SHARD_MASK) as usize;
        let local_index = (atom.0 >> SHARD_BITS) as usize;
        let shard = self
            .shards
            .get(shard_idx)?
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        shard.strings.get(local_index).cloned()
    }

    /// The case-folded key of `atom`, used by case-insensitive lookups.
    ///
    /// Two names that differ only in letter case fold to the same atom.
    pub fn folded(&self, atom: Atom) -> Atom {
        if let Some(&key) = self
            .folded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&atom)
        {
            return key;
        }
        let text = self.resolve(atom);
        let lowered = text.to_lowercase();
        let key = if *text == *lowered {
            atom
        } else {
            self.intern(&lowered)
        };
        self.folded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(atom, key);
        key
    }

    /// Total number of interned names, including the empty name.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .read()
                    .map(|state| state.strings.len())
                    .unwrap_or(0)
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    #[inline]
    fn shard_for(s: &str) -> usize {
        let mut hasher = FxHasher::default();
        s.hash(&mut hasher);
        (hasher.finish() as usize) & (SHARD_COUNT - 1)
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NameTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameTable").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
#[path = "../tests/interner_tests.rs"]
mod tests;
