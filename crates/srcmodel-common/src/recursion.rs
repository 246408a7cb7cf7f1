//! Recursion guard for cycle detection and depth limiting.
//!
//! Used wherever a fold may chase references through user-written
//! declarations: enum initializers naming other members, base class chains,
//! alias targets naming other aliases. A cycle in the source is reported as
//! a diagnostic by the caller, never as a stack overflow.

use rustc_hash::FxHashSet;
use std::hash::Hash;

/// Result of attempting to enter a recursive computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionResult {
    Entered,
    /// This key is already being visited.
    Cycle,
    DepthExceeded,
}

impl RecursionResult {
    #[inline]
    pub fn is_entered(self) -> bool {
        matches!(self, Self::Entered)
    }

    #[inline]
    pub fn is_cycle(self) -> bool {
        matches!(self, Self::Cycle)
    }
}

/// Tracks the keys currently being visited.
///
/// Every successful [`enter`](Self::enter) must be paired with a
/// [`leave`](Self::leave) of the same key; [`scope`](Self::scope) does the
/// pairing for closures.
pub struct RecursionGuard<K: Hash + Eq + Copy> {
    visiting: FxHashSet<K>,
    depth: u32,
    max_depth: u32,
}

impl<K: Hash + Eq + Copy> RecursionGuard<K> {
    pub fn new(max_depth: u32) -> Self {
        Self {
            visiting: FxHashSet::default(),
            depth: 0,
            max_depth,
        }
    }

    pub fn enter(&mut self, key: K) -> RecursionResult {
        if self.depth >= self.max_depth {
            return RecursionResult::DepthExceeded;
        }
        if !self.visiting.insert(key) {
            return RecursionResult::Cycle;
        }
        self.depth += 1;
        RecursionResult::Entered
    }

    pub fn leave(&mut self, key: K) {
        let was_present = self.visiting.remove(&key);
        debug_assert!(
            was_present,
            "RecursionGuard::leave() called with a key that is not being visited"
        );
        self.depth = self.depth.saturating_sub(1);
    }

    /// Run `f` with `key` entered. `f` receives the guard back so nested
    /// steps can enter further keys.
    pub fn scope<T>(
        &mut self,
        key: K,
        f: impl FnOnce(&mut Self) -> T,
    ) -> Result<T, RecursionResult> {
        match self.enter(key) {
            RecursionResult::Entered => {
                let result = f(self);
                self.leave(key);
                Ok(result)
            }
            denied => Err(denied),
        }
    }

    #[inline]
    pub fn is_visiting(&self, key: &K) -> bool {
        self.visiting.contains(key)
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }
}

impl<K: Hash + Eq + Copy> Drop for RecursionGuard<K> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(
                self.visiting.is_empty(),
                "RecursionGuard dropped with {} active entries",
                self.visiting.len()
            );
        }
    }
}

#[cfg(test)]
#[path = "../tests/recursion_tests.rs"]
mod tests;
