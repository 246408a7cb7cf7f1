//! Compute-once caches for derived properties.
//!
//! Every expensive or cross-referencing derived value in the object model
//! (resolved base types, member lists, synthesized members, alias tables,
//! attribute lists, instance types) lives in a [`LazyCache`]. A cache is
//! read without locking once filled and is never cleared.
//!
//! Three ways to fill a cache:
//!
//! - [`LazyCache::get_or_init`] takes the cache's own lock. Use it only for
//!   computations that never touch another unfinished object.
//! - [`LazyCache::get_or_init_racy`] takes no lock. Racing threads may all
//!   compute, the first stored value wins. Only for pure computations.
//! - [`LazyCache::get_or_try_init_locked`] takes the unit's [`BuildLock`].
//!   Use it for anything that may recursively fill caches of other objects
//!   in the same unit. Same-thread re-entry into the same cache returns
//!   [`Reentrant`] instead of recursing forever.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

/// A locked computation asked for its own value while computing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reentrant;

impl std::fmt::Display for Reentrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("lazy value requested while it was being computed")
    }
}

impl std::error::Error for Reentrant {}

pub struct LazyCache<T> {
    cell: OnceCell<T>,
    computing: AtomicBool,
}

impl<T> LazyCache<T> {
    pub const fn new() -> Self {
        LazyCache {
            cell: OnceCell::new(),
            computing: AtomicBool::new(false),
        }
    }

    /// A cache that starts out filled.
    pub fn with_value(value: T) -> Self {
        LazyCache {
            cell: OnceCell::with_value(value),
            computing: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    #[inline]
    pub fn is_computed(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Per-object lock: racing readers block until the single computation
    /// finishes.
    pub fn get_or_init(&self, f: impl FnOnce() -> T) -> &T {
        self.cell.get_or_init(f)
    }

    /// No lock: the value may be computed more than once, only the first
    /// stored result is ever observed.
    pub fn get_or_init_racy(&self, f: impl FnOnce() -> T) -> &T {
        if let Some(value) = self.cell.get() {
            return value;
        }
        let value = f();
        self.cell.get_or_init(|| value)
    }

    /// Coarse lock: double-checked under the unit's build lock.
    pub fn get_or_try_init_locked(
        &self,
        lock: &BuildLock,
        f: impl FnOnce() -> T,
    ) -> Result<&T, Reentrant> {
        self.try_get_or_init_locked(lock, || Ok(f()))
    }

    /// Like [`get_or_try_init_locked`](Self::get_or_try_init_locked) for
    /// computations that can themselves hit a re-entered cache. An `Err`
    /// from `f` is passed through and nothing is stored.
    pub fn try_get_or_init_locked(
        &self,
        lock: &BuildLock,
        f: impl FnOnce() -> Result<T, Reentrant>,
    ) -> Result<&T, Reentrant> {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        let _guard = lock.enter();
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        if self.computing.swap(true, Ordering::AcqRel) {
            tracing::debug!("lazy cache re-entered on the same thread");
            return Err(Reentrant);
        }
        let _reset = ClearOnDrop(&self.computing);
        let value = f()?;
        Ok(self.cell.get_or_init(|| value))
    }
}

impl<T> Default for LazyCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for LazyCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("LazyCache").field(value).finish(),
            None => f.write_str("LazyCache(<pending>)"),
        }
    }
}

struct ClearOnDrop<'a>(&'a AtomicBool);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Re-entrant lock serializing cross-referential construction in one unit.
///
/// Only one thread builds at a time; the owning thread may enter again
/// while it already holds the lock. Units have independent locks, so
/// separate compilations never contend.
#[derive(Debug, Default)]
pub struct BuildLock {
    owner: Mutex<Option<(ThreadId, u32)>>,
    released: Condvar,
}

impl BuildLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until this thread owns the lock. Released when the guard drops.
    pub fn enter(&self) -> BuildLockGuard<'_> {
        let me = thread::current().id();
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match *owner {
                None => {
                    *owner = Some((me, 1));
                    break;
                }
                Some((thread, depth)) if thread == me => {
                    *owner = Some((me, depth + 1));
                    break;
                }
                Some(_) => {
                    owner = self
                        .released
                        .wait(owner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        BuildLockGuard { lock: self }
    }

    /// True when the calling thread currently holds the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        let me = thread::current().id();
        matches!(
            *self.owner.lock().unwrap_or_else(PoisonError::into_inner),
            Some((thread, _)) if thread == me
        )
    }

    fn exit(&self) {
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        let released = match *owner {
            Some((thread, depth)) if depth > 1 => {
                *owner = Some((thread, depth - 1));
                false
            }
            _ => {
                *owner = None;
                true
            }
        };
        if released {
            drop(owner);
            self.released.notify_all();
        }
    }
}

#[must_use]
pub struct BuildLockGuard<'a> {
    lock: &'a BuildLock,
}

impl Drop for BuildLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.exit();
    }
}

#[cfg(test)]
#[path = "../tests/lazy_tests.rs"]
mod tests;
