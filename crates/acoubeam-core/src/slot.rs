//! Swappable input handles and digest-guarded memo cells.
//!
//! A [`Slot`] is a shared, replaceable reference to an immutable value
//! snapshot. Cloning a slot shares it: replacing the value through one
//! clone is visible to every stage holding another clone, which is how an
//! upstream input is "reassigned" while downstream stages keep running.
//!
//! A [`Memo`] remembers the last `(digest, value)` pair a stage produced.
//! A lookup with a different digest misses; values are never mutated in
//! place, only replaced.

use crate::digest::Digest;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;

/// Shared handle to a replaceable immutable value.
pub struct Slot<T> {
    inner: Arc<RwLock<Arc<T>>>,
}

impl<T> Slot<T> {
    /// Wrap an initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(value))),
        }
    }

    /// Current snapshot. Later replacements do not affect it.
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&*self.inner.read())
    }

    /// Replace the value for every holder of this slot.
    pub fn replace(&self, value: T) {
        *self.inner.write() = Arc::new(value);
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&*self.get()).finish()
    }
}

impl<T> From<T> for Slot<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// Last computed value of a stage, tagged with the digest it belongs to.
pub struct Memo<T> {
    cell: Mutex<Option<(Digest, Arc<T>)>>,
}

impl<T> Memo<T> {
    /// Empty memo.
    pub fn new() -> Self {
        Self {
            cell: Mutex::new(None),
        }
    }

    /// The remembered value if it was computed for `digest`.
    pub fn get(&self, digest: &Digest) -> Option<Arc<T>> {
        match &*self.cell.lock() {
            Some((d, value)) if d == digest => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Remember `value` as the result for `digest`, dropping any older one.
    pub fn set(&self, digest: Digest, value: Arc<T>) {
        *self.cell.lock() = Some((digest, value));
    }

    /// Digest of the remembered value, if any.
    pub fn digest(&self) -> Option<Digest> {
        self.cell.lock().as_ref().map(|(d, _)| d.clone())
    }

    /// Forget the remembered value.
    pub fn clear(&self) {
        *self.cell.lock() = None;
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("digest", &self.digest())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_replace_is_shared() {
        let a = Slot::new(1);
        let b = a.clone();
        let before = a.get();
        b.replace(2);
        assert_eq!(*a.get(), 2);
        assert_eq!(*before, 1);
    }

    #[test]
    fn memo_keyed_by_digest() {
        let memo = Memo::new();
        let d1 = Digest::builder().str("1").finish();
        let d2 = Digest::builder().str("2").finish();
        memo.set(d1.clone(), Arc::new(10));
        assert_eq!(memo.get(&d1).as_deref(), Some(&10));
        assert!(memo.get(&d2).is_none());
        memo.set(d2.clone(), Arc::new(20));
        assert!(memo.get(&d1).is_none());
        assert_eq!(memo.digest(), Some(d2));
        memo.clear();
        assert!(memo.digest().is_none());
    }
}
