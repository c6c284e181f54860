//! Dirty flags and listener sets shared by parameters and data items.
//!
//! A [`DirtyFlag`] is the only thing a mutator touches: one atomic store,
//! safe from the audio thread. The [`ListenerList`] is only touched from the
//! message thread (subscribe, unsubscribe, dispatch), so the mutex inside it
//! never contends with real-time code.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Pending-notification marker.
#[derive(Debug)]
pub struct DirtyFlag(AtomicBool);

impl DirtyFlag {
    /// Create a flag, optionally already pending.
    pub const fn new(pending: bool) -> Self {
        Self(AtomicBool::new(pending))
    }

    /// Mark a change as pending. Lock-free.
    #[inline]
    pub fn mark(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clear the flag, returning whether it was set.
    #[inline]
    pub fn take(&self) -> bool {
        self.0
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Whether a change is pending.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Token returned by `add_listener`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback set keyed by [`ListenerId`].
pub struct ListenerList<T: ?Sized> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(ListenerId, Arc<T>)>>,
}

impl<T: ?Sized> ListenerList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe a callback.
    pub fn add(&self, listener: Arc<T>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Unsubscribe. Returns `false` if the id was not subscribed.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    /// Number of subscribed callbacks.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no callbacks are subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke `call` for every subscribed callback.
    ///
    /// The list is copied before calling out, so callbacks may subscribe or
    /// unsubscribe without deadlocking.
    pub fn for_each(&self, mut call: impl FnMut(&T)) {
        let snapshot: Vec<Arc<T>> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &snapshot {
            call(listener);
        }
    }
}

impl<T: ?Sized> Default for ListenerList<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    type Callback = dyn Fn(usize) + Send + Sync;

    #[test]
    fn test_dirty_flag_take_clears() {
        let flag = DirtyFlag::new(false);
        assert!(!flag.take());
        flag.mark();
        flag.mark();
        assert!(flag.is_pending());
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn test_add_remove() {
        let list: ListenerList<Callback> = ListenerList::new();
        let a = list.add(Arc::new(|_| {}));
        let b = list.add(Arc::new(|_| {}));
        assert_ne!(a, b);
        assert_eq!(list.len(), 2);
        assert!(list.remove(a));
        assert!(!list.remove(a));
        assert_eq!(list.len(), 1);
        assert!(list.remove(b));
        assert!(list.is_empty());
    }

    #[test]
    fn test_for_each_calls_every_listener() {
        let hits = Arc::new(AtomicUsize::new(0));
        let list: ListenerList<Callback> = ListenerList::new();
        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            list.add(Arc::new(move |n| {
                hits.fetch_add(n, Ordering::Relaxed);
            }));
        }
        list.for_each(|listener| listener(2));
        assert_eq!(hits.load(Ordering::Relaxed), 6);
    }

    #[test]
    fn test_listener_may_unsubscribe_during_dispatch() {
        let list: Arc<ListenerList<Callback>> = Arc::new(ListenerList::new());
        let slot = Arc::new(Mutex::new(None));
        let id = {
            let inner = Arc::clone(&list);
            let slot = Arc::clone(&slot);
            list.add(Arc::new(move |_| {
                if let Some(id) = slot.lock().unwrap().take() {
                    inner.remove(id);
                }
            }))
        };
        *slot.lock().unwrap() = Some(id);

        list.for_each(|listener| listener(0));
        assert!(list.is_empty());
    }
}
