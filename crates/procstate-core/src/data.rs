//! Auxiliary (non-parameter) state.
//!
//! Anything that belongs in a saved state but isn't an automatable number
//! (a referenced sample file, an envelope shape, a tuning table) implements
//! [`DataItem`]. Each item serializes itself to a [`StateNode`], restores
//! itself from one, and owns whatever locking its internal state needs.
//!
//! Change notification has the same shape as for parameters: the item calls
//! [`ChangeNotifier::notify_changed`], which raises a dirty flag, and the
//! [`NotificationPump`](crate::NotificationPump) calls the item's listeners
//! on the message thread.
//!
//! # Implementing a data kind
//!
//! ```ignore
//! struct Tuning {
//!     id: String,
//!     cents: Mutex<[f64; 12]>,
//!     notifier: ChangeNotifier,
//! }
//!
//! impl DataItem for Tuning {
//!     fn id(&self) -> &str { &self.id }
//!     fn kind(&self) -> &'static str { "TUNING" }
//!     fn serialize(&self) -> StateNode { /* one attribute per note */ }
//!     fn restore(&self, node: &StateNode) -> Result<(), DataError> {
//!         check_kind(node, self.kind())?;
//!         /* parse, swap in under the lock */
//!         self.notify_changed(false);
//!         Ok(())
//!     }
//!     fn reset_to_default(&self) { /* equal temperament */ self.notify_changed(false); }
//!     fn notifier(&self) -> &ChangeNotifier { &self.notifier }
//! }
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::DataError;
use crate::listeners::{DirtyFlag, ListenerId, ListenerList};
use crate::pump::PumpSignal;
use crate::tree::StateNode;

/// Callback invoked with the data item's id on the message thread.
pub type DataListener = dyn Fn(&str) + Send + Sync;

/// A named, independently serializable piece of state.
///
/// All methods may be called from any thread. `restore` may block on slow
/// work (loading a referenced resource) and must finish that work before it
/// returns: returning is the only completion signal the caller gets.
pub trait DataItem: Send + Sync {
    /// Unique identifier within the registry.
    fn id(&self) -> &str;

    /// Tag of the nodes this kind serializes to, e.g. `"FILE"`.
    fn kind(&self) -> &'static str;

    /// Capture a consistent snapshot of the item's state.
    fn serialize(&self) -> StateNode;

    /// Replace the item's state from a node produced by [`serialize`](Self::serialize).
    ///
    /// Nodes of another kind must be rejected without partial application.
    /// On success the item raises a change notification.
    fn restore(&self, node: &StateNode) -> Result<(), DataError>;

    /// Return to a valid default state and raise a change notification.
    fn reset_to_default(&self);

    /// Dirty flag and listener set for this item.
    fn notifier(&self) -> &ChangeNotifier;

    /// Raise a change notification. See [`ChangeNotifier::notify_changed`].
    fn notify_changed(&self, immediate: bool) {
        self.notifier().notify_changed(immediate);
    }

    /// Subscribe to change notifications (message thread).
    fn add_listener(&self, listener: Arc<DataListener>) -> ListenerId {
        self.notifier().add_listener(listener)
    }

    /// Unsubscribe. Returns `false` if `id` was not subscribed.
    fn remove_listener(&self, id: ListenerId) -> bool {
        self.notifier().remove_listener(id)
    }
}

/// Reject nodes whose tag doesn't match `expected`.
pub fn check_kind(node: &StateNode, expected: &'static str) -> Result<(), DataError> {
    if node.has_tag(expected) {
        Ok(())
    } else {
        Err(DataError::KindMismatch {
            expected,
            found: node.tag.clone(),
        })
    }
}

/// Dirty flag plus listener set for a [`DataItem`].
pub struct ChangeNotifier {
    dirty: DirtyFlag,
    listeners: ListenerList<DataListener>,
    /// Wakes the pump thread; attached when the item is registered.
    signal: OnceLock<Arc<PumpSignal>>,
}

impl ChangeNotifier {
    /// Create a clean notifier.
    pub fn new() -> Self {
        Self {
            dirty: DirtyFlag::new(false),
            listeners: ListenerList::new(),
            signal: OnceLock::new(),
        }
    }

    /// Mark the item as changed.
    ///
    /// The dirty flag is always raised. With `immediate`, a running pump
    /// thread is also woken so listeners run without waiting for the next
    /// scheduled tick. Waking takes a short lock; don't pass `immediate`
    /// from the audio thread.
    pub fn notify_changed(&self, immediate: bool) {
        self.dirty.mark();
        if immediate {
            if let Some(signal) = self.signal.get() {
                signal.wake();
            }
        }
    }

    /// Subscribe to change notifications.
    pub fn add_listener(&self, listener: Arc<DataListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Unsubscribe. Returns `false` if `id` was not subscribed.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Number of subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Whether a change is waiting for the next pump tick.
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_pending()
    }

    pub(crate) fn attach(&self, signal: Arc<PumpSignal>) {
        if self.signal.set(signal).is_err() {
            log::warn!("data item registered with more than one registry");
        }
    }

    pub(crate) fn dispatch_if_dirty(&self, id: &str) -> bool {
        if !self.dirty.take() {
            return false;
        }
        self.listeners.for_each(|listener| listener(id));
        true
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("dirty", &self.dirty.is_pending())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Drop for ChangeNotifier {
    fn drop(&mut self) {
        let remaining = self.listeners.len();
        if remaining > 0 {
            log::error!("data item dropped with {} listener(s) still attached", remaining);
            debug_assert!(
                std::thread::panicking(),
                "listeners must be removed before a data item is dropped"
            );
        }
    }
}
