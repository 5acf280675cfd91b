//! Reactive values with directly-owned observer lists.
//!
//! A [`Signal`] owns its connections; a [`Value`] owns its current contents and
//! a `changed` signal. There is no process-wide notification center: observers
//! live exactly as long as the value they are attached to, or until their
//! [`Subscription`] is dropped.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use horizon_trellis_core::Value;
//!
//! let names = Value::new(vec!["a".to_string()]);
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let seen_clone = seen.clone();
//! let subscription = names.subscribe(move |items: &Vec<String>| {
//!     seen_clone.lock().push(items.len());
//! });
//!
//! names.update(|items| items.push("b".to_string()));
//! drop(subscription);
//! names.set(Vec::new());
//!
//! assert_eq!(*seen.lock(), vec![2]);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// Identifies one slot connected to a [`Signal`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A type-safe signal with any number of connected slots.
///
/// Slots are invoked synchronously, in connection order, on the emitting
/// thread. The connection table is not locked while slots run, so a slot may
/// connect or disconnect (itself included) without deadlocking; such changes
/// take effect from the next emission.
pub struct Signal<Args> {
    connections: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot and return its id.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Arc::new(slot))
    }

    /// Disconnect a slot.
    ///
    /// Returns `true` if the connection existed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect every slot.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Temporarily suppress emissions.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Whether emissions are suppressed.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Invoke every connected slot with `args`.
    pub fn emit(&self, args: &Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        let slots: Vec<Slot<Args>> = self.connections.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");

        for slot in slots {
            slot(args);
        }
    }

    /// Connect a slot that stays connected until the returned guard is dropped.
    ///
    /// The guard holds the signal weakly, so dropping it after the signal is
    /// gone is harmless.
    pub fn subscribe<F>(self: &Arc<Self>, slot: F) -> Subscription
    where
        Args: Send + Sync,
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        let signal: Weak<Signal<Args>> = Arc::downgrade(self);
        Subscription {
            disconnect: Some(Box::new(move || {
                if let Some(signal) = signal.upgrade() {
                    signal.disconnect(id);
                }
            })),
        }
    }
}

impl<Args> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connections.lock().len())
            .field("blocked", &self.blocked.load(Ordering::SeqCst))
            .finish()
    }
}

/// RAII guard that disconnects a slot when dropped.
#[must_use = "dropping a Subscription disconnects it immediately"]
pub struct Subscription {
    disconnect: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Keep the connection alive for the rest of the signal's life.
    pub fn detach(mut self) {
        self.disconnect = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.disconnect.is_some())
            .finish()
    }
}

/// A reactive value that notifies observers on every write.
///
/// Writes replace the value wholesale and then emit the new contents on
/// [`changed`](Self::changed). The lock is released before observers run, so
/// they may read the value back.
pub struct Value<T> {
    value: RwLock<T>,
    changed: Arc<Signal<T>>,
}

impl<T: Clone + Send + Sync + 'static> Value<T> {
    /// Create a value with no observers.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            changed: Arc::new(Signal::new()),
        }
    }

    /// Clone the current contents.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Borrow the current contents.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Replace the contents and notify observers.
    pub fn set(&self, value: T) {
        *self.value.write() = value.clone();
        self.changed.emit(&value);
    }

    /// Replace the contents without notifying anyone.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }

    /// Edit the contents in place, then notify observers.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        let snapshot = {
            let mut guard = self.value.write();
            f(&mut guard);
            guard.clone()
        };
        self.changed.emit(&snapshot);
    }

    /// The signal emitted after every write.
    pub fn changed(&self) -> &Arc<Signal<T>> {
        &self.changed
    }

    /// Observe writes until the returned guard is dropped.
    pub fn subscribe<F>(&self, slot: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.changed.subscribe(slot)
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Value<T> {
    /// Replace the contents only if they differ.
    ///
    /// Returns `true` (and notifies observers) if the value changed.
    pub fn set_if_changed(&self, value: T) -> bool {
        {
            let mut guard = self.value.write();
            if *guard == value {
                return false;
            }
            *guard = value.clone();
        }
        self.changed.emit(&value);
        true
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for Value<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("value", &*self.value.read())
            .field("changed", &self.changed)
            .finish()
    }
}

static_assertions::assert_impl_all!(Signal<Vec<u32>>: Send, Sync);
static_assertions::assert_impl_all!(Value<Vec<u32>>: Send, Sync);
static_assertions::assert_impl_all!(Subscription: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(&42);
        signal.emit(&100);

        assert_eq!(*received.lock(), vec![42, 100]);
    }

    #[test]
    fn test_signal_disconnect() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        let id = signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(&1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(&2);

        assert_eq!(*received.lock(), vec![1]);
    }

    #[test]
    fn test_signal_blocked() {
        let signal = Signal::<()>::new();
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        signal.connect(move |_| *count_clone.lock() += 1);

        signal.set_blocked(true);
        signal.emit(&());
        signal.set_blocked(false);
        signal.emit(&());

        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_slot_may_disconnect_during_emit() {
        let signal = Arc::new(Signal::<()>::new());
        let count = Arc::new(Mutex::new(0));
        let id_cell: Arc<Mutex<Option<ConnectionId>>> = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&signal);
        let count_clone = count.clone();
        let id_clone = id_cell.clone();
        let id = signal.connect(move |_| {
            *count_clone.lock() += 1;
            if let (Some(signal), Some(id)) = (weak.upgrade(), *id_clone.lock()) {
                signal.disconnect(id);
            }
        });
        *id_cell.lock() = Some(id);

        signal.emit(&());
        signal.emit(&());

        assert_eq!(*count.lock(), 1);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_subscription_disconnects_on_drop() {
        let signal = Arc::new(Signal::<i32>::new());
        let received = Arc::new(Mutex::new(Vec::new()));

        {
            let received_clone = received.clone();
            let _subscription = signal.subscribe(move |&n| received_clone.lock().push(n));
            signal.emit(&1);
            assert_eq!(signal.connection_count(), 1);
        }

        signal.emit(&2);
        assert_eq!(*received.lock(), vec![1]);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_subscription_outliving_signal() {
        let signal = Arc::new(Signal::<i32>::new());
        let subscription = signal.subscribe(|_| {});
        drop(signal);
        drop(subscription);
    }

    #[test]
    fn test_value_notifies_on_every_write() {
        let value = Value::new(1);
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        let _subscription = value.subscribe(move |&n| received_clone.lock().push(n));

        value.set(2);
        value.set(2);
        value.update(|n| *n += 1);
        value.set_silent(10);

        assert_eq!(*received.lock(), vec![2, 2, 3]);
        assert_eq!(value.get(), 10);
    }

    #[test]
    fn test_value_set_if_changed() {
        let value = Value::new("a".to_string());
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        let _subscription = value.subscribe(move |_| *count_clone.lock() += 1);

        assert!(!value.set_if_changed("a".to_string()));
        assert!(value.set_if_changed("b".to_string()));
        assert_eq!(*count.lock(), 1);
        assert_eq!(value.with(|s| s.len()), 1);
    }

    #[test]
    fn test_observer_can_read_value() {
        let value = Arc::new(Value::new(0));
        let observed = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&value);
        let observed_clone = observed.clone();
        let _subscription = value.subscribe(move |_| {
            if let Some(value) = weak.upgrade() {
                *observed_clone.lock() = Some(value.get());
            }
        });

        value.set(7);
        assert_eq!(*observed.lock(), Some(7));
    }
}
