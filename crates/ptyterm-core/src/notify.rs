//! Payload-free change notification.
//!
//! Observers register a callback or subscribe to a channel and then pull the
//! new state themselves. Channel ticks coalesce: a subscriber that has not
//! consumed the previous tick is not sent another one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_channel::{Receiver, Sender, TrySendError};
use tracing::trace;

/// Handle returned by [`ChangeNotifier::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct ChangeNotifier {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    subscribers: Mutex<Vec<Sender<()>>>,
    next_id: AtomicU64,
    disposed: AtomicBool,
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listener_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`.
    ///
    /// # Panics
    /// Panics if the notifier has been disposed.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        assert!(!self.is_disposed(), "listener added to a disposed ChangeNotifier");
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push((id, Arc::new(listener)));
        id
    }

    /// Returns whether the listener was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Channel receiving one `()` tick per change, coalesced while unread.
    /// The channel closes when the notifier is disposed.
    pub fn subscribe(&self) -> Receiver<()> {
        let (tx, rx) = async_channel::bounded(1);
        if self.is_disposed() {
            tx.close();
        } else {
            self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).push(tx);
        }
        rx
    }

    /// Call every listener and tick every subscriber. Listeners run on the
    /// calling thread, without any notifier lock held.
    pub fn notify(&self) {
        if self.is_disposed() {
            return;
        }

        let listeners: Vec<Listener> = self.lock_listeners().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener();
        }

        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| match tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Closed(())) => {
                trace!("dropping closed change subscriber");
                false
            }
        });
    }

    /// Drop all listeners and close all subscriptions. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.lock_listeners().clear();
        let subscribers = std::mem::take(&mut *self.subscribers.lock().unwrap_or_else(PoisonError::into_inner));
        for tx in subscribers {
            tx.close();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.lock_listeners().len()
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn listeners_are_called() {
        let notifier = ChangeNotifier::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        notifier.add_listener(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        notifier.notify();
        notifier.notify();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let notifier = ChangeNotifier::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let id = notifier.add_listener(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(notifier.remove_listener(id));
        assert!(!notifier.remove_listener(id));
        notifier.notify();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_may_reenter_notifier() {
        let notifier = Arc::new(ChangeNotifier::new());
        let inner = Arc::clone(&notifier);
        notifier.add_listener(move || {
            let _ = inner.listener_count();
        });
        notifier.notify();
    }

    #[test]
    fn subscriber_ticks_coalesce() {
        let notifier = ChangeNotifier::new();
        let rx = notifier.subscribe();
        notifier.notify();
        notifier.notify();
        notifier.notify();
        assert_eq!(rx.try_recv(), Ok(()));
        assert!(rx.try_recv().is_err());
        notifier.notify();
        assert_eq!(rx.try_recv(), Ok(()));
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let notifier = ChangeNotifier::new();
        drop(notifier.subscribe());
        notifier.notify();
        assert!(notifier.subscribers.lock().unwrap().is_empty());
    }

    #[test]
    fn dispose_closes_everything() {
        let notifier = ChangeNotifier::new();
        let rx = notifier.subscribe();
        notifier.add_listener(|| {});
        notifier.dispose();
        notifier.dispose();
        assert!(notifier.is_disposed());
        assert_eq!(notifier.listener_count(), 0);
        assert!(rx.is_closed());
        assert!(notifier.subscribe().is_closed());
    }

    #[test]
    #[should_panic(expected = "disposed ChangeNotifier")]
    fn adding_after_dispose_panics() {
        let notifier = ChangeNotifier::new();
        notifier.dispose();
        notifier.add_listener(|| {});
    }
}
