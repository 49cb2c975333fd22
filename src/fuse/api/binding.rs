use std::fmt;
use std::sync::Mutex;

use crate::fuse::store::ListenerRegistration;

/// Lifecycle of a [`BindingHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingState {
    /// No listener was registered, e.g. the binding targeted an empty id.
    Unbound,
    Active,
    Removed,
}

enum Slot {
    Unbound,
    Active(Box<dyn ListenerRegistration>),
    Removed,
}

/// A live subscription returned by the `bind_*` operations.
///
/// Owns at most one store listener. Dropping the handle does not detach the
/// listener; call [`remove`](Self::remove) to stop deliveries.
#[must_use = "dropping a BindingHandle keeps the listener alive; call remove() to stop it"]
pub struct BindingHandle {
    slot: Mutex<Slot>,
}

impl BindingHandle {
    /// A handle that owns no listener.
    pub fn unbound() -> Self {
        Self {
            slot: Mutex::new(Slot::Unbound),
        }
    }

    pub(crate) fn active(registration: Box<dyn ListenerRegistration>) -> Self {
        Self {
            slot: Mutex::new(Slot::Active(registration)),
        }
    }

    pub fn state(&self) -> BindingState {
        match &*self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) {
            Slot::Unbound => BindingState::Unbound,
            Slot::Active(_) => BindingState::Active,
            Slot::Removed => BindingState::Removed,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == BindingState::Active
    }

    /// Detaches the listener. Safe to call repeatedly, from any thread, and
    /// on an unbound handle.
    pub fn remove(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Slot::Active(_) = &*slot {
            if let Slot::Active(registration) = std::mem::replace(&mut *slot, Slot::Removed) {
                registration.remove();
            }
        }
    }
}

impl fmt::Debug for BindingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingHandle")
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingRegistration(Arc<AtomicUsize>);

    impl ListenerRegistration for CountingRegistration {
        fn remove(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn remove_detaches_exactly_once() {
        let removals = Arc::new(AtomicUsize::new(0));
        let handle = BindingHandle::active(Box::new(CountingRegistration(Arc::clone(&removals))));
        assert!(handle.is_active());

        handle.remove();
        handle.remove();

        assert_eq!(handle.state(), BindingState::Removed);
        assert_eq!(removals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unbound_remove_is_noop() {
        let handle = BindingHandle::unbound();
        handle.remove();
        assert_eq!(handle.state(), BindingState::Unbound);
    }

    #[test]
    fn dropping_does_not_detach() {
        let removals = Arc::new(AtomicUsize::new(0));
        drop(BindingHandle::active(Box::new(CountingRegistration(Arc::clone(&removals)))));
        assert_eq!(removals.load(Ordering::SeqCst), 0);
    }
}
