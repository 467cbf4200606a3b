//! Status handler registry.
//!
//! Maps substatus values to handlers for unsolicited STAT frames, plus an
//! optional catch-all for substatus values nobody registered for. The
//! registry lock is held only for mutation and lookup, never across a
//! handler invocation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Callback invoked for an unsolicited status frame
/// (substatus, data after the fixed STAT header).
pub type StatusHandler = Arc<dyn Fn(u32, &[u8]) + Send + Sync>;

#[derive(Default)]
struct StatusHandlers {
    by_substatus: HashMap<u32, StatusHandler>,
    unhandled: Option<StatusHandler>,
}

/// Registry of status subscriptions.
#[derive(Default)]
pub struct StatusRegistry {
    inner: Mutex<StatusHandlers>,
}

impl StatusRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one substatus value.
    ///
    /// Returns `false` if a handler is already registered for it.
    pub fn register(&self, substatus: u32, handler: impl Fn(u32, &[u8]) + Send + Sync + 'static) -> bool {
        let mut inner = self.inner.lock().expect("status registry poisoned");
        if inner.by_substatus.contains_key(&substatus) {
            return false;
        }
        inner.by_substatus.insert(substatus, Arc::new(handler));
        true
    }

    /// Register the catch-all handler for unrecognized substatus values.
    ///
    /// Returns `false` if a catch-all is already registered.
    pub fn register_unhandled(&self, handler: impl Fn(u32, &[u8]) + Send + Sync + 'static) -> bool {
        let mut inner = self.inner.lock().expect("status registry poisoned");
        if inner.unhandled.is_some() {
            return false;
        }
        inner.unhandled = Some(Arc::new(handler));
        true
    }

    /// Look up the handler for a substatus, falling back to the catch-all.
    ///
    /// Clones the handler out so the caller can invoke it after releasing
    /// the registry lock.
    pub(crate) fn lookup(&self, substatus: u32) -> Option<StatusHandler> {
        let inner = self.inner.lock().expect("status registry poisoned");
        inner
            .by_substatus
            .get(&substatus)
            .or(inner.unhandled.as_ref())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_register_rejects_duplicate() {
        let registry = StatusRegistry::new();
        assert!(registry.register(7, |_, _| {}));
        assert!(!registry.register(7, |_, _| {}));
        assert!(registry.register(8, |_, _| {}));
    }

    #[test]
    fn test_unhandled_is_singleton() {
        let registry = StatusRegistry::new();
        assert!(registry.register_unhandled(|_, _| {}));
        assert!(!registry.register_unhandled(|_, _| {}));
    }

    #[test]
    fn test_lookup_prefers_exact_match() {
        let registry = StatusRegistry::new();
        let hits = Arc::new(AtomicU32::new(0));

        let exact = hits.clone();
        registry.register(3, move |substatus, data| {
            assert_eq!(substatus, 3);
            assert_eq!(data, b"xy");
            exact.fetch_add(1, Ordering::SeqCst);
        });
        registry.register_unhandled(|_, _| panic!("catch-all must not fire"));

        let handler = registry.lookup(3).unwrap();
        handler(3, b"xy");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lookup_falls_back_to_unhandled() {
        let registry = StatusRegistry::new();
        let hits = Arc::new(AtomicU32::new(0));

        let fallback = hits.clone();
        registry.register_unhandled(move |substatus, _| {
            assert_eq!(substatus, 99);
            fallback.fetch_add(1, Ordering::SeqCst);
        });

        let handler = registry.lookup(99).unwrap();
        handler(99, &[]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lookup_without_handlers_is_none() {
        let registry = StatusRegistry::new();
        assert!(registry.lookup(1).is_none());
    }
}
