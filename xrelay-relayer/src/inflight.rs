//! At most one composition in flight per transaction.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Set of transaction keys currently being composed.
#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` if another worker already holds it. The claim
    /// is released when the guard drops.
    pub fn try_acquire(&self, key: impl Into<String>) -> Option<InFlightGuard> {
        let key = key.into();
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlightGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_refused_until_release() {
        let inflight = InFlight::new();
        let guard = inflight.try_acquire("relay:beef").unwrap();
        assert!(inflight.try_acquire("relay:beef").is_none());
        assert!(inflight.try_acquire("relay:cafe").is_some());
        assert!(inflight.contains("relay:beef"));

        drop(guard);
        assert!(!inflight.contains("relay:beef"));
        assert!(inflight.try_acquire("relay:beef").is_some());
    }

    #[test]
    fn test_clones_share_claims() {
        let inflight = InFlight::new();
        let other = inflight.clone();
        let _guard = inflight.try_acquire("src:2:0xabc").unwrap();
        assert!(other.try_acquire("src:2:0xabc").is_none());
        assert_eq!(other.len(), 1);
    }
}
