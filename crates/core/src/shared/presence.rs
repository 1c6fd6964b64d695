use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Thread-safe single-bit presence state: "is a person currently at the door".
///
/// Written by the ingestion loop's detection callbacks, read by the alert
/// loop. Writes are idempotent overwrites (last write wins), so relaxed
/// ordering is sufficient: the reader only needs to observe the latest value
/// within one polling interval, and no other memory is published through
/// this flag.
#[derive(Clone, Debug, Default)]
pub struct PresenceFlag {
    present: Arc<AtomicBool>,
}

impl PresenceFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditionally overwrite the flag.
    pub fn set(&self, present: bool) {
        self.present.store(present, Ordering::Relaxed);
    }

    /// Current value of the flag.
    pub fn get(&self) -> bool {
        self.present.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_absent() {
        assert!(!PresenceFlag::new().get());
    }

    #[test]
    fn test_set_and_get() {
        let flag = PresenceFlag::new();
        flag.set(true);
        assert!(flag.get());
        flag.set(false);
        assert!(!flag.get());
    }

    #[test]
    fn test_idempotent_writes() {
        let flag = PresenceFlag::new();
        flag.set(true);
        flag.set(true);
        assert!(flag.get());
        flag.set(false);
        flag.set(false);
        assert!(!flag.get());
    }

    #[test]
    fn test_clones_share_state() {
        let writer = PresenceFlag::new();
        let reader = writer.clone();
        writer.set(true);
        assert!(reader.get());
        writer.set(false);
        assert!(!reader.get());
    }

    #[test]
    fn test_visible_across_threads() {
        let writer = PresenceFlag::new();
        let reader = writer.clone();
        let handle = std::thread::spawn(move || {
            writer.set(true);
        });
        handle.join().unwrap();
        assert!(reader.get());
    }
}
