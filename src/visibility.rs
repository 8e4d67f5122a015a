//! Shared marker visibility
//!
//! The only state shared between the detector thread and the render thread.
//! The detector replaces the value wholesale once per detection cycle; the
//! render loop takes one snapshot per tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-slot "is the target marker visible" cell.
///
/// Cloning hands out another handle to the same slot. The value starts as
/// not visible and lives as long as the last handle.
#[derive(Clone, Debug, Default)]
pub struct VisibilityFlag {
    visible: Arc<AtomicBool>,
}

impl VisibilityFlag {
    /// Create a flag in the "not visible" state
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored value with the latest detection result.
    ///
    /// Returns the value that was replaced.
    pub fn publish(&self, visible: bool) -> bool {
        self.visible.swap(visible, Ordering::AcqRel)
    }

    /// Read the most recently published value
    pub fn snapshot(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_not_visible() {
        let flag = VisibilityFlag::new();
        assert!(!flag.snapshot());
    }

    #[test]
    fn test_publish_replaces_value() {
        let flag = VisibilityFlag::new();
        assert!(!flag.publish(true));
        assert!(flag.snapshot());
        assert!(flag.publish(false));
        assert!(!flag.snapshot());
    }

    #[test]
    fn test_clones_share_the_slot() {
        let writer = VisibilityFlag::new();
        let reader = writer.clone();
        writer.publish(true);
        assert!(reader.snapshot());
    }

    #[test]
    fn test_concurrent_publish_and_snapshot() {
        let flag = VisibilityFlag::new();
        let writer = flag.clone();
        let done = Arc::new(AtomicBool::new(false));
        let writer_done = done.clone();

        let handle = std::thread::spawn(move || {
            let mut last = false;
            let mut i = 0u64;
            // Keep toggling until the reader has seen both values
            while !writer_done.load(Ordering::Acquire) {
                let next = i % 2 == 0;
                // Sole writer: each swap hands back exactly what it wrote last
                assert_eq!(writer.publish(next), last);
                last = next;
                i += 1;
            }
            writer.publish(true);
        });

        let mut seen_true = false;
        let mut seen_false = false;
        while !(seen_true && seen_false) && !handle.is_finished() {
            if flag.snapshot() {
                seen_true = true;
            } else {
                seen_false = true;
            }
        }
        done.store(true, Ordering::Release);

        handle.join().unwrap();
        assert!(seen_true && seen_false);
        assert!(flag.snapshot());
    }
}
