//! Publish statistics for the simulator loop.
//!
//! Outcomes are recorded by whoever observes them: the loop itself under the
//! await policies, or the detached observer tasks under fire-and-forget.
//! Counters are atomics so both can update them without locking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of the counters at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishStats {
    /// Publishes the transport confirmed
    pub published: u64,
    /// Publishes that settled with an error
    pub failed: u64,
    /// Payload volume of confirmed publishes
    pub bytes_published: u64,
}

impl fmt::Display for PublishStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} published, {} failed, {} bytes",
            self.published, self.failed, self.bytes_published
        )
    }
}

/// Cloneable handle onto shared counters
#[derive(Debug, Clone, Default)]
pub struct PublishStatsTracker {
    published: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    bytes_published: Arc<AtomicU64>,
}

impl PublishStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one confirmed publish of `bytes` payload bytes.
    pub fn record_published(&self, bytes: usize) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.bytes_published
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PublishStats {
        PublishStats {
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_published: self.bytes_published.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let tracker = PublishStatsTracker::new();
        let observer = tracker.clone();

        tracker.record_published(70);
        observer.record_published(30);
        observer.record_failed();

        assert_eq!(
            tracker.snapshot(),
            PublishStats {
                published: 2,
                failed: 1,
                bytes_published: 100,
            }
        );
        assert_eq!(tracker.snapshot().to_string(), "2 published, 1 failed, 100 bytes");
    }
}
