//! Threshold breach tracking

use std::sync::atomic::{AtomicU64, Ordering};

use crate::sample::Sample;

/// Counts samples whose heap-used figure exceeds the threshold.
///
/// The comparison is strict: a sample exactly at the threshold is not a
/// breach. The counter is monotonic for the lifetime of a session; a
/// new session starts a fresh tracker at zero. Heap-used semantics
/// apply uniformly across target modes, even where the source collapses
/// the breakdown onto a single aggregate figure.
#[derive(Debug)]
pub struct BreachTracker {
    threshold_bytes: u64,
    count: AtomicU64,
}

impl BreachTracker {
    pub fn new(threshold_bytes: u64) -> Self {
        Self {
            threshold_bytes,
            count: AtomicU64::new(0),
        }
    }

    /// Evaluate one sample, incrementing the counter on breach
    pub fn evaluate(&self, sample: &Sample) -> bool {
        let is_breach = sample.memory.heap_used > self.threshold_bytes;
        if is_breach {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
        is_breach
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{CpuStat, MemoryBreakdown};
    use chrono::Utc;

    fn sample(heap_used: u64) -> Sample {
        Sample {
            timestamp: Utc::now(),
            pid: 1,
            memory: MemoryBreakdown::from_aggregate(heap_used),
            cpu: CpuStat::default(),
            disk: None,
        }
    }

    const MB: u64 = 1024 * 1024;

    #[test]
    fn breach_is_strict_greater_than() {
        let tracker = BreachTracker::new(50 * MB);

        assert!(!tracker.evaluate(&sample(50 * MB)));
        assert_eq!(tracker.count(), 0);

        assert!(tracker.evaluate(&sample(50 * MB + 1)));
        assert_eq!(tracker.count(), 1);
    }

    #[test]
    fn fifty_two_megabytes_breaches_fifty() {
        let tracker = BreachTracker::new(50 * MB);
        assert!(tracker.evaluate(&sample(52 * MB)));
        assert_eq!(tracker.count(), 1);
    }

    #[test]
    fn count_matches_breaching_ticks_and_never_decreases() {
        let tracker = BreachTracker::new(100);
        let heaps = [50, 150, 200, 80, 101, 100];
        let mut expected = 0;
        let mut last = 0;

        for heap in heaps {
            if tracker.evaluate(&sample(heap)) {
                expected += 1;
            }
            assert!(tracker.count() >= last);
            last = tracker.count();
        }

        assert_eq!(tracker.count(), expected);
        assert_eq!(tracker.count(), 3);
    }
}
