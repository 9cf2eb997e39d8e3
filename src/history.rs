//! Short rolling buffer of recent telemetry samples

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::types::TelemetrySample;

/// Bounded ring of the most recent samples.
///
/// Filled by the telemetry receive loop and read by collaborators that need a
/// short batch (e.g. an upload envelope). Oldest samples fall off the front.
#[derive(Debug)]
pub struct TelemetryHistory {
    capacity: usize,
    samples: Mutex<VecDeque<TelemetrySample>>,
}

impl TelemetryHistory {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, samples: Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, sample: TelemetrySample) {
        if self.capacity == 0 {
            return;
        }
        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Copy of the buffered samples, oldest first.
    pub fn snapshot(&self) -> Vec<TelemetrySample> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner).iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seq: u16) -> TelemetrySample {
        TelemetrySample::new(seq, seq.wrapping_mul(10), [0; 3], [0; 3])
    }

    #[test]
    fn keeps_most_recent_samples() {
        let history = TelemetryHistory::new(3);
        for seq in 0..5 {
            history.push(sample(seq));
        }

        let seqs: Vec<u16> = history.snapshot().iter().map(|s| s.sequence()).collect();
        assert_eq!(seqs, vec![2, 3, 4]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn zero_capacity_retains_nothing() {
        let history = TelemetryHistory::new(0);
        history.push(sample(1));
        assert!(history.is_empty());
    }

    #[test]
    fn clear_empties_buffer() {
        let history = TelemetryHistory::new(2);
        history.push(sample(1));
        history.clear();
        assert!(history.snapshot().is_empty());
    }
}
