// src/buffer.rs
use std::collections::VecDeque;

use crate::types::Reading;

/// Default number of readings kept for the plot.
pub const DEFAULT_CAPACITY: usize = 100;

/// 定长滑动窗口，满了就丢掉最旧的读数
#[derive(Clone, Debug)]
pub struct RollingBuffer {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl RollingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, reading: Reading) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Reading> + '_ {
        self.readings.iter()
    }

    /// Most recent reading.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    /// `[elapsed, value]` pairs in the shape egui_plot wants.
    pub fn to_points(&self) -> Vec<[f64; 2]> {
        self.readings.iter().map(|r| [r.elapsed, r.value]).collect()
    }
}

impl Default for RollingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(i: usize) -> Reading {
        Reading {
            elapsed: i as f64,
            value: i as f64 * 2.0,
        }
    }

    #[test]
    fn length_is_min_of_pushes_and_capacity() {
        for capacity in [1, 3, 10] {
            for n in 0..25 {
                let mut buffer = RollingBuffer::new(capacity);
                for i in 0..n {
                    buffer.push(reading(i));
                }
                assert_eq!(buffer.len(), n.min(capacity));
                let kept: Vec<f64> = buffer.iter().map(|r| r.elapsed).collect();
                let expected: Vec<f64> = (n.saturating_sub(capacity)..n).map(|i| i as f64).collect();
                assert_eq!(kept, expected);
            }
        }
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buffer = RollingBuffer::new(0);
        buffer.push(reading(1));
        buffer.push(reading(2));
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![reading(2)]);
    }

    #[test]
    fn latest_tracks_newest_push() {
        let mut buffer = RollingBuffer::new(2);
        assert_eq!(buffer.latest(), None);
        buffer.push(reading(1));
        assert_eq!(buffer.latest(), Some(&reading(1)));
        buffer.push(reading(2));
        buffer.push(reading(3));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.latest(), Some(&reading(3)));
    }

    #[test]
    fn snapshot_does_not_consume() {
        let mut buffer = RollingBuffer::default();
        buffer.push(reading(0));
        buffer.push(reading(1));
        assert_eq!(buffer.to_points(), vec![[0.0, 0.0], [1.0, 2.0]]);
        assert_eq!(buffer.iter().count(), 2);
        assert_eq!(buffer.len(), 2);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), DEFAULT_CAPACITY);
    }
}
