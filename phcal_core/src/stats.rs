//! Fixed-capacity window of recent readings with mean and population stddev.
//!
//! Statistics are only defined once the window holds `capacity` readings;
//! before that `mean()` and `stddev()` return `None`, so a half-filled
//! window can never look stable.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct StatsWindow {
    buf: VecDeque<f64>,
    capacity: usize,
    sum: f64,
    // Pushes since the running sum was last rebuilt from the buffer
    since_resum: usize,
}

impl StatsWindow {
    /// Capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
            since_resum: 0,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.buf.len() == self.capacity
            && let Some(old) = self.buf.pop_front()
        {
            self.sum -= old;
        }
        self.buf.push_back(value);
        self.sum += value;
        self.since_resum += 1;
        // Rebuild once per full turn so add/subtract rounding cannot accumulate.
        if self.since_resum >= self.capacity {
            self.sum = self.buf.iter().sum();
            self.since_resum = 0;
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    /// Sum of the readings currently held.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn mean(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(self.sum / self.capacity as f64)
    }

    /// Population standard deviation: sqrt(mean of squared deviations).
    pub fn stddev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let var = self
            .buf
            .iter()
            .map(|&x| (x - mean).powi(2))
            .sum::<f64>()
            / self.capacity as f64;
        Some(var.sqrt())
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.sum = 0.0;
        self.since_resum = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.buf.iter().copied()
    }
}
