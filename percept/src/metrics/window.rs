//! Sliding window of recent performance samples.
//!
//! Maintains the most recent N samples in arrival order and computes
//! per-field averages for threshold evaluation. Insertion evicts the oldest
//! sample once the window is at capacity (strict FIFO).

use std::collections::VecDeque;

use thiserror::Error;

use super::sample::MetricsSample;

/// Errors from window queries.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MetricsError {
    /// Averages were requested on a window with no samples.
    #[error("metrics window is empty")]
    EmptyWindow,
}

/// Per-field means over the current window contents.
///
/// `cpu_percent` / `memory_mb` are `None` when every sample in the window
/// had that field degraded; a partially degraded field averages only the
/// samples that carried a reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowAverages {
    pub latency_ms: f64,
    pub cpu_percent: Option<f64>,
    pub memory_mb: Option<f64>,
    pub fps: f64,
}

/// Fixed-capacity FIFO buffer of recent performance samples.
///
/// Confined to the single owning controller thread; no internal locking.
#[derive(Debug)]
pub struct MetricsWindow {
    samples: VecDeque<MetricsSample>,
    capacity: usize,
}

impl MetricsWindow {
    /// Create a window holding at most `capacity` samples.
    ///
    /// Capacity must be at least 1; configuration validation enforces this
    /// before a window is ever constructed.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity >= 1, "window capacity must be at least 1");
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest if the window is at capacity.
    pub fn record(&mut self, sample: MetricsSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// `true` once the window holds `capacity` samples.
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` if no samples are held.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear the window to empty.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Samples in arrival order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &MetricsSample> {
        self.samples.iter()
    }

    /// Mean of each field over the current contents.
    ///
    /// Degraded fields are excluded per sample; a field degraded in every
    /// sample averages to `None`.
    pub fn averages(&self) -> Result<WindowAverages, MetricsError> {
        if self.samples.is_empty() {
            return Err(MetricsError::EmptyWindow);
        }

        let n = self.samples.len() as f64;
        let latency_ms = self.samples.iter().map(|s| s.latency_ms).sum::<f64>() / n;
        let fps = self.samples.iter().map(|s| s.fps).sum::<f64>() / n;

        Ok(WindowAverages {
            latency_ms,
            cpu_percent: Self::partial_mean(self.samples.iter().map(|s| s.cpu_percent)),
            memory_mb: Self::partial_mean(self.samples.iter().map(|s| s.memory_mb)),
            fps,
        })
    }

    /// Mean over the present values only; `None` when all are absent.
    fn partial_mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
        let (sum, count) = values
            .flatten()
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}
