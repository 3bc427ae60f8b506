//! Per-frame performance sample.

use std::time::Instant;

/// How the `fps` field of a sample was obtained.
///
/// A back end that only knows its own processing time derives fps from
/// latency (`1000 / latency_ms`). A back end that measures true
/// capture-to-display timing reports fps directly. The two are never
/// silently conflated; every sample carries its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpsSource {
    /// `fps = 1000 / latency_ms` (zero when latency is zero).
    DerivedFromLatency,
    /// Reported by the back end from its own frame timing.
    Measured,
}

impl std::fmt::Display for FpsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FpsSource::DerivedFromLatency => write!(f, "derived"),
            FpsSource::Measured => write!(f, "measured"),
        }
    }
}

/// Performance measurements for a single processed frame.
///
/// `cpu_percent` and `memory_mb` are `None` when the host probe could not
/// obtain them; such degraded fields are excluded from window averages.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSample {
    /// Processing latency for this frame in milliseconds.
    pub latency_ms: f64,

    /// Host CPU utilization (0-100), if available.
    pub cpu_percent: Option<f64>,

    /// Resident memory of this process in megabytes, if available.
    pub memory_mb: Option<f64>,

    /// Effective frame rate.
    pub fps: f64,

    /// How `fps` was obtained.
    pub fps_source: FpsSource,

    /// When the sample was recorded.
    pub recorded_at: Instant,
}

impl MetricsSample {
    /// Build a sample whose fps is derived from the processing latency.
    pub fn derived(latency_ms: f64, cpu_percent: Option<f64>, memory_mb: Option<f64>) -> Self {
        let fps = if latency_ms > 0.0 {
            1000.0 / latency_ms
        } else {
            0.0
        };
        Self {
            latency_ms,
            cpu_percent,
            memory_mb,
            fps,
            fps_source: FpsSource::DerivedFromLatency,
            recorded_at: Instant::now(),
        }
    }

    /// Build a sample with an fps value measured by the back end itself.
    pub fn measured(
        latency_ms: f64,
        fps: f64,
        cpu_percent: Option<f64>,
        memory_mb: Option<f64>,
    ) -> Self {
        Self {
            latency_ms,
            cpu_percent,
            memory_mb,
            fps,
            fps_source: FpsSource::Measured,
            recorded_at: Instant::now(),
        }
    }

    /// `true` if any field could not be obtained.
    pub fn is_degraded(&self) -> bool {
        self.cpu_percent.is_none() || self.memory_mb.is_none()
    }
}
