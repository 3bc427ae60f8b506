//! Performance metrics for dynamic backend selection.
//!
//! Every processed frame yields a [`MetricsSample`] (latency, CPU, memory,
//! frame rate). Samples are collected into a fixed-capacity
//! [`MetricsWindow`] whose per-field averages drive the switching decision.
//!
//! CPU and memory readings come from a [`SystemProbe`]; a probe that cannot
//! obtain a field reports it as absent and the window excludes it from that
//! field's average instead of averaging in a fabricated zero.

mod probe;
mod sample;
mod window;

pub use probe::{FixedProbe, ProbeReading, SysinfoProbe, SystemProbe};
pub use sample::{FpsSource, MetricsSample};
pub use window::{MetricsError, MetricsWindow, WindowAverages};
