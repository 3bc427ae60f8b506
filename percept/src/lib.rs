//! Percept - adaptive gesture recognition engine.
//!
//! This library provides a camera-driven recognition loop that can execute
//! under one of several interchangeable perception back ends and, in dynamic
//! mode, monitors runtime performance (latency, CPU, memory, frame rate) to
//! decide automatically which back end should be active.
//!
//! # Architecture
//!
//! ```text
//! FrameSource ──► Engine ──► SwitchController ──► Backend (active)
//!                   │              │                  │
//!                   │              │ record           │ result + sample
//!                   │              ▼                  │
//!                   │        MetricsWindow            │
//!                   │              │ averages         │
//!                   │              ▼                  │
//!                   │     ThresholdEvaluator          │
//!                   │              │ violation        │
//!                   │              ▼                  │
//!                   │        CooldownGate ──► background start of
//!                   │                         the candidate Backend
//!                   ▼
//!               ResultSink (per-frame output + switch events)
//! ```
//!
//! The controller never blocks the frame path on a swap: the candidate back
//! end starts on a background thread while the current one keeps serving
//! frames, and the handoff happens between frames once the candidate is
//! running.

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod switching;

pub use backend::{ApproachId, Backend, BackendError, BackendRegistry, Frame, GestureResult};
pub use config::{EngineConfig, Mode, Thresholds};
pub use engine::{Engine, FrameSource, ResultSink, SessionSummary};
pub use error::EngineError;
pub use metrics::{MetricsSample, MetricsWindow};
pub use switching::{SwitchController, SwitchEvent};

/// Library version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
