//! Perception back end abstraction.
//!
//! Each recognition approach (cheap landmark heuristics, expensive VLM
//! inference) implements the [`Backend`] capability contract: start, stop,
//! and process one frame returning a result plus a performance sample. The
//! switch controller consumes back ends only through this trait and the
//! [`BackendRegistry`], never by name.

mod landmark;
mod registry;
mod vlm;

pub use landmark::LandmarkBackend;
pub use registry::{BackendFactory, BackendRegistry};
pub use vlm::{HttpClient, ReqwestClient, VlmBackend, VlmConfig};

#[cfg(test)]
pub use vlm::tests::MockHttpClient;

use std::time::Instant;

use thiserror::Error;

use crate::metrics::MetricsSample;

/// Identifier of a configured recognition approach.
///
/// Ids come from the configuration file and are validated against the
/// registry at startup; the core never dispatches on raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApproachId(String);

impl ApproachId {
    /// Create an approach id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApproachId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A captured camera frame.
///
/// The payload is opaque to the core; only back ends interpret it (JPEG
/// bytes for the VLM, pre-extracted landmark JSON for the heuristic).
#[derive(Debug, Clone)]
pub struct Frame {
    /// Monotonic frame number from the source.
    pub index: u64,

    /// When the frame was captured.
    pub captured_at: Instant,

    /// Encoded frame content.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame captured now.
    pub fn new(index: u64, payload: Vec<u8>) -> Self {
        Self {
            index,
            captured_at: Instant::now(),
            payload,
        }
    }
}

/// Which hand the detector saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandSide {
    Left,
    Right,
}

impl std::fmt::Display for HandSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandSide::Left => write!(f, "left"),
            HandSide::Right => write!(f, "right"),
        }
    }
}

/// Recognized thumb gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    ThumbsUp,
    ThumbsDown,
    None,
}

impl std::fmt::Display for Gesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gesture::ThumbsUp => write!(f, "thumbs_up"),
            Gesture::ThumbsDown => write!(f, "thumbs_down"),
            Gesture::None => write!(f, "none"),
        }
    }
}

/// One detected hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandObservation {
    pub side: HandSide,
    pub fingers_up: u8,
    pub gesture: Gesture,
}

/// Annotated result for one processed frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GestureResult {
    /// Hands detected in the frame, in detection order.
    pub hands: Vec<HandObservation>,

    /// Raw model response, for back ends that produce one.
    pub raw_response: Option<String>,
}

impl GestureResult {
    /// Result with no detections.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of hands detected.
    pub fn hands_detected(&self) -> usize {
        self.hands.len()
    }
}

/// Lifecycle of a back end instance.
///
/// ```text
/// Uninitialized ──► Starting ──► Running ──► Stopping ──► Stopped
///                      │            │
///                      └──► Failed ◄┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendLifecycle {
    #[default]
    Uninitialized,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl std::fmt::Display for BackendLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BackendLifecycle::Uninitialized => "uninitialized",
            BackendLifecycle::Starting => "starting",
            BackendLifecycle::Running => "running",
            BackendLifecycle::Stopping => "stopping",
            BackendLifecycle::Stopped => "stopped",
            BackendLifecycle::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Errors from back end operations.
#[derive(Debug, Error, Clone)]
pub enum BackendError {
    /// Resource allocation during `start` failed.
    #[error("backend failed to start: {0}")]
    Start(String),

    /// Resource release during `stop` failed.
    #[error("backend failed to stop: {0}")]
    Stop(String),

    /// A single `process` call failed; the frame is skipped.
    #[error("frame processing failed: {0}")]
    Process(String),

    /// HTTP transport failure talking to an inference server.
    #[error("http error: {0}")]
    Http(String),

    /// An operation was called in a lifecycle state that does not admit it.
    #[error("invalid state for {operation}: backend is {state}")]
    InvalidState {
        operation: &'static str,
        state: BackendLifecycle,
    },

    /// The requested approach is not registered.
    #[error("unknown approach '{0}'")]
    UnknownApproach(ApproachId),

    /// An approach id was registered twice.
    #[error("approach '{0}' registered twice")]
    DuplicateApproach(ApproachId),
}

/// Capability contract implemented by every recognition approach.
///
/// `process` is synchronous: one frame in, one annotated result plus one
/// metrics sample out. A back end that cannot bound its own processing
/// latency is defective; the core never imposes a timeout on `process`.
pub trait Backend: Send {
    /// Short human-readable name for logs.
    fn name(&self) -> &'static str;

    /// Current lifecycle state.
    fn lifecycle(&self) -> BackendLifecycle;

    /// Allocate resources (models, device handles). May take seconds for
    /// heavy approaches. Calling `start` on a running back end is a
    /// programming error reported as `InvalidState`.
    fn start(&mut self) -> Result<(), BackendError>;

    /// Release resources. Safe to call from Starting, Running, or Failed.
    fn stop(&mut self) -> Result<(), BackendError>;

    /// Process one frame.
    fn process(&mut self, frame: &Frame) -> Result<(GestureResult, MetricsSample), BackendError>;
}
