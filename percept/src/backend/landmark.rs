//! Landmark heuristic back end.
//!
//! The cheap recognition approach: an upstream extractor delivers 21 hand
//! landmarks per detected hand (normalized image coordinates, y growing
//! downward) and this back end classifies them with plain geometry. No
//! models, no I/O; latency is typically well under a millisecond.
//!
//! # Payload format
//!
//! ```json
//! { "hands": [ { "points": [[x, y, z], ...21 entries...] } ] }
//! ```

use std::time::Instant;

use serde::Deserialize;

use super::{
    Backend, BackendError, BackendLifecycle, Frame, Gesture, GestureResult, HandObservation,
    HandSide,
};
use crate::metrics::{MetricsSample, SysinfoProbe, SystemProbe};

/// Landmarks per hand delivered by the extractor.
pub const LANDMARK_COUNT: usize = 21;

/// Landmark indices used by the heuristics.
const WRIST: usize = 0;
const THUMB_IP: usize = 3;
const THUMB_TIP: usize = 4;
const FINGER_TIPS: [usize; 5] = [4, 8, 12, 16, 20];
const FINGER_PIPS: [usize; 5] = [3, 6, 10, 14, 18];
const FINGER_MCPS: [usize; 4] = [5, 9, 13, 17];

/// Minimum normalized distance for the thumb to count as extended.
const THUMB_EXTENSION_THRESHOLD: f64 = 0.05;

#[derive(Debug, Deserialize)]
struct LandmarkPayload {
    #[serde(default)]
    hands: Vec<HandLandmarks>,
}

#[derive(Debug, Deserialize)]
struct HandLandmarks {
    points: Vec<[f64; 3]>,
}

/// Cheap heuristic back end over pre-extracted hand landmarks.
pub struct LandmarkBackend {
    lifecycle: BackendLifecycle,
    probe: Box<dyn SystemProbe>,
}

impl LandmarkBackend {
    /// Create a back end probing the real host.
    pub fn new() -> Self {
        Self::with_probe(Box::new(SysinfoProbe::new()))
    }

    /// Create with an injected probe.
    pub fn with_probe(probe: Box<dyn SystemProbe>) -> Self {
        Self {
            lifecycle: BackendLifecycle::Uninitialized,
            probe,
        }
    }

    fn classify(&self, payload: &[u8]) -> Result<GestureResult, BackendError> {
        let parsed: LandmarkPayload = serde_json::from_slice(payload)
            .map_err(|e| BackendError::Process(format!("malformed landmark payload: {e}")))?;

        let mut hands = Vec::with_capacity(parsed.hands.len());
        for hand in &parsed.hands {
            if hand.points.len() != LANDMARK_COUNT {
                return Err(BackendError::Process(format!(
                    "hand landmark set has {} points, expected {LANDMARK_COUNT}",
                    hand.points.len()
                )));
            }
            hands.push(HandObservation {
                side: hand_side(&hand.points),
                fingers_up: count_fingers(&hand.points),
                gesture: thumb_gesture(&hand.points),
            });
        }

        Ok(GestureResult {
            hands,
            raw_response: None,
        })
    }
}

impl Default for LandmarkBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for LandmarkBackend {
    fn name(&self) -> &'static str {
        "landmark"
    }

    fn lifecycle(&self) -> BackendLifecycle {
        self.lifecycle
    }

    fn start(&mut self) -> Result<(), BackendError> {
        if self.lifecycle == BackendLifecycle::Running {
            return Err(BackendError::InvalidState {
                operation: "start",
                state: self.lifecycle,
            });
        }
        self.lifecycle = BackendLifecycle::Starting;
        // Nothing heavy to allocate for the heuristic approach.
        self.lifecycle = BackendLifecycle::Running;
        tracing::debug!("landmark backend running");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.lifecycle = BackendLifecycle::Stopping;
        self.lifecycle = BackendLifecycle::Stopped;
        tracing::debug!("landmark backend stopped");
        Ok(())
    }

    fn process(&mut self, frame: &Frame) -> Result<(GestureResult, MetricsSample), BackendError> {
        if self.lifecycle != BackendLifecycle::Running {
            return Err(BackendError::InvalidState {
                operation: "process",
                state: self.lifecycle,
            });
        }

        let started = Instant::now();
        let result = self.classify(&frame.payload)?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let reading = self.probe.read();
        let sample = MetricsSample::derived(latency_ms, reading.cpu_percent, reading.memory_mb);
        Ok((result, sample))
    }
}

/// Count raised fingers.
///
/// A finger is up when its tip sits above its PIP joint (smaller y). The
/// thumb folds sideways, so it is judged on the x axis instead.
fn count_fingers(points: &[[f64; 3]]) -> u8 {
    let mut fingers_up = 0;

    for i in 1..5 {
        if points[FINGER_TIPS[i]][1] < points[FINGER_PIPS[i]][1] {
            fingers_up += 1;
        }
    }

    if points[FINGER_TIPS[0]][0] > points[FINGER_PIPS[0]][0] {
        fingers_up += 1;
    }

    fingers_up
}

/// Detect thumbs-up / thumbs-down.
///
/// Requires the thumb extended away from its IP joint while the remaining
/// fingers are folded below their MCP joints; direction comes from the
/// thumb tip relative to the wrist.
fn thumb_gesture(points: &[[f64; 3]]) -> Gesture {
    let tip = points[THUMB_TIP];
    let ip = points[THUMB_IP];
    let wrist = points[WRIST];

    let thumb_extended = (tip[0] - ip[0]).abs() > THUMB_EXTENSION_THRESHOLD
        && (tip[2] - ip[2]).abs() > THUMB_EXTENSION_THRESHOLD;
    if !thumb_extended {
        return Gesture::None;
    }

    let others_closed = FINGER_TIPS[1..]
        .iter()
        .zip(FINGER_MCPS.iter())
        .all(|(&tip_idx, &mcp_idx)| points[tip_idx][1] >= points[mcp_idx][1]);
    if !others_closed {
        return Gesture::None;
    }

    if tip[1] < wrist[1] {
        Gesture::ThumbsUp
    } else {
        Gesture::ThumbsDown
    }
}

/// Infer which side of the image the hand is on from the wrist position.
fn hand_side(points: &[[f64; 3]]) -> HandSide {
    if points[WRIST][0] < 0.5 {
        HandSide::Left
    } else {
        HandSide::Right
    }
}
