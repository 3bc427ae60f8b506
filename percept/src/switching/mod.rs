//! Dynamic approach switching.
//!
//! The decision chain per frame: window averages → threshold evaluation →
//! cooldown admission → background candidate start → handoff between
//! frames. [`SwitchController`] owns all of the mutable run state; the
//! evaluator and gate are pure.

mod controller;
mod cooldown;
mod evaluator;

pub use controller::{FrameOutput, SwitchController, SwitchEvent, SWAP_ABANDON_TIMEOUT};
pub use cooldown::CooldownGate;
pub use evaluator::{MetricField, ThresholdEvaluator, ThresholdVerdict};
