//! Switch controller: owns the active back end and orchestrates swaps.
//!
//! # State Machine
//!
//! ```text
//!              violation + cooldown admits
//!     Idle ───────────────────────────────► SwappingInBackground
//!       ▲                                        │
//!       │ candidate Running (handoff)            │
//!       │ or candidate start failed              │
//!       └────────────────────────────────────────┘
//! ```
//!
//! While a swap is in background, the current back end keeps serving every
//! frame; the candidate's `start()` runs on a worker thread and its outcome
//! is observed by a non-blocking poll at the top of each `process_frame`
//! call. The handoff therefore always lands between frames, never mid-frame.
//!
//! All mutable run state (window, last-switch timestamp, pending swap)
//! lives here and is touched only from the single frame-processing path.

use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::cooldown::CooldownGate;
use super::evaluator::{MetricField, ThresholdEvaluator};
use crate::backend::{ApproachId, Backend, BackendError, BackendRegistry, Frame, GestureResult};
use crate::config::{EngineConfig, Mode, Thresholds};
use crate::error::EngineError;
use crate::metrics::{MetricsSample, MetricsWindow};

/// How long shutdown waits for an in-flight candidate start before
/// abandoning it.
pub const SWAP_ABANDON_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-frame output handed to the caller.
///
/// The shape never changes with internal controller state; a swap in
/// progress is invisible here apart from which approach served the frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub frame_index: u64,
    pub result: GestureResult,
    pub sample: MetricsSample,
    pub approach: ApproachId,
}

/// Emitted once per completed swap, for external logging and display.
#[derive(Debug, Clone)]
pub struct SwitchEvent {
    pub from: ApproachId,
    pub to: ApproachId,
    pub violated_fields: Vec<MetricField>,
    pub completed_at: DateTime<Utc>,
}

/// A candidate back end starting on a worker thread.
struct PendingSwap {
    target: ApproachId,
    violated_fields: Vec<MetricField>,
    result_rx: mpsc::Receiver<Result<Box<dyn Backend>, BackendError>>,
    launched_at: Instant,
}

/// Outcome of polling a pending swap, decoupled from `self` borrows.
enum SwapPoll {
    StillStarting,
    Ready(Box<dyn Backend>),
    Failed(BackendError),
    WorkerGone,
}

/// Owns the active back end and decides when to swap it.
pub struct SwitchController {
    mode: Mode,
    registry: BackendRegistry,
    thresholds: Thresholds,
    window: MetricsWindow,
    gate: CooldownGate,
    current_id: ApproachId,
    current: Box<dyn Backend>,
    last_switch: Option<Instant>,
    pending: Option<PendingSwap>,
    events: Vec<SwitchEvent>,
}

impl SwitchController {
    /// Create the controller and start the configured starting approach.
    ///
    /// A starting approach that fails to start is fatal; there is nothing
    /// to run.
    pub fn start(config: &EngineConfig, registry: BackendRegistry) -> Result<Self, EngineError> {
        let approach = config.starting_approach.clone();
        let mut current =
            registry
                .create(&approach)
                .map_err(|source| EngineError::InitialBackendStart {
                    approach: approach.clone(),
                    source,
                })?;
        current
            .start()
            .map_err(|source| EngineError::InitialBackendStart {
                approach: approach.clone(),
                source,
            })?;

        tracing::info!(
            approach = %approach,
            mode = %config.mode,
            "starting backend running"
        );

        Ok(Self {
            mode: config.mode,
            registry,
            thresholds: config.dynamic.thresholds,
            window: MetricsWindow::new(config.dynamic.evaluation_window),
            gate: CooldownGate::new(config.dynamic.switch_cooldown),
            current_id: approach,
            current,
            last_switch: None,
            pending: None,
            events: Vec::new(),
        })
    }

    /// The approach currently serving frames.
    pub fn current_approach(&self) -> &ApproachId {
        &self.current_id
    }

    /// `true` while a candidate back end is starting in the background.
    pub fn swap_in_progress(&self) -> bool {
        self.pending.is_some()
    }

    /// Switch events since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<SwitchEvent> {
        std::mem::take(&mut self.events)
    }

    /// Process one frame on the active back end.
    ///
    /// An error means this frame is skipped: no sample is recorded, no
    /// result is emitted, and the loop continues. In dynamic mode the
    /// returned sample also feeds the evaluation window and may kick off a
    /// background swap; the frame's own output is unaffected either way.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameOutput, BackendError> {
        self.observe_pending_swap();

        let (result, sample) = self.current.process(frame)?;

        if self.mode == Mode::Dynamic {
            self.window.record(sample);
            self.maybe_begin_swap();
        }

        Ok(FrameOutput {
            frame_index: frame.index,
            result,
            sample,
            approach: self.current_id.clone(),
        })
    }

    /// Shut down, bounding the wait for any in-flight candidate start.
    pub fn shutdown(mut self, timeout: Duration) {
        if let Some(pending) = self.pending.take() {
            match pending.result_rx.recv_timeout(timeout) {
                Ok(Ok(mut candidate)) => {
                    if let Err(e) = candidate.stop() {
                        tracing::warn!(approach = %pending.target, error = %e,
                            "failed to stop candidate backend during shutdown");
                    }
                }
                Ok(Err(e)) => {
                    tracing::debug!(approach = %pending.target, error = %e,
                        "candidate start failed during shutdown");
                }
                Err(_) => {
                    tracing::warn!(approach = %pending.target,
                        "timed out waiting for candidate start, abandoning it (degraded shutdown)");
                }
            }
        }

        if let Err(e) = self.current.stop() {
            tracing::warn!(approach = %self.current_id, error = %e,
                "failed to stop active backend during shutdown");
        }
        tracing::info!("switch controller shut down");
    }

    /// Non-blocking check whether the background candidate start finished.
    fn observe_pending_swap(&mut self) {
        let poll = match &self.pending {
            None => return,
            Some(pending) => match pending.result_rx.try_recv() {
                Ok(Ok(candidate)) => SwapPoll::Ready(candidate),
                Ok(Err(e)) => SwapPoll::Failed(e),
                Err(TryRecvError::Empty) => SwapPoll::StillStarting,
                Err(TryRecvError::Disconnected) => SwapPoll::WorkerGone,
            },
        };

        match poll {
            SwapPoll::StillStarting => {}
            SwapPoll::Ready(candidate) => {
                if let Some(pending) = self.pending.take() {
                    self.complete_swap(pending, candidate);
                }
            }
            SwapPoll::Failed(e) => {
                if let Some(pending) = self.pending.take() {
                    // Failed attempts arm the cooldown too; without this a
                    // persistent violation would hammer a broken candidate.
                    self.last_switch = Some(Instant::now());
                    tracing::warn!(
                        from = %self.current_id,
                        to = %pending.target,
                        error = %e,
                        "candidate backend failed to start, staying on current approach"
                    );
                }
            }
            SwapPoll::WorkerGone => {
                if let Some(pending) = self.pending.take() {
                    self.last_switch = Some(Instant::now());
                    tracing::warn!(to = %pending.target,
                        "candidate start worker vanished, staying on current approach");
                }
            }
        }
    }

    /// Promote the candidate and retire the previous back end.
    fn complete_swap(&mut self, pending: PendingSwap, candidate: Box<dyn Backend>) {
        let now = Instant::now();
        let previous_id = std::mem::replace(&mut self.current_id, pending.target);
        let previous = std::mem::replace(&mut self.current, candidate);

        stop_in_background(previous_id.clone(), previous);

        self.window.reset();
        // Completion time, not decision time: a slow model load must not
        // eat into the cooldown.
        self.last_switch = Some(now);

        tracing::info!(
            from = %previous_id,
            to = %self.current_id,
            startup_ms = now.duration_since(pending.launched_at).as_millis() as u64,
            violated = ?pending.violated_fields,
            "backend swap complete"
        );

        self.events.push(SwitchEvent {
            from: previous_id,
            to: self.current_id.clone(),
            violated_fields: pending.violated_fields,
            completed_at: Utc::now(),
        });
    }

    /// Evaluate thresholds and, if warranted, launch a background swap.
    fn maybe_begin_swap(&mut self) {
        if self.pending.is_some() || !self.window.is_full() {
            return;
        }

        let Ok(averages) = self.window.averages() else {
            return; // full window is never empty, but do not panic on it
        };
        let verdict = ThresholdEvaluator::evaluate(&averages, &self.thresholds);
        if !verdict.triggered() {
            return;
        }

        let now = Instant::now();
        if !self.gate.admit(now, self.last_switch) {
            tracing::debug!(
                violated = ?verdict.violated_fields(),
                "threshold violation within cooldown, switch suppressed"
            );
            return;
        }

        let Some(target) = self.registry.fallback_for(&self.current_id) else {
            tracing::warn!(
                violated = ?verdict.violated_fields(),
                "thresholds violated but no alternative approach is registered"
            );
            return;
        };

        let candidate = match self.registry.create(&target) {
            Ok(candidate) => candidate,
            Err(e) => {
                self.last_switch = Some(now);
                tracing::warn!(to = %target, error = %e,
                    "could not create candidate backend, staying on current approach");
                return;
            }
        };

        tracing::info!(
            from = %self.current_id,
            to = %target,
            violated = ?verdict.violated_fields(),
            avg_latency_ms = format!("{:.1}", averages.latency_ms),
            avg_fps = format!("{:.2}", averages.fps),
            "performance thresholds violated, starting candidate backend"
        );

        let (result_tx, result_rx) = mpsc::channel();
        let spawn = thread::Builder::new()
            .name("percept-swap".to_string())
            .spawn(move || {
                let mut candidate = candidate;
                let outcome = match candidate.start() {
                    Ok(()) => Ok(candidate),
                    Err(e) => Err(e),
                };
                // Receiver may be gone if the controller shut down.
                let _ = result_tx.send(outcome);
            });

        match spawn {
            Ok(_handle) => {
                self.pending = Some(PendingSwap {
                    target,
                    violated_fields: verdict.into_fields(),
                    result_rx,
                    launched_at: now,
                });
            }
            Err(e) => {
                self.last_switch = Some(now);
                tracing::warn!(to = %target, error = %e,
                    "could not spawn candidate start thread, staying on current approach");
            }
        }
    }
}

/// Retire a swapped-out back end without blocking the frame path.
///
/// Stop errors are logged and never fatal; the swap that displaced this
/// back end has already completed.
fn stop_in_background(id: ApproachId, mut backend: Box<dyn Backend>) {
    let spawn = thread::Builder::new()
        .name("percept-stop".to_string())
        .spawn(move || {
            if let Err(e) = backend.stop() {
                tracing::warn!(approach = %id, error = %e,
                    "failed to release swapped-out backend");
            }
        });
    if let Err(e) = spawn {
        tracing::warn!(error = %e, "could not spawn stop thread for swapped-out backend");
    }
}
