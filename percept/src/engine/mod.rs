//! The capture-process-emit session loop.
//!
//! [`Engine`] drives frames from a [`FrameSource`] through the
//! [`SwitchController`] and hands per-frame output and switch events to a
//! [`ResultSink`]. The loop paces itself to the configured frame interval:
//! processing time is deducted from the sleep, and a frame whose processing
//! alone exceeds the interval is counted as a deadline miss and the next
//! frame starts immediately.
//!
//! A backend error on one frame skips that frame and the loop continues;
//! only initial backend startup is fatal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::backend::{ApproachId, BackendRegistry, Frame};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::switching::{FrameOutput, SwitchController, SwitchEvent, SWAP_ABANDON_TIMEOUT};

/// Supplies frames to the engine.
///
/// `None` ends the session. Sources are free to block while acquiring the
/// next frame; pacing is the engine's job, not the source's.
pub trait FrameSource: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Acquire the next frame, or `None` when the source is exhausted.
    fn next_frame(&mut self) -> Option<Frame>;
}

/// Receives per-frame output and switch events.
pub trait ResultSink {
    fn on_frame(&mut self, output: &FrameOutput);

    fn on_switch(&mut self, event: &SwitchEvent);
}

/// Totals for one completed session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub frames_processed: u64,
    pub frames_failed: u64,
    pub deadline_misses: u64,
    /// Longest single-frame processing time observed.
    pub worst_frame: Duration,
    pub elapsed: Duration,
    pub switches: Vec<SwitchEvent>,
    /// Approach that was active when the session ended.
    pub final_approach: ApproachId,
}

impl SessionSummary {
    /// Processed frames per wall-clock second over the whole session.
    pub fn effective_fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames_processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Session loop driver.
pub struct Engine {
    frame_interval: Duration,
    controller: SwitchController,
}

impl Engine {
    /// Build the engine and start the configured starting approach.
    pub fn new(config: &EngineConfig, registry: BackendRegistry) -> Result<Self, EngineError> {
        let controller = SwitchController::start(config, registry)?;
        Ok(Self {
            frame_interval: config.frame_interval,
            controller,
        })
    }

    /// The approach currently serving frames.
    pub fn current_approach(&self) -> &ApproachId {
        self.controller.current_approach()
    }

    /// Run the session until the source is exhausted or `shutdown` is set.
    ///
    /// Consumes the engine: the controller and its back ends are stopped
    /// before the summary is returned.
    pub fn run<S: FrameSource, K: ResultSink>(
        mut self,
        source: &mut S,
        sink: &mut K,
        shutdown: Arc<AtomicBool>,
    ) -> SessionSummary {
        let session_start = Instant::now();
        let mut frames_processed = 0u64;
        let mut frames_failed = 0u64;
        let mut deadline_misses = 0u64;
        let mut worst_frame = Duration::ZERO;
        let mut switches = Vec::new();

        tracing::info!(
            source = source.name(),
            approach = %self.controller.current_approach(),
            interval_ms = self.frame_interval.as_millis() as u64,
            "session started"
        );

        while !shutdown.load(Ordering::Relaxed) {
            let Some(frame) = source.next_frame() else {
                tracing::info!("frame source exhausted, ending session");
                break;
            };

            let tick_start = Instant::now();
            match self.controller.process_frame(&frame) {
                Ok(output) => {
                    frames_processed += 1;
                    sink.on_frame(&output);
                }
                Err(e) => {
                    frames_failed += 1;
                    tracing::warn!(frame = frame.index, error = %e, "frame skipped");
                }
            }

            for event in self.controller.drain_events() {
                sink.on_switch(&event);
                switches.push(event);
            }

            let spent = tick_start.elapsed();
            if spent > worst_frame {
                worst_frame = spent;
            }
            match self.frame_interval.checked_sub(spent) {
                Some(remaining) if !remaining.is_zero() => thread::sleep(remaining),
                _ => {
                    if spent > self.frame_interval && !self.frame_interval.is_zero() {
                        deadline_misses += 1;
                        tracing::debug!(
                            frame = frame.index,
                            spent_ms = spent.as_millis() as u64,
                            budget_ms = self.frame_interval.as_millis() as u64,
                            "frame overran its interval"
                        );
                    }
                }
            }
        }

        let final_approach = self.controller.current_approach().clone();
        self.controller.shutdown(SWAP_ABANDON_TIMEOUT);

        let summary = SessionSummary {
            frames_processed,
            frames_failed,
            deadline_misses,
            worst_frame,
            elapsed: session_start.elapsed(),
            switches,
            final_approach,
        };
        tracing::info!(
            frames = summary.frames_processed,
            failed = summary.frames_failed,
            switches = summary.switches.len(),
            deadline_misses = summary.deadline_misses,
            elapsed_s = format!("{:.1}", summary.elapsed.as_secs_f64()),
            approach = %summary.final_approach,
            "session ended"
        );
        summary
    }
}
