//! Result sinks: terminal output and an optional CSV metrics log.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use percept::engine::ResultSink;
use percept::switching::{FrameOutput, SwitchEvent};

use crate::error::CliError;

/// Prints per-frame results to stdout and optionally appends every sample
/// to a CSV file for offline analysis.
pub struct SessionSink {
    csv: Option<BufWriter<File>>,
}

impl SessionSink {
    pub fn new() -> Self {
        Self { csv: None }
    }

    /// Also write one CSV row per frame to `path`.
    pub fn with_csv(path: &Path) -> Result<Self, CliError> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(
            writer,
            "frame,approach,hands,latency_ms,cpu_percent,memory_mb,fps,fps_source"
        )?;
        Ok(Self { csv: Some(writer) })
    }

    fn describe(output: &FrameOutput) -> String {
        if output.result.hands.is_empty() {
            return "no hands".to_string();
        }
        output
            .result
            .hands
            .iter()
            .map(|hand| format!("{} hand, {} fingers, {}", hand.side, hand.fingers_up, hand.gesture))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Default for SessionSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSink for SessionSink {
    fn on_frame(&mut self, output: &FrameOutput) {
        println!(
            "[{}] {} | {} ({:.1}ms, {:.2} fps)",
            output.frame_index,
            output.approach,
            Self::describe(output),
            output.sample.latency_ms,
            output.sample.fps,
        );

        if let Some(writer) = &mut self.csv {
            let cpu = output
                .sample
                .cpu_percent
                .map_or(String::new(), |v| format!("{v:.1}"));
            let mem = output
                .sample
                .memory_mb
                .map_or(String::new(), |v| format!("{v:.1}"));
            if let Err(e) = writeln!(
                writer,
                "{},{},{},{:.2},{},{},{:.3},{}",
                output.frame_index,
                output.approach,
                output.result.hands_detected(),
                output.sample.latency_ms,
                cpu,
                mem,
                output.sample.fps,
                output.sample.fps_source,
            ) {
                tracing::warn!(error = %e, "failed to write metrics CSV row");
            }
        }
    }

    fn on_switch(&mut self, event: &SwitchEvent) {
        let fields: Vec<String> = event
            .violated_fields
            .iter()
            .map(|f| f.to_string())
            .collect();
        println!(
            ">>> switched {} -> {} (violated: {}) at {}",
            event.from,
            event.to,
            fields.join(", "),
            event.completed_at.format("%H:%M:%S"),
        );
    }
}
