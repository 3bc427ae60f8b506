//! Frame sources for driving a session without a live camera.
//!
//! The synthetic source fabricates landmark payloads cycling through a few
//! poses; the replay source feeds recorded payloads from a JSON-lines file,
//! one frame per line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use percept::engine::FrameSource;
use percept::Frame;

use crate::error::CliError;

/// Fabricates landmark payloads, cycling through a fixed pose sequence.
pub struct SyntheticSource {
    remaining: Option<u64>,
    next_index: u64,
}

impl SyntheticSource {
    /// Source yielding `max_frames` frames, or unbounded when `None`.
    pub fn new(max_frames: Option<u64>) -> Self {
        Self {
            remaining: max_frames,
            next_index: 0,
        }
    }

    /// One hand in a pose chosen by the frame index.
    fn payload(index: u64) -> Vec<u8> {
        let mut points = vec![[0.3, 0.8, 0.0]; 21];
        // Folded fingers as the baseline.
        for (pip, tip) in [(6, 8), (10, 12), (14, 16), (18, 20)] {
            points[pip] = [0.3, 0.6, 0.0];
            points[tip] = [0.3, 0.7, 0.0];
        }
        for mcp in [5, 9, 13, 17] {
            points[mcp] = [0.3, 0.55, 0.0];
        }
        points[3] = [0.32, 0.6, 0.0];
        points[4] = [0.31, 0.65, 0.0];

        match index % 4 {
            0 => {} // fist
            1 => {
                // open palm
                for tip in [8, 12, 16, 20] {
                    points[tip] = [0.3, 0.4, 0.0];
                }
                points[4] = [0.4, 0.6, 0.0];
            }
            2 => {
                // thumbs up
                points[4] = [0.4, 0.3, 0.1];
            }
            _ => {
                // thumbs down
                points[4] = [0.4, 0.95, 0.1];
            }
        }

        let hands = serde_json::json!({ "hands": [{ "points": points }] });
        serde_json::to_vec(&hands).unwrap_or_default()
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if let Some(remaining) = &mut self.remaining {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        let frame = Frame::new(self.next_index, Self::payload(self.next_index));
        self.next_index += 1;
        Some(frame)
    }
}

/// Replays recorded frame payloads from a JSON-lines file.
pub struct ReplaySource {
    lines: std::io::Lines<BufReader<File>>,
    remaining: Option<u64>,
    next_index: u64,
}

impl ReplaySource {
    /// Open a recording; each non-empty line becomes one frame payload.
    pub fn open(path: &Path, max_frames: Option<u64>) -> Result<Self, CliError> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            remaining: max_frames,
            next_index: 0,
        })
    }
}

impl FrameSource for ReplaySource {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if let Some(remaining) = &mut self.remaining {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        loop {
            match self.lines.next()? {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => {
                    let frame = Frame::new(self.next_index, line.into_bytes());
                    self.next_index += 1;
                    return Some(frame);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "unreadable line in recording, ending replay");
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_synthetic_source_respects_max_frames() {
        let mut source = SyntheticSource::new(Some(3));
        assert!(source.next_frame().is_some());
        assert!(source.next_frame().is_some());
        assert!(source.next_frame().is_some());
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_synthetic_payload_is_valid_landmark_json() {
        let payload = SyntheticSource::payload(2);
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["hands"][0]["points"].as_array().unwrap().len(), 21);
    }

    #[test]
    fn test_replay_source_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"hands\":[]}}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{{\"hands\":[]}}").unwrap();

        let mut source = ReplaySource::open(file.path(), None).unwrap();
        assert_eq!(source.next_frame().unwrap().index, 0);
        assert_eq!(source.next_frame().unwrap().index, 1);
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_replay_source_missing_file() {
        assert!(ReplaySource::open(Path::new("/nonexistent.jsonl"), None).is_err());
    }
}
