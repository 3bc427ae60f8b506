//! Host CPU and memory probes.
//!
//! Back ends attach a probe reading to every sample they return. The
//! [`SystemProbe`] trait keeps the OS dependency behind a seam so tests can
//! inject fixed readings, and so a probe failure degrades a single field
//! instead of failing the frame.

use sysinfo::{ProcessesToUpdate, System};

/// One CPU / memory reading. Absent fields are degraded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeReading {
    /// Global CPU utilization (0-100).
    pub cpu_percent: Option<f64>,

    /// Resident memory of the current process in megabytes.
    pub memory_mb: Option<f64>,
}

/// Source of host CPU / memory readings.
pub trait SystemProbe: Send {
    /// Take one reading. Fields that cannot be obtained are `None`.
    fn read(&mut self) -> ProbeReading;
}

/// Probe backed by the `sysinfo` crate.
///
/// CPU utilization needs two refreshes a short interval apart before the
/// value is meaningful, so the first reading reports the CPU field as
/// degraded rather than a fabricated zero.
pub struct SysinfoProbe {
    system: System,
    pid: Option<sysinfo::Pid>,
    cpu_primed: bool,
}

impl SysinfoProbe {
    /// Create a probe for the current process.
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid().ok();
        if pid.is_none() {
            tracing::warn!("could not resolve current pid, memory readings will be degraded");
        }
        Self {
            system: System::new(),
            pid,
            cpu_primed: false,
        }
    }

    fn read_memory_mb(&mut self) -> Option<f64> {
        let pid = self.pid?;
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        self.system
            .process(pid)
            .map(|p| p.memory() as f64 / (1024.0 * 1024.0))
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for SysinfoProbe {
    fn read(&mut self) -> ProbeReading {
        self.system.refresh_cpu_usage();
        let cpu_percent = if self.cpu_primed {
            Some(f64::from(self.system.global_cpu_usage()))
        } else {
            self.cpu_primed = true;
            None
        };

        ProbeReading {
            cpu_percent,
            memory_mb: self.read_memory_mb(),
        }
    }
}

/// Probe returning a fixed reading. Useful for tests and deterministic
/// replay runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe {
    reading: ProbeReading,
}

impl FixedProbe {
    /// Create a probe that always returns the given values.
    pub fn new(cpu_percent: Option<f64>, memory_mb: Option<f64>) -> Self {
        Self {
            reading: ProbeReading {
                cpu_percent,
                memory_mb,
            },
        }
    }

    /// Probe whose every field is degraded.
    pub fn degraded() -> Self {
        Self::new(None, None)
    }
}

impl SystemProbe for FixedProbe {
    fn read(&mut self) -> ProbeReading {
        self.reading
    }
}
