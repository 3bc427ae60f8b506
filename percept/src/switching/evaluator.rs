//! Threshold evaluation over window averages.
//!
//! A pure comparison with no internal state: each limit is checked
//! independently and every violated field is collected, so the switch log
//! names all of them rather than just the first.

use crate::config::Thresholds;
use crate::metrics::WindowAverages;

/// Metric fields that can violate a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricField {
    Latency,
    Cpu,
    Memory,
    Fps,
}

impl std::fmt::Display for MetricField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MetricField::Latency => "latency",
            MetricField::Cpu => "cpu",
            MetricField::Memory => "memory",
            MetricField::Fps => "fps",
        };
        f.write_str(s)
    }
}

/// Outcome of one threshold evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdVerdict {
    violations: Vec<MetricField>,
}

impl ThresholdVerdict {
    /// `true` if any limit was violated.
    pub fn triggered(&self) -> bool {
        !self.violations.is_empty()
    }

    /// All violated fields, in checking order.
    pub fn violated_fields(&self) -> &[MetricField] {
        &self.violations
    }

    /// Consume the verdict, yielding the violated fields.
    pub fn into_fields(self) -> Vec<MetricField> {
        self.violations
    }
}

/// Pure threshold comparison.
pub struct ThresholdEvaluator;

impl ThresholdEvaluator {
    /// Compare window averages against the configured limits.
    ///
    /// Comparisons are strict (`>` for upper bounds, `<` for `min_fps`);
    /// averages exactly at a limit never trigger. Degraded fields (absent
    /// averages) cannot violate.
    pub fn evaluate(averages: &WindowAverages, thresholds: &Thresholds) -> ThresholdVerdict {
        let mut violations = Vec::new();

        if averages.latency_ms > thresholds.max_latency_ms {
            violations.push(MetricField::Latency);
        }
        if let Some(cpu) = averages.cpu_percent {
            if cpu > thresholds.max_cpu_percent {
                violations.push(MetricField::Cpu);
            }
        }
        if let Some(memory) = averages.memory_mb {
            if memory > thresholds.max_memory_mb {
                violations.push(MetricField::Memory);
            }
        }
        if averages.fps < thresholds.min_fps {
            violations.push(MetricField::Fps);
        }

        ThresholdVerdict { violations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn averages(latency_ms: f64, cpu: f64, memory: f64, fps: f64) -> WindowAverages {
        WindowAverages {
            latency_ms,
            cpu_percent: Some(cpu),
            memory_mb: Some(memory),
            fps,
        }
    }

    fn thresholds() -> Thresholds {
        Thresholds {
            max_latency_ms: 1000.0,
            max_cpu_percent: 80.0,
            max_memory_mb: 2000.0,
            min_fps: 0.8,
        }
    }

    #[test]
    fn test_all_within_limits_does_not_trigger() {
        let verdict =
            ThresholdEvaluator::evaluate(&averages(500.0, 40.0, 1000.0, 2.0), &thresholds());
        assert!(!verdict.triggered());
    }

    #[test]
    fn test_exactly_at_limits_does_not_trigger() {
        let verdict =
            ThresholdEvaluator::evaluate(&averages(1000.0, 80.0, 2000.0, 0.8), &thresholds());
        assert!(!verdict.triggered());
        assert!(verdict.violated_fields().is_empty());
    }

    #[test]
    fn test_one_above_latency_triggers() {
        let verdict =
            ThresholdEvaluator::evaluate(&averages(1001.0, 40.0, 1000.0, 2.0), &thresholds());
        assert!(verdict.triggered());
        assert_eq!(verdict.violated_fields(), &[MetricField::Latency]);
    }

    #[test]
    fn test_one_below_min_fps_triggers() {
        let verdict =
            ThresholdEvaluator::evaluate(&averages(500.0, 40.0, 1000.0, 0.79), &thresholds());
        assert_eq!(verdict.violated_fields(), &[MetricField::Fps]);
    }

    #[test]
    fn test_all_violations_collected() {
        let verdict =
            ThresholdEvaluator::evaluate(&averages(1500.0, 95.0, 3000.0, 0.5), &thresholds());
        assert_eq!(
            verdict.violated_fields(),
            &[
                MetricField::Latency,
                MetricField::Cpu,
                MetricField::Memory,
                MetricField::Fps
            ]
        );
    }

    #[test]
    fn test_degraded_fields_cannot_violate() {
        let degraded = WindowAverages {
            latency_ms: 500.0,
            cpu_percent: None,
            memory_mb: None,
            fps: 2.0,
        };
        let verdict = ThresholdEvaluator::evaluate(&degraded, &thresholds());
        assert!(!verdict.triggered());
    }

    #[test]
    fn test_spec_scenario_slow_latency_only() {
        // Five samples at 1200ms average 1200ms; derived fps 0.83 stays
        // above the 0.8 floor, so only latency violates.
        let verdict =
            ThresholdEvaluator::evaluate(&averages(1200.0, 40.0, 1000.0, 0.833), &thresholds());
        assert_eq!(verdict.violated_fields(), &[MetricField::Latency]);
    }
}
