//! Cooldown gate between switches.
//!
//! Suppresses switch attempts until enough time has passed since the last
//! one, preventing oscillation between approaches and hot retry loops after
//! a failed candidate start.

use std::time::{Duration, Instant};

/// Admits or denies a switch attempt based on elapsed time.
///
/// Stateless beyond the configured cooldown: the caller supplies the
/// last-switch timestamp.
#[derive(Debug, Clone, Copy)]
pub struct CooldownGate {
    cooldown: Duration,
}

impl CooldownGate {
    /// Create a gate with the given minimum time between switches.
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    /// Configured cooldown duration.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// `true` iff no switch has happened yet or at least the cooldown has
    /// elapsed since the last one. The boundary is inclusive: elapsed time
    /// exactly equal to the cooldown admits.
    pub fn admit(&self, now: Instant, last_switch: Option<Instant>) -> bool {
        match last_switch {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.cooldown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_when_never_switched() {
        let gate = CooldownGate::new(Duration::from_secs(10));
        assert!(gate.admit(Instant::now(), None));
    }

    #[test]
    fn test_admits_exactly_at_cooldown() {
        let cooldown = Duration::from_secs(10);
        let gate = CooldownGate::new(cooldown);
        let now = Instant::now();
        assert!(gate.admit(now, Some(now - cooldown)));
    }

    #[test]
    fn test_denies_just_under_cooldown() {
        let cooldown = Duration::from_secs(10);
        let gate = CooldownGate::new(cooldown);
        let now = Instant::now();
        let last = now - (cooldown - Duration::from_millis(1));
        assert!(!gate.admit(now, Some(last)));
    }

    #[test]
    fn test_admits_well_past_cooldown() {
        let gate = CooldownGate::new(Duration::from_secs(10));
        let now = Instant::now();
        assert!(gate.admit(now, Some(now - Duration::from_secs(11))));
    }

    #[test]
    fn test_zero_cooldown_always_admits() {
        let gate = CooldownGate::new(Duration::ZERO);
        let now = Instant::now();
        assert!(gate.admit(now, Some(now)));
    }

    #[test]
    fn test_last_switch_in_future_denies() {
        // Clock skew between decision points saturates to zero elapsed.
        let gate = CooldownGate::new(Duration::from_secs(10));
        let now = Instant::now();
        assert!(!gate.admit(now, Some(now + Duration::from_secs(1))));
    }
}
