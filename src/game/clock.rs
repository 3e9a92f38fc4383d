//! Fixed-rate simulation pacing
//!
//! The host calls [`SimulationClock::poll`] from every display-refresh
//! callback. At most one step is granted per interval, however fast the
//! callback fires; a slow or backgrounded host simply gets fewer steps.

use std::time::Duration;

use crate::game::constants::timing::TICK_DURATION_MS;

/// Tick counter plus last-tick timestamp
#[derive(Debug, Clone)]
pub struct SimulationClock {
    interval: Duration,
    last_tick: Duration,
    ticks: u64,
}

impl SimulationClock {
    /// `start` is the host's current time; the first step comes one interval later
    pub fn new(interval: Duration, start: Duration) -> Self {
        Self {
            interval,
            last_tick: start,
            ticks: 0,
        }
    }

    /// Returns true when a simulation step is due at `now`
    pub fn poll(&mut self, now: Duration) -> bool {
        match now.checked_sub(self.last_tick) {
            Some(elapsed) if elapsed >= self.interval => {
                self.last_tick = now;
                self.ticks += 1;
                true
            }
            _ => false,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_tick(&self) -> Duration {
        self.last_tick
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(TICK_DURATION_MS), Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_callbacks(clock: &mut SimulationClock, hz: u32, seconds: u32) -> u64 {
        let mut steps = 0;
        for i in 1..=(hz * seconds) {
            let now = Duration::from_secs_f64(f64::from(i) / f64::from(hz));
            if clock.poll(now) {
                steps += 1;
            }
        }
        steps
    }

    #[test]
    fn test_240hz_callbacks_give_10_steps() {
        let mut clock = SimulationClock::default();
        assert_eq!(clock.interval(), Duration::from_millis(TICK_DURATION_MS));
        let steps = run_callbacks(&mut clock, 240, 1);
        assert!((9..=11).contains(&steps), "got {} steps", steps);
        assert_eq!(clock.ticks(), steps);
    }

    #[test]
    fn test_slow_callbacks_step_every_time() {
        // 5 Hz display: every callback is past the interval
        let mut clock = SimulationClock::default();
        assert_eq!(run_callbacks(&mut clock, 5, 2), 10);
    }

    #[test]
    fn test_no_step_before_interval() {
        let mut clock = SimulationClock::new(Duration::from_millis(100), Duration::from_millis(1000));
        assert!(!clock.poll(Duration::from_millis(1099)));
        assert!(clock.poll(Duration::from_millis(1100)));
        assert!(!clock.poll(Duration::from_millis(1150)));
        assert_eq!(clock.last_tick(), Duration::from_millis(1100));
    }

    #[test]
    fn test_time_going_backwards() {
        let mut clock = SimulationClock::new(Duration::from_millis(100), Duration::from_secs(5));
        assert!(!clock.poll(Duration::from_secs(1)));
        assert_eq!(clock.ticks(), 0);
    }
}
