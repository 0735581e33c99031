use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One-unit-per-second session counter.
///
/// Driven either by a cooperative 1 s [`tick`](Self::tick) or by wall-clock
/// catch-up through [`advance_to`](Self::advance_to). Both move the same
/// reference point, so mixing them never double counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionClock {
    elapsed_secs: u64,
    running: bool,
    /// Wall-clock instant that `elapsed_secs` is accounted up to.
    #[serde(default)]
    last_tick_at: Option<DateTime<Utc>>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Zero the counter and start running from `now`.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.elapsed_secs = 0;
        self.running = true;
        self.last_tick_at = Some(now);
    }

    /// Count one second. Ignored while stopped.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        self.last_tick_at = self.last_tick_at.map(|t| t + Duration::seconds(1));
    }

    /// Add the whole seconds between the last accounted instant and `now`.
    /// Sub-second remainders carry over to the next call.
    pub fn advance_to(&mut self, now: DateTime<Utc>) {
        if !self.running {
            return;
        }
        if let Some(last) = self.last_tick_at {
            let whole = (now - last).num_seconds().max(0);
            self.elapsed_secs = self.elapsed_secs.saturating_add(whole as u64);
            self.last_tick_at = Some(last + Duration::seconds(whole));
        }
    }

    /// Stop counting and return the elapsed total.
    pub fn stop(&mut self) -> u64 {
        self.running = false;
        self.last_tick_at = None;
        self.elapsed_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn ticks_count_only_while_running() {
        let mut clock = SessionClock::new();
        clock.tick();
        assert_eq!(clock.elapsed_secs(), 0);

        clock.start(t0());
        clock.tick();
        clock.tick();
        assert_eq!(clock.elapsed_secs(), 2);

        assert_eq!(clock.stop(), 2);
        clock.tick();
        assert_eq!(clock.elapsed_secs(), 2);
        assert!(!clock.is_running());
    }

    #[test]
    fn advance_keeps_sub_second_remainder() {
        let mut clock = SessionClock::new();
        clock.start(t0());
        clock.advance_to(t0() + Duration::milliseconds(1500));
        assert_eq!(clock.elapsed_secs(), 1);
        clock.advance_to(t0() + Duration::milliseconds(2100));
        assert_eq!(clock.elapsed_secs(), 2);
    }

    #[test]
    fn ticks_and_catch_up_do_not_double_count() {
        let mut clock = SessionClock::new();
        clock.start(t0());
        clock.tick();
        clock.tick();
        clock.advance_to(t0() + Duration::seconds(5));
        assert_eq!(clock.elapsed_secs(), 5);
    }

    #[test]
    fn backwards_wall_clock_adds_nothing() {
        let mut clock = SessionClock::new();
        clock.start(t0());
        clock.advance_to(t0() - Duration::seconds(30));
        assert_eq!(clock.elapsed_secs(), 0);
    }

    #[test]
    fn restart_zeroes_counter() {
        let mut clock = SessionClock::new();
        clock.start(t0());
        clock.tick();
        clock.stop();
        clock.start(t0());
        assert_eq!(clock.elapsed_secs(), 0);
    }
}
