//! Time source injected into the engine
//!
//! Cache expiry and graph timestamps read the clock through this trait so
//! tests can move time forward without sleeping. Build deadlines use the
//! monotonic clock instead, since they bound real CPU time.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{InfravizError, Result};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = now.checked_add_signed(delta).unwrap_or(*now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Elapsed time between two instants, zero if `later` is before `earlier`
pub fn elapsed_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> Duration {
    (later - earlier).to_std().unwrap_or(Duration::ZERO)
}

/// Hard wall-clock budget for one build
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget: Some(budget),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            started: Instant::now(),
            budget: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.budget.is_some_and(|budget| self.elapsed() > budget)
    }

    /// Fail with a timeout naming `stage` once the budget is spent
    pub fn check(&self, stage: &'static str) -> Result<()> {
        match self.budget {
            Some(budget) if self.elapsed() > budget => Err(InfravizError::Timeout {
                stage,
                elapsed_ms: self.elapsed().as_millis(),
                budget_ms: budget.as_millis(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spent_deadline_times_out() {
        let deadline = Deadline::new(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));

        let err = deadline.check("layout").unwrap_err();

        assert!(matches!(err, InfravizError::Timeout { stage: "layout", .. }));
        assert!(deadline.is_expired());
    }

    #[test]
    fn test_unbounded_deadline_never_expires() {
        assert!(Deadline::unbounded().check("layout").is_ok());
    }

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);

        clock.advance(Duration::from_secs(90));

        assert_eq!(elapsed_between(start, clock.now()), Duration::from_secs(90));
    }

    #[test]
    fn test_elapsed_never_negative() {
        let now = Utc::now();
        let earlier = now - TimeDelta::seconds(5);

        assert_eq!(elapsed_between(now, earlier), Duration::ZERO);
    }
}
