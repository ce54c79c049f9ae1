//! Shopper activity tracking.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use reclaim_core::clock::Clock;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Page-level interactions that prove the shopper is still there. They are
/// all equivalent; the variant only shows up in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivitySignal {
  Click,
  Scroll,
  KeyInput,
  PointerMove,
  TabVisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityState {
  pub last_activity_at: DateTime<Utc>,
}

pub struct ActivityMonitor {
  state: ActivityState,
  clock: Arc<dyn Clock>,
}

impl ActivityMonitor {
  /// Starts as if the shopper had just been active.
  pub fn new(clock: Arc<dyn Clock>) -> Self {
    let now = clock.now();
    Self::active_since(clock, now)
  }

  /// Starts with the shopper last seen at `at`.
  pub fn active_since(clock: Arc<dyn Clock>, at: DateTime<Utc>) -> Self {
    Self { state: ActivityState { last_activity_at: at }, clock }
  }

  pub fn record_activity(&mut self) {
    let now = self.clock.now();
    self.record_activity_at(now);
  }

  /// Record activity observed at `at`. Signals are stamped where they
  /// arrive, so `at` may already be in the past when it is applied.
  pub fn record_activity_at(&mut self, at: DateTime<Utc>) {
    // Never moves backwards, even if the clock does.
    if at > self.state.last_activity_at {
      self.state.last_activity_at = at;
    }
  }

  pub fn last_activity_at(&self) -> DateTime<Utc> { self.state.last_activity_at }

  pub fn state(&self) -> ActivityState { self.state }

  pub fn idle_duration(&self) -> TimeDelta {
    (self.clock.now() - self.state.last_activity_at).max(TimeDelta::zero())
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use reclaim_core::clock::ManualClock;

  use super::*;

  fn monitor() -> (ManualClock, ActivityMonitor) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
    let monitor = ActivityMonitor::new(Arc::new(clock.clone()));
    (clock, monitor)
  }

  #[test]
  fn idle_grows_until_activity() {
    let (clock, mut monitor) = monitor();
    clock.advance(TimeDelta::minutes(7));
    assert_eq!(monitor.idle_duration(), TimeDelta::minutes(7));

    monitor.record_activity();
    assert_eq!(monitor.idle_duration(), TimeDelta::zero());
  }

  #[test]
  fn last_activity_never_decreases() {
    let (clock, mut monitor) = monitor();
    clock.advance(TimeDelta::minutes(5));
    monitor.record_activity();
    let mark = monitor.last_activity_at();

    clock.advance(TimeDelta::minutes(-3));
    monitor.record_activity();
    assert_eq!(monitor.last_activity_at(), mark);
    assert_eq!(monitor.idle_duration(), TimeDelta::zero());
  }

  #[test]
  fn late_applied_activity_keeps_its_stamp() {
    let (clock, mut monitor) = monitor();
    let seen_at = clock.now() + TimeDelta::minutes(10);
    clock.advance(TimeDelta::minutes(29));

    monitor.record_activity_at(seen_at);
    assert_eq!(monitor.last_activity_at(), seen_at);
    assert_eq!(monitor.idle_duration(), TimeDelta::minutes(19));

    monitor.record_activity_at(seen_at - TimeDelta::minutes(1));
    assert_eq!(monitor.last_activity_at(), seen_at);
  }
}
