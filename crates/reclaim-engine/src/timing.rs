//! Value-tiered message timing.

use chrono::TimeDelta;
use reclaim_core::sequence::MessageKind;

/// Delays from sequence start for each campaign step. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingPolicy {
  pub immediate: TimeDelta,
  pub reminder:  TimeDelta,
  pub r#final:   TimeDelta,
}

impl TimingPolicy {
  /// High-value carts (strictly above `threshold`) are chased sooner.
  /// Both arguments are in major currency units.
  pub fn for_value(cart_value: f64, threshold: f64) -> Self {
    if cart_value > threshold {
      Self {
        immediate: TimeDelta::minutes(30),
        reminder:  TimeDelta::hours(2),
        r#final:   TimeDelta::hours(24),
      }
    } else {
      Self {
        immediate: TimeDelta::hours(1),
        reminder:  TimeDelta::hours(24),
        r#final:   TimeDelta::hours(72),
      }
    }
  }

  pub fn delay(&self, kind: MessageKind) -> TimeDelta {
    match kind {
      MessageKind::Immediate => self.immediate,
      MessageKind::Reminder => self.reminder,
      MessageKind::Final => self.r#final,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn high_value_tier() {
    let t = TimingPolicy::for_value(150.0, 100.0);
    assert_eq!(t.immediate, TimeDelta::minutes(30));
    assert_eq!(t.reminder, TimeDelta::hours(2));
    assert_eq!(t.r#final, TimeDelta::hours(24));
  }

  #[test]
  fn standard_tier() {
    let t = TimingPolicy::for_value(40.0, 100.0);
    assert_eq!(t.immediate, TimeDelta::hours(1));
    assert_eq!(t.reminder, TimeDelta::hours(24));
    assert_eq!(t.r#final, TimeDelta::hours(72));
  }

  #[test]
  fn threshold_itself_is_standard() {
    assert_eq!(
      TimingPolicy::for_value(100.0, 100.0),
      TimingPolicy::for_value(1.0, 100.0)
    );
  }
}
