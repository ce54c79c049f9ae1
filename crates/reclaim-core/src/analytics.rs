//! Analytics event records and the aggregate recovery statistics computed
//! from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
  CartAbandoned,
  MessageSent,
  CartRecovered,
  SequenceCompleted,
  SequenceCancelled,
  ContactCaptured,
}

/// One fire-and-forget analytics record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
  pub event_id:   Uuid,
  #[serde(rename = "type")]
  pub event_type: EventType,
  pub timestamp:  DateTime<Utc>,
  #[serde(default)]
  pub payload:    Map<String, Value>,
}

impl AnalyticsEvent {
  pub fn new(event_type: EventType, timestamp: DateTime<Utc>) -> Self {
    Self {
      event_id: Uuid::new_v4(),
      event_type,
      timestamp,
      payload: Map::new(),
    }
  }

  /// Builder-style payload field.
  pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.payload.insert(key.to_owned(), value.into());
    self
  }

  /// The `cart_value` payload field, if present and numeric.
  pub fn cart_value(&self) -> Option<f64> {
    self.payload.get("cart_value").and_then(Value::as_f64)
  }
}

/// Counts over a trailing window of days.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryStats {
  pub window_days:       u32,
  pub abandoned:         usize,
  pub recovered:         usize,
  pub messages_sent:     usize,
  pub contacts_captured: usize,
  pub completed:         usize,
  pub cancelled:         usize,
  /// Sum of `cart_value` over recovered carts, in major units.
  pub recovered_value:   f64,
  /// `recovered / abandoned` as a percentage, two decimals; zero when nothing
  /// was abandoned.
  pub recovery_rate:     f64,
}

impl RecoveryStats {
  pub fn from_events<'a>(
    window_days: u32,
    events: impl IntoIterator<Item = &'a AnalyticsEvent>,
  ) -> Self {
    let mut stats = Self { window_days, ..Self::default() };
    for event in events {
      match event.event_type {
        EventType::CartAbandoned => stats.abandoned += 1,
        EventType::MessageSent => stats.messages_sent += 1,
        EventType::ContactCaptured => stats.contacts_captured += 1,
        EventType::SequenceCompleted => stats.completed += 1,
        EventType::SequenceCancelled => stats.cancelled += 1,
        EventType::CartRecovered => {
          stats.recovered += 1;
          stats.recovered_value += event.cart_value().unwrap_or(0.0);
        }
      }
    }
    if stats.abandoned > 0 {
      let rate = stats.recovered as f64 / stats.abandoned as f64 * 100.0;
      stats.recovery_rate = (rate * 100.0).round() / 100.0;
    }
    stats
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stats_count_by_type_and_rate() {
    let now = Utc::now();
    let events = vec![
      AnalyticsEvent::new(EventType::CartAbandoned, now),
      AnalyticsEvent::new(EventType::CartAbandoned, now),
      AnalyticsEvent::new(EventType::CartAbandoned, now),
      AnalyticsEvent::new(EventType::MessageSent, now),
      AnalyticsEvent::new(EventType::CartRecovered, now).with("cart_value", 42.5),
    ];
    let stats = RecoveryStats::from_events(7, &events);
    assert_eq!(stats.window_days, 7);
    assert_eq!(stats.abandoned, 3);
    assert_eq!(stats.recovered, 1);
    assert_eq!(stats.messages_sent, 1);
    assert_eq!(stats.recovered_value, 42.5);
    assert_eq!(stats.recovery_rate, 33.33);
  }

  #[test]
  fn rate_is_zero_without_abandonment() {
    let none: Vec<AnalyticsEvent> = Vec::new();
    let stats = RecoveryStats::from_events(30, &none);
    assert_eq!(stats.recovery_rate, 0.0);
  }

  #[test]
  fn event_serialises_type_tag() {
    let event = AnalyticsEvent::new(EventType::MessageSent, Utc::now())
      .with("message_kind", "reminder");
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "message_sent");
    assert_eq!(json["payload"]["message_kind"], "reminder");
  }
}
