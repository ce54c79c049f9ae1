//! Recovery sequences and their messages.
//!
//! A sequence is the ordered set of messages scheduled for one abandoned
//! cart. It starts `Active` and moves to exactly one terminal status; once it
//! leaves `Active` every still-scheduled message is skipped and never sent.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{cart::CartSnapshot, contact::ContactInfo, session::SessionKey};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Derived from the cart token and the abandonment time, so the same cart can
/// have several sequences over its life, one at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(String);

impl SequenceId {
  pub fn derive(cart_token: &str, triggered_at: DateTime<Utc>) -> Self {
    Self(format!("cart_{cart_token}_{}", triggered_at.timestamp_millis()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SequenceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<String> for SequenceId {
  fn from(s: String) -> Self { Self(s) }
}

// ─── Status enums ────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SequenceStatus {
  Active,
  Recovered,
  Cancelled,
  Completed,
}

impl SequenceStatus {
  pub fn is_active(&self) -> bool { matches!(self, Self::Active) }
}

/// The three steps of a campaign, in timing order.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageKind {
  Immediate,
  Reminder,
  Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageStatus {
  Scheduled,
  Sent,
  Skipped,
}

// ─── Message ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
  pub kind:         MessageKind,
  pub scheduled_at: DateTime<Utc>,
  pub sent_at:      Option<DateTime<Utc>>,
  pub status:       MessageStatus,
}

impl Message {
  pub fn scheduled(kind: MessageKind, at: DateTime<Utc>) -> Self {
    Self { kind, scheduled_at: at, sent_at: None, status: MessageStatus::Scheduled }
  }
}

// ─── Sequence ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
  pub id:         SequenceId,
  /// The browsing session the cart belongs to; recovery checks read the
  /// cart through it.
  pub session:    SessionKey,
  /// The cart as it was when abandonment was detected.
  pub cart:       CartSnapshot,
  pub contact:    ContactInfo,
  pub started_at: DateTime<Utc>,
  /// Set when the sequence reaches a terminal status.
  pub ended_at:   Option<DateTime<Utc>>,
  pub status:     SequenceStatus,
  /// Ordered by ascending `scheduled_at`.
  pub messages:   Vec<Message>,
}

impl Sequence {
  pub fn cart_token(&self) -> &str { &self.cart.token }

  /// Cart value in major units at the moment of abandonment.
  pub fn cart_value(&self) -> f64 { self.cart.value() }

  pub fn message(&self, kind: MessageKind) -> Option<&Message> {
    self.messages.iter().find(|m| m.kind == kind)
  }

  pub fn message_mut(&mut self, kind: MessageKind) -> Option<&mut Message> {
    self.messages.iter_mut().find(|m| m.kind == kind)
  }

  pub fn sent_count(&self) -> usize {
    self
      .messages
      .iter()
      .filter(|m| m.status == MessageStatus::Sent)
      .count()
  }

  /// The last message in timing order, if any were scheduled.
  pub fn last_kind(&self) -> Option<MessageKind> {
    self.messages.last().map(|m| m.kind)
  }

  /// Move an active sequence to `status`, skipping whatever is still
  /// scheduled. Returns `false` (and changes nothing) if the sequence had
  /// already left `Active`.
  pub fn finish(&mut self, status: SequenceStatus, at: DateTime<Utc>) -> bool {
    if !self.status.is_active() || status.is_active() {
      return false;
    }
    self.status = status;
    self.ended_at = Some(at);
    for message in &mut self.messages {
      if message.status == MessageStatus::Scheduled {
        message.status = MessageStatus::Skipped;
      }
    }
    true
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone};

  use super::*;

  fn sequence() -> Sequence {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    Sequence {
      id:         SequenceId::derive("abc", start),
      session:    SessionKey::from("abc"),
      cart:       CartSnapshot {
        token:             "abc".into(),
        item_count:        1,
        total_price_minor: 5000,
        items:             Vec::new(),
      },
      contact:    ContactInfo::email("a@example.com"),
      started_at: start,
      ended_at:   None,
      status:     SequenceStatus::Active,
      messages:   vec![
        Message::scheduled(MessageKind::Immediate, start + TimeDelta::hours(1)),
        Message::scheduled(MessageKind::Reminder, start + TimeDelta::hours(24)),
      ],
    }
  }

  #[test]
  fn id_embeds_token_and_millis() {
    let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
    assert_eq!(SequenceId::derive("tok", at).as_str(), "cart_tok_1700000000123");
  }

  #[test]
  fn finish_skips_scheduled_messages_once() {
    let mut seq = sequence();
    seq.messages[0].status = MessageStatus::Sent;
    let now = seq.started_at + TimeDelta::hours(2);

    assert!(seq.finish(SequenceStatus::Recovered, now));
    assert_eq!(seq.status, SequenceStatus::Recovered);
    assert_eq!(seq.messages[0].status, MessageStatus::Sent);
    assert_eq!(seq.messages[1].status, MessageStatus::Skipped);
    assert_eq!(seq.ended_at, Some(now));

    assert!(!seq.finish(SequenceStatus::Cancelled, now));
    assert_eq!(seq.status, SequenceStatus::Recovered);
  }

  #[test]
  fn message_kind_string_forms() {
    assert_eq!(MessageKind::Reminder.to_string(), "reminder");
    assert_eq!("final".parse::<MessageKind>().unwrap(), MessageKind::Final);
  }
}
