//! Engine configuration.
//!
//! Every field has a default, so hosts can deserialise a partial table (e.g.
//! the `[recovery]` section of `config.toml`) and get a working engine.

use std::time::Duration;

use chrono::TimeDelta;
use reclaim_core::sequence::MessageKind;
use serde::{Deserialize, Serialize};

// ─── Templates ───────────────────────────────────────────────────────────────

/// Content for one step of a campaign. Placeholders use `{{name}}` syntax;
/// see [`crate::template`] for the supported names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTemplates {
  pub email_subject: String,
  pub email_body:    String,
  pub sms:           String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSet {
  pub immediate: KindTemplates,
  pub reminder:  KindTemplates,
  pub r#final:   KindTemplates,
}

impl TemplateSet {
  pub fn for_kind(&self, kind: MessageKind) -> &KindTemplates {
    match kind {
      MessageKind::Immediate => &self.immediate,
      MessageKind::Reminder => &self.reminder,
      MessageKind::Final => &self.r#final,
    }
  }
}

impl Default for TemplateSet {
  fn default() -> Self {
    Self {
      immediate: KindTemplates {
        email_subject: "You left something in your cart!".into(),
        email_body:    "Hi {{customer_name}}, you left {{item_count}} items in your cart. \
                        Complete your purchase now: {{recovery_url}}"
          .into(),
        sms:           "Hey! You left {{item_count}} items in your cart. \
                        Complete your order: {{recovery_url}}"
          .into(),
      },
      reminder:  KindTemplates {
        email_subject: "Still thinking about your cart?".into(),
        email_body:    "Hi {{customer_name}}, here's 10% off your {{total_price}} cart \
                        to help you decide. Use code {{discount_code}}: {{recovery_url}}"
          .into(),
        sms:           "Still interested? Get 10% off your cart with code \
                        {{discount_code}}: {{recovery_url}}"
          .into(),
      },
      r#final:   KindTemplates {
        email_subject: "Last chance - your cart expires soon!".into(),
        email_body:    "Hi {{customer_name}}, your items are almost gone! Complete your \
                        purchase with 15% off using {{discount_code}}: {{recovery_url}}"
          .into(),
        sms:           "Last chance! Your cart expires in 24 hours. Save 15% with \
                        {{discount_code}}: {{recovery_url}}"
          .into(),
      },
    }
  }
}

// ─── RecoveryConfig ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
  /// Idle time after which a populated cart counts as abandoned.
  pub abandonment_threshold_minutes: u32,
  /// Detection cadence.
  pub poll_interval_seconds:         u64,
  /// Carts worth more than this (major units) get the faster timing tier.
  pub high_value_threshold:          f64,

  pub send_immediate: bool,
  #[serde(alias = "send_followup1")]
  pub send_reminder:  bool,
  #[serde(alias = "send_followup2")]
  pub send_final:     bool,

  pub email_enabled: bool,
  pub sms_enabled:   bool,

  /// Path fragments that mark checkout-like pages where abandonment never
  /// triggers.
  pub checkout_paths: Vec<String>,
  /// Base URL used to build `{{recovery_url}}`.
  pub storefront_url: String,

  /// How long a finished sequence stays queryable before it is retired.
  pub retention_hours:   u32,
  /// Sessions idle for longer than this are dropped from memory. Their
  /// captured contact stays in the store.
  pub session_ttl_hours: u32,
  /// Upper bound on stored analytics events; oldest are dropped first.
  pub max_logged_events: usize,

  pub reminder_discount_code: Option<String>,
  pub final_discount_code:    Option<String>,

  pub templates: TemplateSet,
}

impl Default for RecoveryConfig {
  fn default() -> Self {
    Self {
      abandonment_threshold_minutes: 30,
      poll_interval_seconds:         60,
      high_value_threshold:          100.0,
      send_immediate:                true,
      send_reminder:                 true,
      send_final:                    true,
      email_enabled:                 true,
      sms_enabled:                   false,
      checkout_paths:                vec!["/checkout".into(), "/cart".into()],
      storefront_url:                "http://localhost".into(),
      retention_hours:               24,
      session_ttl_hours:             24,
      max_logged_events:             1000,
      reminder_discount_code:        Some("SAVE10".into()),
      final_discount_code:           Some("SAVE15".into()),
      templates:                     TemplateSet::default(),
    }
  }
}

impl RecoveryConfig {
  pub fn abandonment_threshold(&self) -> TimeDelta {
    TimeDelta::minutes(i64::from(self.abandonment_threshold_minutes))
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_seconds.max(1))
  }

  pub fn retention(&self) -> TimeDelta {
    TimeDelta::hours(i64::from(self.retention_hours))
  }

  pub fn session_ttl(&self) -> TimeDelta {
    TimeDelta::hours(i64::from(self.session_ttl_hours.max(1)))
  }

  pub fn is_enabled(&self, kind: MessageKind) -> bool {
    match kind {
      MessageKind::Immediate => self.send_immediate,
      MessageKind::Reminder => self.send_reminder,
      MessageKind::Final => self.send_final,
    }
  }

  /// Immediate carries no incentive; the later steps escalate.
  pub fn discount_code(&self, kind: MessageKind) -> Option<&str> {
    match kind {
      MessageKind::Immediate => None,
      MessageKind::Reminder => self.reminder_discount_code.as_deref(),
      MessageKind::Final => self.final_discount_code.as_deref(),
    }
  }
}
