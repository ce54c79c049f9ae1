//! Capabilities the engine consumes but does not implement.
//!
//! Concrete implementations live in the host (HTTP adapters in
//! `reclaim-server`, SQLite in `reclaim-store-sqlite`) or in tests. The engine
//! depends on these traits only.
//!
//! All methods return `Send` futures so implementations can be driven from a
//! spawned tokio task.

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::{
  analytics::AnalyticsEvent,
  cart::CartSnapshot,
  sequence::MessageKind,
  session::SessionKey,
};

// ─── Cart ────────────────────────────────────────────────────────────────────

/// The storefront's cart-state endpoint.
pub trait CartSnapshotSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the cart of one browsing session as it is right now.
  fn fetch_current<'a>(
    &'a self,
    session: &'a SessionKey,
  ) -> impl Future<Output = Result<CartSnapshot, Self::Error>> + Send + 'a;
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
  Email,
  Sms,
}

/// A message ready to hand to a delivery provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedContent {
  pub kind:          MessageKind,
  /// Present for email; SMS has no subject.
  pub subject:       Option<String>,
  pub body:          String,
  pub discount_code: Option<String>,
  pub recovery_url:  String,
  pub cart_token:    String,
}

/// Delivery provider for recovery messages.
pub trait NotificationSender: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send<'a>(
    &'a self,
    channel: Channel,
    recipient: &'a str,
    content: &'a RenderedContent,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Analytics ───────────────────────────────────────────────────────────────

/// Fire-and-forget event recording. Implementations log their own failures;
/// nothing is returned to the caller.
pub trait AnalyticsSink: Send + Sync {
  fn record(&self, event: AnalyticsEvent) -> impl Future<Output = ()> + Send + '_;
}

// ─── Durable storage ─────────────────────────────────────────────────────────

/// Small string key-value storage for state that outlives the engine (the
/// captured contact, the analytics log).
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
