//! Per-session engine state.

use chrono::{DateTime, Utc};
use reclaim_core::{
  capability::CartSnapshotSource,
  cart::CartSnapshot,
  contact::ContactInfo,
  session::SessionKey,
};
use serde::Serialize;

use crate::detector::AbandonmentDetector;

/// One shopper's browsing session: its detector and whatever contact the
/// shopper has given us.
pub struct Session<S> {
  pub detector: AbandonmentDetector<S>,
  pub captured: Option<ContactInfo>,
}

impl<S: CartSnapshotSource> Session<S> {
  pub fn new(detector: AbandonmentDetector<S>, captured: Option<ContactInfo>) -> Self {
    Self { detector, captured }
  }

  pub fn key(&self) -> &SessionKey { self.detector.session() }

  pub fn status(&self) -> SessionStatus {
    SessionStatus {
      session:          self.key().clone(),
      triggered:        self.detector.is_triggered(),
      last_activity_at: self.detector.activity().last_activity_at(),
      page:             self.detector.page().path.clone(),
      cart:             self.detector.current_cart().cloned(),
      has_contact:      self.captured.as_ref().is_some_and(ContactInfo::is_reachable),
    }
  }
}

/// What an operator sees of one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
  pub session:          SessionKey,
  pub triggered:        bool,
  pub last_activity_at: DateTime<Utc>,
  pub page:             String,
  pub cart:             Option<CartSnapshot>,
  pub has_contact:      bool,
}
