//! Abandonment detection for one browsing session.
//!
//! The detector is polled on a fixed cadence. Each poll refreshes the cart and
//! evaluates
//!
//! ```text
//! idle >= threshold && cart.item_count > 0 && !on_checkout_page
//! ```
//!
//! An idle episode is identified by the `last_activity_at` it started from.
//! Once the detector has fired for an episode it stays quiet until new
//! activity starts a fresh one.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use reclaim_core::{
  capability::CartSnapshotSource,
  cart::{AbandonmentEvent, CartSnapshot},
  clock::Clock,
  session::SessionKey,
};
use tracing::{info, warn};

use crate::{
  activity::ActivityMonitor,
  cart_state::CartStateService,
  events::{CartChange, EngineEvent, EventBus},
};

// ─── Page context ────────────────────────────────────────────────────────────

/// Where the shopper currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
  pub path: String,
}

/// Pages on which abandonment never triggers: the shopper is already on the
/// way to paying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPathPredicate {
  fragments: Vec<String>,
}

impl CheckoutPathPredicate {
  pub fn new(fragments: impl IntoIterator<Item = impl Into<String>>) -> Self {
    Self { fragments: fragments.into_iter().map(Into::into).collect() }
  }

  pub fn matches(&self, path: &str) -> bool {
    self
      .fragments
      .iter()
      .any(|f| !f.is_empty() && path.contains(f.as_str()))
  }
}

// ─── Detector ────────────────────────────────────────────────────────────────

pub struct AbandonmentDetector<S> {
  cart:      CartStateService<S>,
  activity:  ActivityMonitor,
  threshold: TimeDelta,
  checkout:  CheckoutPathPredicate,
  page:      PageContext,
  /// `last_activity_at` of the episode we already fired for.
  fired_for: Option<DateTime<Utc>>,
  bus:       EventBus,
  clock:     Arc<dyn Clock>,
}

impl<S: CartSnapshotSource> AbandonmentDetector<S> {
  pub fn new(
    session: SessionKey,
    source: Arc<S>,
    threshold: TimeDelta,
    checkout: CheckoutPathPredicate,
    bus: EventBus,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self {
      cart: CartStateService::new(source, session),
      activity: ActivityMonitor::new(clock.clone()),
      threshold,
      checkout,
      page: PageContext::default(),
      fired_for: None,
      bus,
      clock,
    }
  }

  /// Treat the session as first seen at `at` rather than at construction.
  pub fn seen_since(mut self, at: DateTime<Utc>) -> Self {
    self.activity = ActivityMonitor::active_since(self.clock.clone(), at);
    self
  }

  pub fn session(&self) -> &SessionKey { self.cart.session() }

  /// Any activity signal lands here. Advancing `last_activity_at` re-arms the
  /// detector.
  pub fn record_activity(&mut self) { self.activity.record_activity(); }

  /// Like [`record_activity`](Self::record_activity), for a signal stamped
  /// when it arrived.
  pub fn record_activity_at(&mut self, at: DateTime<Utc>) { self.activity.record_activity_at(at); }

  pub fn navigate(&mut self, path: impl Into<String>) {
    self.page = PageContext { path: path.into() };
  }

  pub fn page(&self) -> &PageContext { &self.page }

  pub fn activity(&self) -> &ActivityMonitor { &self.activity }

  pub fn current_cart(&self) -> Option<&CartSnapshot> { self.cart.current_snapshot() }

  pub fn on_checkout_page(&self) -> bool { self.checkout.matches(&self.page.path) }

  /// `true` while the current idle episode has already produced an event.
  pub fn is_triggered(&self) -> bool {
    self.fired_for == Some(self.activity.last_activity_at())
  }

  /// One detection tick: refresh the cart, publish a change if there was one,
  /// then decide. Returns the event when this tick triggered.
  pub async fn poll(&mut self) -> Option<AbandonmentEvent> {
    match self.cart.refresh().await {
      Ok(true) => {
        if let Some(cart) = self.cart.current_snapshot() {
          self.bus.publish(EngineEvent::CartChanged(CartChange {
            session: self.cart.session().clone(),
            cart:    cart.clone(),
          }));
        }
      }
      Ok(false) => {}
      Err(e) => {
        warn!(session = %self.cart.session(), error = %e, "keeping previous cart snapshot");
        return None;
      }
    }

    if self.is_triggered() || !self.should_trigger() {
      return None;
    }

    let cart = self.cart.current_snapshot()?.clone();
    let event = AbandonmentEvent {
      session: self.cart.session().clone(),
      cart,
      triggered_at: self.clock.now(),
    };
    self.fired_for = Some(self.activity.last_activity_at());

    info!(
      session = %event.session,
      token = %event.cart.token,
      items = event.cart.item_count,
      idle_minutes = self.activity.idle_duration().num_minutes(),
      "cart abandoned"
    );
    self
      .bus
      .publish(EngineEvent::AbandonmentTriggered(event.clone()));
    Some(event)
  }

  fn should_trigger(&self) -> bool {
    self.activity.idle_duration() >= self.threshold
      && self.cart.current_snapshot().is_some_and(|c| c.item_count > 0)
      && !self.on_checkout_page()
  }
}
