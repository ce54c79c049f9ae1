//! Typed event subscription.
//!
//! Each event variant has its own broadcast channel; subscribers pick the
//! variant they care about. Publishing with no subscribers is not an error.

use reclaim_core::{
  cart::{AbandonmentEvent, CartSnapshot},
  session::SessionKey,
};
use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// A session's cart contents changed between two polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartChange {
  pub session: SessionKey,
  pub cart:    CartSnapshot,
}

/// The events the detector publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
  CartChanged(CartChange),
  AbandonmentTriggered(AbandonmentEvent),
}

/// Cheap to clone; clones publish to the same subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
  cart_changed: broadcast::Sender<CartChange>,
  abandonment:  broadcast::Sender<AbandonmentEvent>,
}

impl Default for EventBus {
  fn default() -> Self { Self::new() }
}

impl EventBus {
  pub fn new() -> Self {
    let (cart_changed, _) = broadcast::channel(CHANNEL_CAPACITY);
    let (abandonment, _) = broadcast::channel(CHANNEL_CAPACITY);
    Self { cart_changed, abandonment }
  }

  pub fn subscribe_cart_changed(&self) -> broadcast::Receiver<CartChange> {
    self.cart_changed.subscribe()
  }

  pub fn subscribe_abandonment(&self) -> broadcast::Receiver<AbandonmentEvent> {
    self.abandonment.subscribe()
  }

  pub fn publish(&self, event: EngineEvent) {
    // `send` only fails when nobody is listening.
    match event {
      EngineEvent::CartChanged(change) => {
        let _ = self.cart_changed.send(change);
      }
      EngineEvent::AbandonmentTriggered(event) => {
        let _ = self.abandonment.send(event);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn cart() -> CartSnapshot {
    CartSnapshot {
      token:             "t".into(),
      item_count:        1,
      total_price_minor: 100,
      items:             Vec::new(),
    }
  }

  fn change() -> CartChange { CartChange { session: SessionKey::from("s1"), cart: cart() } }

  #[tokio::test]
  async fn subscribers_only_see_their_variant() {
    let bus = EventBus::new();
    let mut changes = bus.subscribe_cart_changed();
    let mut abandons = bus.subscribe_abandonment();

    bus.publish(EngineEvent::CartChanged(change()));
    bus.publish(EngineEvent::AbandonmentTriggered(AbandonmentEvent {
      session:      SessionKey::from("s1"),
      cart:         cart(),
      triggered_at: Utc::now(),
    }));

    assert_eq!(changes.recv().await.unwrap(), change());
    assert!(changes.try_recv().is_err());
    assert_eq!(abandons.recv().await.unwrap().cart, cart());
  }

  #[test]
  fn publishing_without_subscribers_is_fine() {
    EventBus::new().publish(EngineEvent::CartChanged(change()));
  }
}
