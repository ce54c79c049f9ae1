//! In-memory fakes of the engine's capabilities, shared by the unit tests.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use chrono::{DateTime, TimeZone, Utc};
use reclaim_core::{
  analytics::{AnalyticsEvent, EventType},
  capability::{AnalyticsSink, CartSnapshotSource, Channel, NotificationSender, RenderedContent},
  cart::{CartItem, CartSnapshot},
  clock::ManualClock,
  session::SessionKey,
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("fake failure: {0}")]
pub struct FakeError(pub &'static str);

pub fn cart(token: &str, item_count: u32, total_price_minor: u64) -> CartSnapshot {
  CartSnapshot {
    token: token.into(),
    item_count,
    total_price_minor,
    items: (0..item_count)
      .map(|i| CartItem { title: format!("Item {i}"), image: None })
      .collect(),
  }
}

pub fn start_time() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

pub fn clock() -> ManualClock { ManualClock::new(start_time()) }

// ─── Cart source ─────────────────────────────────────────────────────────────

/// Serves one cart to every session, unless a session has its own.
pub struct FakeCart {
  cart:        Mutex<CartSnapshot>,
  per_session: Mutex<HashMap<SessionKey, CartSnapshot>>,
  failing:     AtomicBool,
  fetches:     AtomicUsize,
}

impl FakeCart {
  pub fn new(cart: CartSnapshot) -> Self {
    Self {
      cart:        Mutex::new(cart),
      per_session: Mutex::new(HashMap::new()),
      failing:     AtomicBool::new(false),
      fetches:     AtomicUsize::new(0),
    }
  }

  pub fn set(&self, cart: CartSnapshot) { *self.cart.lock().unwrap() = cart; }

  pub fn set_for(&self, session: &str, cart: CartSnapshot) {
    self
      .per_session
      .lock()
      .unwrap()
      .insert(SessionKey::from(session), cart);
  }

  pub fn fail(&self, failing: bool) { self.failing.store(failing, Ordering::SeqCst); }

  pub fn fetches(&self) -> usize { self.fetches.load(Ordering::SeqCst) }
}

impl CartSnapshotSource for FakeCart {
  type Error = FakeError;

  async fn fetch_current(&self, session: &SessionKey) -> Result<CartSnapshot, FakeError> {
    self.fetches.fetch_add(1, Ordering::SeqCst);
    if self.failing.load(Ordering::SeqCst) {
      return Err(FakeError("cart endpoint down"));
    }
    if let Some(cart) = self.per_session.lock().unwrap().get(session) {
      return Ok(cart.clone());
    }
    Ok(self.cart.lock().unwrap().clone())
  }
}

// ─── Notification sender ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
  pub channel:   Channel,
  pub recipient: String,
  pub content:   RenderedContent,
}

#[derive(Default)]
pub struct FakeSender {
  delivered:  Mutex<Vec<Delivery>>,
  fail_email: AtomicBool,
  fail_sms:   AtomicBool,
  attempts:   AtomicUsize,
}

impl FakeSender {
  pub fn fail(&self, channel: Channel, failing: bool) {
    match channel {
      Channel::Email => self.fail_email.store(failing, Ordering::SeqCst),
      Channel::Sms => self.fail_sms.store(failing, Ordering::SeqCst),
    }
  }

  pub fn delivered(&self) -> Vec<Delivery> { self.delivered.lock().unwrap().clone() }

  pub fn attempts(&self) -> usize { self.attempts.load(Ordering::SeqCst) }
}

impl NotificationSender for FakeSender {
  type Error = FakeError;

  async fn send(
    &self,
    channel: Channel,
    recipient: &str,
    content: &RenderedContent,
  ) -> Result<(), FakeError> {
    self.attempts.fetch_add(1, Ordering::SeqCst);
    let failing = match channel {
      Channel::Email => self.fail_email.load(Ordering::SeqCst),
      Channel::Sms => self.fail_sms.load(Ordering::SeqCst),
    };
    if failing {
      return Err(FakeError("provider rejected message"));
    }
    self.delivered.lock().unwrap().push(Delivery {
      channel,
      recipient: recipient.to_owned(),
      content: content.clone(),
    });
    Ok(())
  }
}

// ─── Analytics ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink {
  events: Arc<Mutex<Vec<AnalyticsEvent>>>,
}

impl RecordingSink {
  pub fn events(&self) -> Vec<AnalyticsEvent> { self.events.lock().unwrap().clone() }

  pub fn count(&self, event_type: EventType) -> usize {
    self
      .events
      .lock()
      .unwrap()
      .iter()
      .filter(|e| e.event_type == event_type)
      .count()
  }
}

impl AnalyticsSink for RecordingSink {
  async fn record(&self, event: AnalyticsEvent) {
    self.events.lock().unwrap().push(event);
  }
}
