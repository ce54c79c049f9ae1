//! Recovery sequence orchestration.
//!
//! The orchestrator owns every [`Sequence`] and the cart-token index that
//! enforces "at most one active sequence per cart". Messages are deferred
//! through a [`TimerQueue`]; cancellation is check-on-fire, so a timer whose
//! sequence has left `Active` does nothing when it comes due.

use std::{collections::HashMap, sync::Arc};

use reclaim_core::{
  analytics::{AnalyticsEvent, EventType},
  capability::{AnalyticsSink, CartSnapshotSource, Channel, NotificationSender, RenderedContent},
  cart::{AbandonmentEvent, CartSnapshot},
  clock::Clock,
  contact::ContactInfo,
  sequence::{Message, MessageKind, MessageStatus, Sequence, SequenceId, SequenceStatus},
};
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  config::RecoveryConfig,
  template::{RenderContext, render},
  timers::{TimerAction, TimerQueue},
  timing::TimingPolicy,
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
  Started(SequenceId),
  /// A sequence for this cart is already running; nothing was scheduled.
  AlreadyActive(SequenceId),
  /// Neither email nor phone was known.
  NoContact,
  /// Every message kind is disabled, so there would be nothing to send.
  NothingEnabled,
  /// This abandonment already produced a sequence that is still in the
  /// index; nothing was scheduled.
  AlreadyHandled(SequenceId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
  /// The sequence is gone (retired) or never existed.
  Unknown,
  /// The sequence had already left `Active`, or this message was handled.
  Inactive,
  /// The message is scheduled later than now.
  NotDue,
  /// The cart was emptied or replaced; the sequence is now `Recovered`.
  Recovered,
  /// At least one channel was attempted. `failed` lists channels whose send
  /// errored.
  Sent { attempted: Vec<Channel>, failed: Vec<Channel> },
  /// No enabled channel matched the contact; the message was skipped.
  NoChannel,
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct SequenceOrchestrator<S, N, A> {
  source:    Arc<S>,
  sender:    Arc<N>,
  analytics: A,
  clock:     Arc<dyn Clock>,
  config:    RecoveryConfig,
  sequences: HashMap<SequenceId, Sequence>,
  /// Cart token → the one `Active` sequence for that cart.
  active:    HashMap<String, SequenceId>,
  timers:    TimerQueue,
}

impl<S, N, A> SequenceOrchestrator<S, N, A>
where
  S: CartSnapshotSource,
  N: NotificationSender,
  A: AnalyticsSink,
{
  pub fn new(
    source: Arc<S>,
    sender: Arc<N>,
    analytics: A,
    clock: Arc<dyn Clock>,
    config: RecoveryConfig,
  ) -> Self {
    Self {
      source,
      sender,
      analytics,
      clock,
      config,
      sequences: HashMap::new(),
      active: HashMap::new(),
      timers: TimerQueue::new(),
    }
  }

  // ── Starting ─────────────────────────────────────────────────────────────

  pub fn start_sequence(
    &mut self,
    event: &AbandonmentEvent,
    contact: ContactInfo,
  ) -> StartOutcome {
    let token = &event.cart.token;

    if !contact.is_reachable() {
      info!(%token, "no contact details; not starting a recovery sequence");
      return StartOutcome::NoContact;
    }
    if let Some(existing) = self.active.get(token) {
      debug!(%token, sequence = %existing, "recovery sequence already active");
      return StartOutcome::AlreadyActive(existing.clone());
    }

    if !MessageKind::iter().any(|k| self.config.is_enabled(k)) {
      info!(%token, "every message kind is disabled; not starting a recovery sequence");
      return StartOutcome::NothingEnabled;
    }
    let id = SequenceId::derive(token, event.triggered_at);
    if self.sequences.contains_key(&id) {
      debug!(%token, sequence = %id, "abandonment already handled");
      return StartOutcome::AlreadyHandled(id);
    }

    let started_at = self.clock.now();
    let timing = TimingPolicy::for_value(event.cart.value(), self.config.high_value_threshold);

    let mut messages: Vec<Message> = MessageKind::iter()
      .filter(|k| self.config.is_enabled(*k))
      .map(|k| Message::scheduled(k, started_at + timing.delay(k)))
      .collect();
    messages.sort_by_key(|m| m.scheduled_at);

    for message in &messages {
      self.timers.schedule(
        message.scheduled_at,
        TimerAction::Fire { sequence: id.clone(), kind: message.kind },
      );
    }

    info!(
      sequence = %id,
      session = %event.session,
      %token,
      cart_value = event.cart.value(),
      messages = messages.len(),
      "recovery sequence started"
    );

    self.sequences.insert(id.clone(), Sequence {
      id: id.clone(),
      session: event.session.clone(),
      cart: event.cart.clone(),
      contact,
      started_at,
      ended_at: None,
      status: SequenceStatus::Active,
      messages,
    });
    self.active.insert(token.clone(), id.clone());
    StartOutcome::Started(id)
  }

  // ── Timers ───────────────────────────────────────────────────────────────

  pub fn next_due(&self) -> Option<chrono::DateTime<chrono::Utc>> { self.timers.next_due() }

  /// Run every timer due at the current time. Returns how many ran.
  pub async fn run_due(&mut self) -> usize {
    let now = self.clock.now();
    let mut ran = 0;
    while let Some(action) = self.timers.pop_due(now) {
      ran += 1;
      match action {
        TimerAction::Fire { sequence, kind } => {
          self.fire_message(&sequence, kind).await;
        }
        TimerAction::Retire { sequence } => self.retire(&sequence),
      }
    }
    ran
  }

  // ── Dispatch ─────────────────────────────────────────────────────────────

  pub async fn fire_message(&mut self, id: &SequenceId, kind: MessageKind) -> FireOutcome {
    let Some(sequence) = self.sequences.get(id) else {
      return FireOutcome::Unknown;
    };
    let Some(message) = sequence
      .message(kind)
      .filter(|m| m.status == MessageStatus::Scheduled)
    else {
      return FireOutcome::Inactive;
    };
    if !sequence.status.is_active() {
      debug!(sequence = %id, %kind, "sequence no longer active; skipping message");
      return FireOutcome::Inactive;
    }
    // A timer left over from an earlier sequence with the same id must not
    // send this one's message early.
    if message.scheduled_at > self.clock.now() {
      debug!(sequence = %id, %kind, "message not due yet");
      return FireOutcome::NotDue;
    }
    let token = sequence.cart_token().to_owned();
    let session = sequence.session.clone();

    // Recovery check against the live cart. An unreachable cart endpoint is
    // not evidence of recovery.
    let live = match self.source.fetch_current(&session).await {
      Ok(cart) => Some(cart),
      Err(e) => {
        let failure = reclaim_core::Error::FetchFailure(e.to_string());
        warn!(sequence = %id, error = %failure, "recovery check failed; assuming not recovered");
        None
      }
    };
    if let Some(cart) = &live
      && (cart.is_empty() || cart.token != token)
    {
      info!(sequence = %id, %kind, "cart recovered before message");
      self.finish(id, SequenceStatus::Recovered).await;
      return FireOutcome::Recovered;
    }

    let Some(sequence) = self.sequences.get(id) else {
      return FireOutcome::Unknown;
    };
    let contact = sequence.contact.clone();
    let cart = live.unwrap_or_else(|| sequence.cart.clone());
    let cart_value = sequence.cart_value();

    let email_to = contact
      .email_address()
      .filter(|_| self.config.email_enabled);
    let sms_to = contact
      .phone_number()
      .filter(|_| self.config.sms_enabled);

    let email = email_to.map(|_| self.render(Channel::Email, kind, &cart, &contact));
    let sms = sms_to.map(|_| self.render(Channel::Sms, kind, &cart, &contact));

    let (email_result, sms_result) = tokio::join!(
      deliver(&*self.sender, Channel::Email, email_to, email.as_ref()),
      deliver(&*self.sender, Channel::Sms, sms_to, sms.as_ref()),
    );

    let mut attempted = Vec::new();
    let mut failed = Vec::new();
    for (channel, result) in [(Channel::Email, email_result), (Channel::Sms, sms_result)] {
      match result {
        None => {}
        Some(Ok(())) => attempted.push(channel),
        Some(Err(e)) => {
          warn!(sequence = %id, %kind, error = %e, "recovery message not delivered");
          attempted.push(channel);
          failed.push(channel);
        }
      }
    }

    let now = self.clock.now();
    let Some(sequence) = self.sequences.get_mut(id) else {
      return FireOutcome::Unknown;
    };
    let is_last = sequence.last_kind() == Some(kind);
    if let Some(message) = sequence.message_mut(kind) {
      if attempted.is_empty() {
        message.status = MessageStatus::Skipped;
      } else {
        message.status = MessageStatus::Sent;
        message.sent_at = Some(now);
      }
    }

    let outcome = if attempted.is_empty() {
      warn!(sequence = %id, %kind, "no enabled channel for contact; message skipped");
      FireOutcome::NoChannel
    } else {
      let channels: Vec<String> = attempted.iter().map(Channel::to_string).collect();
      self
        .analytics
        .record(
          AnalyticsEvent::new(EventType::MessageSent, now)
            .with("sequence_id", id.as_str())
            .with("message_kind", kind.to_string())
            .with("cart_value", cart_value)
            .with("channels", channels),
        )
        .await;
      FireOutcome::Sent { attempted, failed }
    };

    if is_last {
      self.finish(id, SequenceStatus::Completed).await;
    }
    outcome
  }

  fn render(
    &self,
    channel: Channel,
    kind: MessageKind,
    cart: &CartSnapshot,
    contact: &ContactInfo,
  ) -> RenderedContent {
    let templates = self.config.templates.for_kind(kind);
    let discount_code = self.config.discount_code(kind);
    let mut ctx = RenderContext::new(cart, &self.config.storefront_url);
    ctx.customer_name = contact.name.as_deref();
    ctx.discount_code = discount_code;

    let (subject, body) = match channel {
      Channel::Email => (
        Some(render(&templates.email_subject, &ctx)),
        render(&templates.email_body, &ctx),
      ),
      Channel::Sms => (None, render(&templates.sms, &ctx)),
    };

    RenderedContent {
      kind,
      subject,
      body,
      discount_code: discount_code.map(str::to_owned),
      recovery_url: ctx.recovery_url.clone(),
      cart_token: cart.token.clone(),
    }
  }

  // ── Termination ──────────────────────────────────────────────────────────

  /// Operator cancellation. `Ok(false)` if the sequence had already ended.
  pub async fn cancel_sequence(&mut self, id: &SequenceId) -> Result<bool> {
    if !self.sequences.contains_key(id) {
      return Err(Error::SequenceNotFound(id.clone()));
    }
    let cancelled = self.finish(id, SequenceStatus::Cancelled).await;
    if cancelled {
      info!(sequence = %id, "recovery sequence cancelled");
    }
    Ok(cancelled)
  }

  /// Move a sequence to a terminal status, free its cart token, schedule its
  /// retirement and record the outcome.
  async fn finish(&mut self, id: &SequenceId, status: SequenceStatus) -> bool {
    let now = self.clock.now();
    let Some(sequence) = self.sequences.get_mut(id) else {
      return false;
    };
    if !sequence.finish(status, now) {
      return false;
    }

    if self.active.get(sequence.cart_token()) == Some(id) {
      self.active.remove(sequence.cart_token());
    }
    self.timers.schedule(
      now + self.config.retention(),
      TimerAction::Retire { sequence: id.clone() },
    );

    let event_type = match status {
      SequenceStatus::Recovered => EventType::CartRecovered,
      SequenceStatus::Cancelled => EventType::SequenceCancelled,
      SequenceStatus::Completed | SequenceStatus::Active => EventType::SequenceCompleted,
    };
    let event = AnalyticsEvent::new(event_type, now)
      .with("sequence_id", id.as_str())
      .with("cart_token", sequence.cart_token())
      .with("cart_value", sequence.cart_value())
      .with("messages_sent", sequence.sent_count())
      .with("completion_reason", status.to_string())
      .with("duration_seconds", (now - sequence.started_at).num_seconds());
    let event = if status == SequenceStatus::Recovered {
      event.with("recovery_method", "recovery_sequence")
    } else {
      event
    };
    self.analytics.record(event).await;
    true
  }

  fn retire(&mut self, id: &SequenceId) {
    let terminal = self
      .sequences
      .get(id)
      .is_some_and(|s| !s.status.is_active());
    if terminal {
      self.sequences.remove(id);
      debug!(sequence = %id, "retired finished sequence");
    }
  }

  // ── Queries ──────────────────────────────────────────────────────────────

  /// Every sequence still in the index (active, or finished within the
  /// retention window), oldest first.
  pub fn sequences(&self) -> Vec<Sequence> {
    let mut all: Vec<Sequence> = self.sequences.values().cloned().collect();
    all.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
    all
  }

  pub fn sequence(&self, id: &SequenceId) -> Option<&Sequence> { self.sequences.get(id) }

  pub fn active_for(&self, cart_token: &str) -> Option<&Sequence> {
    self.active.get(cart_token).and_then(|id| self.sequences.get(id))
  }

  pub fn pending_timers(&self) -> usize { self.timers.len() }
}

/// Send on one channel if there is a recipient. `None` means no attempt was
/// made.
async fn deliver<N: NotificationSender>(
  sender: &N,
  channel: Channel,
  recipient: Option<&str>,
  content: Option<&RenderedContent>,
) -> Option<reclaim_core::Result<()>> {
  let (recipient, content) = (recipient?, content?);
  let result = sender
    .send(channel, recipient, content)
    .await
    .map_err(|e| reclaim_core::Error::SendFailure { channel, reason: e.to_string() });
  if result.is_ok() {
    debug!(%channel, kind = %content.kind, "recovery message sent");
  }
  Some(result)
}
