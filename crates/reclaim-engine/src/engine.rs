//! The engine task.
//!
//! One spawned task owns every session's detector, the orchestrator and the
//! contact chain. It wakes for three reasons only: the detection cadence, the
//! next due timer, and a command from an [`EngineHandle`]. Nothing else
//! touches engine state, so no locks are needed.

use std::{collections::HashMap, future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use reclaim_core::{
  analytics::{AnalyticsEvent, EventType, RecoveryStats},
  capability::{AnalyticsSink, CartSnapshotSource, KeyValueStore, NotificationSender},
  cart::AbandonmentEvent,
  clock::{Clock, SystemClock},
  contact::{ContactInfo, ContactProvider},
  sequence::{Sequence, SequenceId},
  session::SessionKey,
};
use serde::Serialize;
use tokio::{
  sync::{mpsc, oneshot},
  task::JoinHandle,
  time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  activity::ActivitySignal,
  config::RecoveryConfig,
  contact::{self, ContactChain},
  detector::{AbandonmentDetector, CheckoutPathPredicate},
  event_log::EventLog,
  events::EventBus,
  orchestrator::{SequenceOrchestrator, StartOutcome},
  session::{Session, SessionStatus},
};

const COMMAND_BUFFER: usize = 64;

// ─── Status ──────────────────────────────────────────────────────────────────

/// A point-in-time view of the engine for operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
  pub paused:           bool,
  pub active_sequences: usize,
  /// Live sessions, ordered by key.
  pub sessions:         Vec<SessionStatus>,
}

// ─── Commands ────────────────────────────────────────────────────────────────

/// Shopper signals carry the time the handle saw them, not the time the task
/// gets round to them.
enum Command {
  Activity(SessionKey, ActivitySignal, DateTime<Utc>),
  Navigate(SessionKey, String, DateTime<Utc>),
  CaptureContact(SessionKey, ContactInfo, DateTime<Utc>, oneshot::Sender<Result<ContactInfo>>),
  Sequences(oneshot::Sender<Vec<Sequence>>),
  Sequence(SequenceId, oneshot::Sender<Option<Sequence>>),
  Cancel(SequenceId, oneshot::Sender<Result<bool>>),
  Stats(u32, oneshot::Sender<Result<RecoveryStats>>),
  SetPaused(bool, oneshot::Sender<()>),
  Status(oneshot::Sender<EngineStatus>),
  Tick(oneshot::Sender<()>),
  Stop,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct Engine<S, N, K> {
  source:       Arc<S>,
  sessions:     HashMap<SessionKey, Session<S>>,
  checkout:     CheckoutPathPredicate,
  orchestrator: SequenceOrchestrator<S, N, EventLog<K>>,
  contacts:     ContactChain,
  log:          EventLog<K>,
  store:        Arc<K>,
  bus:          EventBus,
  clock:        Arc<dyn Clock>,
  config:       RecoveryConfig,
  paused:       bool,
}

impl<S, N, K> Engine<S, N, K>
where
  S: CartSnapshotSource + 'static,
  N: NotificationSender + 'static,
  K: KeyValueStore + 'static,
{
  pub fn new(config: RecoveryConfig, source: Arc<S>, sender: Arc<N>, store: Arc<K>) -> Self {
    Self::with_clock(config, source, sender, store, Arc::new(SystemClock))
  }

  pub fn with_clock(
    config: RecoveryConfig,
    source: Arc<S>,
    sender: Arc<N>,
    store: Arc<K>,
    clock: Arc<dyn Clock>,
  ) -> Self {
    let log = EventLog::new(store.clone(), config.max_logged_events);
    let orchestrator = SequenceOrchestrator::new(
      source.clone(),
      sender,
      log.clone(),
      clock.clone(),
      config.clone(),
    );

    Self {
      source,
      sessions: HashMap::new(),
      checkout: CheckoutPathPredicate::new(config.checkout_paths.iter().cloned()),
      orchestrator,
      contacts: ContactChain::default(),
      log,
      store,
      bus: EventBus::new(),
      clock,
      config,
      paused: false,
    }
  }

  /// Consult `provider` after the captured contact and any earlier
  /// providers.
  pub fn with_contact_provider(mut self, provider: impl ContactProvider + 'static) -> Self {
    self.contacts.push(Box::new(provider));
    self
  }

  pub fn bus(&self) -> &EventBus { &self.bus }

  pub fn event_log(&self) -> &EventLog<K> { &self.log }

  pub fn orchestrator(&self) -> &SequenceOrchestrator<S, N, EventLog<K>> { &self.orchestrator }

  pub fn session(&self, key: &SessionKey) -> Option<&Session<S>> { self.sessions.get(key) }

  pub fn is_paused(&self) -> bool { self.paused }

  /// Spawn the engine task.
  pub fn start(self) -> RunningEngine<S, N, K> {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let bus = self.bus.clone();
    let handle = EngineHandle { commands: tx, clock: self.clock.clone() };
    let task = tokio::spawn(self.run(rx));
    RunningEngine { handle, bus, task }
  }

  async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Self {
    let mut poll = tokio::time::interval(self.config.poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
      threshold_minutes = self.config.abandonment_threshold_minutes,
      poll_seconds = self.config.poll_interval().as_secs(),
      "recovery engine started"
    );

    loop {
      let next_timer = self.until_next_timer();
      tokio::select! {
        _ = poll.tick() => self.detect().await,
        _ = sleep_for(next_timer) => {
          self.orchestrator.run_due().await;
        }
        command = commands.recv() => match command {
          None | Some(Command::Stop) => break,
          Some(command) => self.handle(command).await,
        },
      }
    }

    info!("recovery engine stopped");
    self
  }

  fn until_next_timer(&self) -> Option<Duration> {
    let due = self.orchestrator.next_due()?;
    Some((due - self.clock.now()).to_std().unwrap_or_default())
  }

  async fn handle(&mut self, command: Command) {
    match command {
      Command::Activity(session, signal, at) => {
        debug!(%session, ?signal, "activity");
        self.record_activity(&session, at).await;
      }
      Command::Navigate(session, path, at) => self.navigate(&session, path, at).await,
      Command::CaptureContact(session, contact, at, reply) => {
        let _ = reply.send(self.capture_contact(&session, contact, at).await);
      }
      Command::Sequences(reply) => {
        let _ = reply.send(self.orchestrator.sequences());
      }
      Command::Sequence(id, reply) => {
        let _ = reply.send(self.orchestrator.sequence(&id).cloned());
      }
      Command::Cancel(id, reply) => {
        let _ = reply.send(self.orchestrator.cancel_sequence(&id).await);
      }
      Command::Stats(days, reply) => {
        let _ = reply.send(self.log.stats(days, self.clock.now()).await);
      }
      Command::SetPaused(paused, reply) => {
        self.set_paused(paused);
        let _ = reply.send(());
      }
      Command::Status(reply) => {
        let _ = reply.send(self.status());
      }
      Command::Tick(reply) => {
        self.tick().await;
        let _ = reply.send(());
      }
      Command::Stop => {}
    }
  }

  /// One detection pass followed by every due timer.
  pub async fn tick(&mut self) {
    self.detect().await;
    self.orchestrator.run_due().await;
  }

  pub fn set_paused(&mut self, paused: bool) {
    if self.paused != paused {
      info!(paused, "detection {}", if paused { "paused" } else { "resumed" });
    }
    self.paused = paused;
  }

  pub fn status(&self) -> EngineStatus {
    let mut sessions: Vec<SessionStatus> = self.sessions.values().map(Session::status).collect();
    sessions.sort_by(|a, b| a.session.cmp(&b.session));
    EngineStatus {
      paused: self.paused,
      active_sequences: self
        .orchestrator
        .sequences()
        .iter()
        .filter(|s| s.status.is_active())
        .count(),
      sessions,
    }
  }

  // ── Sessions ─────────────────────────────────────────────────────────────

  /// The session for `key`, created as first seen at `at` if it is new. A new
  /// session picks up any contact captured in it before.
  async fn open_session(&mut self, key: &SessionKey, at: DateTime<Utc>) -> &mut Session<S> {
    let captured = if self.sessions.contains_key(key) {
      None
    } else {
      match contact::load_captured(&*self.store, key).await {
        Ok(captured) => captured,
        Err(e) => {
          warn!(session = %key, error = %e, "could not restore captured contact");
          None
        }
      }
    };

    let Self { sessions, source, checkout, bus, clock, config, .. } = self;
    sessions.entry(key.clone()).or_insert_with(|| {
      debug!(session = %key, "session opened");
      let detector = AbandonmentDetector::new(
        key.clone(),
        source.clone(),
        config.abandonment_threshold(),
        checkout.clone(),
        bus.clone(),
        clock.clone(),
      )
      .seen_since(at);
      Session::new(detector, captured)
    })
  }

  pub async fn record_activity(&mut self, key: &SessionKey, at: DateTime<Utc>) {
    self
      .open_session(key, at)
      .await
      .detector
      .record_activity_at(at);
  }

  pub async fn navigate(&mut self, key: &SessionKey, path: String, at: DateTime<Utc>) {
    self.open_session(key, at).await.detector.navigate(path);
  }

  /// Drop sessions that have been idle past the TTL. The TTL never undercuts
  /// the abandonment threshold.
  fn expire_sessions(&mut self) {
    let ttl = self
      .config
      .session_ttl()
      .max(self.config.abandonment_threshold());
    let before = self.sessions.len();
    self
      .sessions
      .retain(|_, s| s.detector.activity().idle_duration() <= ttl);
    let expired = before - self.sessions.len();
    if expired > 0 {
      debug!(expired, "dropped idle sessions");
    }
  }

  // ── Detection ────────────────────────────────────────────────────────────

  async fn detect(&mut self) {
    self.expire_sessions();
    if self.paused {
      return;
    }
    let mut triggered = Vec::new();
    for session in self.sessions.values_mut() {
      if let Some(event) = session.detector.poll().await {
        triggered.push(event);
      }
    }
    for event in triggered {
      self.handle_abandonment(event).await;
    }
  }

  async fn handle_abandonment(&mut self, event: AbandonmentEvent) {
    self
      .log
      .record(
        AnalyticsEvent::new(EventType::CartAbandoned, event.triggered_at)
          .with("cart_token", event.cart.token.as_str())
          .with("cart_value", event.cart.value())
          .with("item_count", event.cart.item_count),
      )
      .await;

    let captured = self
      .sessions
      .get(&event.session)
      .and_then(|s| s.captured.as_ref());
    let contact = self.contacts.resolve(&event.session, captured);
    match self.orchestrator.start_sequence(&event, contact) {
      StartOutcome::Started(id) => debug!(sequence = %id, "sequence scheduled"),
      StartOutcome::AlreadyActive(id) | StartOutcome::AlreadyHandled(id) => {
        debug!(sequence = %id, "sequence already exists")
      }
      StartOutcome::NoContact | StartOutcome::NothingEnabled => {}
    }
  }

  // ── Contact ──────────────────────────────────────────────────────────────

  pub async fn capture_contact(
    &mut self,
    key: &SessionKey,
    contact: ContactInfo,
    at: DateTime<Utc>,
  ) -> Result<ContactInfo> {
    if !contact.is_reachable() {
      return Err(Error::Core(reclaim_core::Error::PreconditionUnmet(
        "contact needs an email or phone".into(),
      )));
    }
    let previous = self.open_session(key, at).await.captured.clone();
    let merged = contact::capture(&*self.store, key, previous, contact).await?;

    let mut event = AnalyticsEvent::new(EventType::ContactCaptured, self.clock.now())
      .with("has_email", merged.email_address().is_some())
      .with("has_phone", merged.phone_number().is_some());
    if let Some(session) = self.sessions.get_mut(key) {
      session.captured = Some(merged.clone());
      if let Some(cart) = session.detector.current_cart() {
        event = event
          .with("cart_token", cart.token.clone())
          .with("cart_value", cart.value());
      }
    }
    self.log.record(event).await;
    info!(session = %key, "contact captured");
    Ok(merged)
  }
}

async fn sleep_for(duration: Option<Duration>) {
  match duration {
    Some(d) => tokio::time::sleep(d).await,
    None => future::pending().await,
  }
}

// ─── Running engine ──────────────────────────────────────────────────────────

pub struct RunningEngine<S, N, K> {
  handle: EngineHandle,
  bus:    EventBus,
  task:   JoinHandle<Engine<S, N, K>>,
}

impl<S, N, K> RunningEngine<S, N, K> {
  pub fn handle(&self) -> EngineHandle { self.handle.clone() }

  pub fn bus(&self) -> &EventBus { &self.bus }

  /// Ask the task to stop and wait for it. Scheduled timers are abandoned;
  /// the returned engine still holds its sequences.
  pub async fn stop(self) -> Result<Engine<S, N, K>> {
    let _ = self.handle.commands.send(Command::Stop).await;
    self.task.await.map_err(|e| {
      warn!(error = %e, "engine task did not exit cleanly");
      Error::Stopped
    })
  }
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Cheap, cloneable access to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
  commands: mpsc::Sender<Command>,
  clock:    Arc<dyn Clock>,
}

impl EngineHandle {
  async fn send(&self, command: Command) -> Result<()> {
    self.commands.send(command).await.map_err(|_| Error::Stopped)
  }

  async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
    let (tx, rx) = oneshot::channel();
    self.send(make(tx)).await?;
    rx.await.map_err(|_| Error::Stopped)
  }

  pub async fn record_activity(&self, session: SessionKey, signal: ActivitySignal) -> Result<()> {
    let at = self.clock.now();
    self.send(Command::Activity(session, signal, at)).await
  }

  pub async fn navigate(&self, session: SessionKey, path: impl Into<String>) -> Result<()> {
    let at = self.clock.now();
    self.send(Command::Navigate(session, path.into(), at)).await
  }

  pub async fn capture_contact(
    &self,
    session: SessionKey,
    contact: ContactInfo,
  ) -> Result<ContactInfo> {
    let at = self.clock.now();
    self
      .request(|tx| Command::CaptureContact(session, contact, at, tx))
      .await?
  }

  pub async fn sequences(&self) -> Result<Vec<Sequence>> {
    self.request(Command::Sequences).await
  }

  pub async fn sequence(&self, id: SequenceId) -> Result<Option<Sequence>> {
    self.request(|tx| Command::Sequence(id, tx)).await
  }

  /// `Ok(false)` when the sequence had already ended.
  pub async fn cancel_sequence(&self, id: SequenceId) -> Result<bool> {
    self.request(|tx| Command::Cancel(id, tx)).await?
  }

  pub async fn stats(&self, days: u32) -> Result<RecoveryStats> {
    self.request(|tx| Command::Stats(days, tx)).await?
  }

  pub async fn pause(&self) -> Result<()> {
    self.request(|tx| Command::SetPaused(true, tx)).await
  }

  pub async fn resume(&self) -> Result<()> {
    self.request(|tx| Command::SetPaused(false, tx)).await
  }

  pub async fn status(&self) -> Result<EngineStatus> { self.request(Command::Status).await }

  /// Run one detection pass and every due timer now, without waiting for
  /// the cadence.
  pub async fn tick(&self) -> Result<()> { self.request(Command::Tick).await }
}
