//! Bounded analytics log persisted through a [`KeyValueStore`].
//!
//! The whole log lives as one JSON array under [`ANALYTICS_KEY`]. Appends are
//! read-modify-write; the engine task is the only writer.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use reclaim_core::{
  analytics::{AnalyticsEvent, RecoveryStats},
  capability::{AnalyticsSink, KeyValueStore},
};
use tracing::{debug, warn};

use crate::{Result, error::storage};

pub const ANALYTICS_KEY: &str = "cart_recovery_analytics";

pub struct EventLog<K> {
  store:      Arc<K>,
  max_events: usize,
}

impl<K> Clone for EventLog<K> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), max_events: self.max_events }
  }
}

impl<K: KeyValueStore> EventLog<K> {
  pub fn new(store: Arc<K>, max_events: usize) -> Self {
    Self { store, max_events: max_events.max(1) }
  }

  /// Every stored event, oldest first. A corrupt record is discarded and
  /// reads as empty.
  pub async fn events(&self) -> Result<Vec<AnalyticsEvent>> {
    let raw = self
      .store
      .get(ANALYTICS_KEY)
      .await
      .map_err(storage)?;
    let Some(raw) = raw else {
      return Ok(Vec::new());
    };

    match serde_json::from_str(&raw) {
      Ok(events) => Ok(events),
      Err(e) => {
        let corruption = reclaim_core::Error::StorageCorruption {
          key:    ANALYTICS_KEY.to_owned(),
          reason: e.to_string(),
        };
        warn!(error = %corruption, "resetting analytics log");
        self
          .store
          .remove(ANALYTICS_KEY)
          .await
          .map_err(storage)?;
        Ok(Vec::new())
      }
    }
  }

  /// Append one event, dropping the oldest beyond the cap.
  pub async fn append(&self, event: AnalyticsEvent) -> Result<()> {
    let mut events = self.events().await?;
    events.push(event);
    if events.len() > self.max_events {
      let excess = events.len() - self.max_events;
      events.drain(..excess);
    }
    let raw = serde_json::to_string(&events).map_err(reclaim_core::Error::from)?;
    self
      .store
      .set(ANALYTICS_KEY, raw)
      .await
      .map_err(storage)?;
    Ok(())
  }

  /// Counts over events whose timestamp falls within the last `days` days.
  pub async fn stats(&self, days: u32, now: DateTime<Utc>) -> Result<RecoveryStats> {
    let cutoff = now - TimeDelta::days(i64::from(days));
    let events = self.events().await?;
    Ok(RecoveryStats::from_events(
      days,
      events.iter().filter(|e| e.timestamp >= cutoff),
    ))
  }

  /// The raw log together with the 30-day summary, as pretty JSON.
  pub async fn export(&self, now: DateTime<Utc>) -> Result<String> {
    let events = self.events().await?;
    let cutoff = now - TimeDelta::days(30);
    let stats = RecoveryStats::from_events(30, events.iter().filter(|e| e.timestamp >= cutoff));
    let raw = serde_json::to_string_pretty(&serde_json::json!({
      "events": events,
      "stats":  stats,
    }))
    .map_err(reclaim_core::Error::from)?;
    Ok(raw)
  }

  pub async fn clear(&self) -> Result<()> {
    self
      .store
      .remove(ANALYTICS_KEY)
      .await
      .map_err(storage)?;
    Ok(())
  }
}

impl<K: KeyValueStore> AnalyticsSink for EventLog<K> {
  async fn record(&self, event: AnalyticsEvent) {
    let event_type = event.event_type;
    match self.append(event).await {
      Ok(()) => debug!(%event_type, "analytics event recorded"),
      Err(e) => warn!(%event_type, error = %e, "failed to record analytics event"),
    }
  }
}

#[cfg(test)]
mod tests {
  use reclaim_core::analytics::EventType;

  use super::*;
  use crate::{memory::MemoryStore, testing::start_time};

  fn log(max: usize) -> (Arc<MemoryStore>, EventLog<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (store.clone(), EventLog::new(store, max))
  }

  #[tokio::test]
  async fn caps_at_max_dropping_oldest() {
    let (_store, log) = log(3);
    for minute in 0..5 {
      log
        .record(
          AnalyticsEvent::new(EventType::MessageSent, start_time())
            .with("n", minute),
        )
        .await;
    }
    let events = log.events().await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].payload["n"], 2);
    assert_eq!(events[2].payload["n"], 4);
  }

  #[tokio::test]
  async fn corrupt_record_resets() {
    let (store, log) = log(10);
    store.set(ANALYTICS_KEY, "{not json".into()).await.unwrap();

    assert!(log.events().await.unwrap().is_empty());
    assert_eq!(store.get(ANALYTICS_KEY).await.unwrap(), None);

    log
      .record(AnalyticsEvent::new(EventType::CartAbandoned, start_time()))
      .await;
    assert_eq!(log.events().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn stats_respect_window() {
    let (_store, log) = log(100);
    let now = start_time();
    log
      .record(AnalyticsEvent::new(EventType::CartAbandoned, now - TimeDelta::days(10)))
      .await;
    log
      .record(AnalyticsEvent::new(EventType::CartAbandoned, now - TimeDelta::days(1)))
      .await;
    log
      .record(
        AnalyticsEvent::new(EventType::CartRecovered, now).with("cart_value", 40.0),
      )
      .await;

    let week = log.stats(7, now).await.unwrap();
    assert_eq!(week.abandoned, 1);
    assert_eq!(week.recovered, 1);
    assert_eq!(week.recovery_rate, 100.0);

    let month = log.stats(30, now).await.unwrap();
    assert_eq!(month.abandoned, 2);
    assert_eq!(month.recovery_rate, 50.0);
    assert_eq!(month.recovered_value, 40.0);
  }

  #[tokio::test]
  async fn clear_and_export() {
    let (_store, log) = log(10);
    log
      .record(AnalyticsEvent::new(EventType::ContactCaptured, start_time()))
      .await;
    let now = start_time();
    let exported: serde_json::Value =
      serde_json::from_str(&log.export(now).await.unwrap()).unwrap();
    assert_eq!(exported["events"][0]["type"], "contact_captured");
    assert_eq!(exported["stats"]["contacts_captured"], 1);
    assert_eq!(exported["stats"]["window_days"], 30);

    log.clear().await.unwrap();
    let exported: serde_json::Value =
      serde_json::from_str(&log.export(now).await.unwrap()).unwrap();
    assert_eq!(exported["events"], serde_json::json!([]));
  }
}
