//! In-process [`KeyValueStore`].

use std::{collections::HashMap, convert::Infallible, sync::Mutex};

use reclaim_core::capability::KeyValueStore;

/// Holds everything in a map; nothing survives the process. Useful for tests
/// and for hosts that do not need durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl KeyValueStore for MemoryStore {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    Ok(self.entries().get(key).cloned())
  }

  async fn set(&self, key: &str, value: String) -> Result<(), Infallible> {
    self.entries().insert(key.to_owned(), value);
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), Infallible> {
    self.entries().remove(key);
    Ok(())
  }
}
