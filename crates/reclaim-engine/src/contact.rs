//! Contact resolution.
//!
//! A contact captured directly from the shopper outranks every configured
//! provider. Captured contacts are persisted per session under
//! [`contact_key`]. Providers are then consulted in order and the first
//! reachable result wins.

use reclaim_core::{
  capability::KeyValueStore,
  contact::{ContactInfo, ContactProvider},
  session::SessionKey,
};
use tracing::{debug, warn};

use crate::{Result, error::storage};

pub const CONTACT_KEY: &str = "cart_recovery_contact";

/// Storage key of the contact captured in `session`.
pub fn contact_key(session: &SessionKey) -> String { format!("{CONTACT_KEY}:{session}") }

/// Restore the contact captured in `session`, if any. A record that fails to
/// parse is removed.
pub async fn load_captured<K: KeyValueStore>(
  store: &K,
  session: &SessionKey,
) -> Result<Option<ContactInfo>> {
  let key = contact_key(session);
  let Some(raw) = store.get(&key).await.map_err(storage)? else {
    return Ok(None);
  };
  match serde_json::from_str::<ContactInfo>(&raw) {
    Ok(contact) => {
      debug!(%session, "restored captured contact");
      Ok(Some(contact))
    }
    Err(e) => {
      let corruption = reclaim_core::Error::StorageCorruption {
        key:    key.clone(),
        reason: e.to_string(),
      };
      warn!(error = %corruption, "discarding captured contact");
      store.remove(&key).await.map_err(storage)?;
      Ok(None)
    }
  }
}

/// Merge `contact` over `previous` and persist the result. Fields missing
/// from `contact` keep the previously captured value.
pub async fn capture<K: KeyValueStore>(
  store: &K,
  session: &SessionKey,
  previous: Option<ContactInfo>,
  contact: ContactInfo,
) -> Result<ContactInfo> {
  let merged = match previous {
    Some(prev) => ContactInfo {
      email: contact.email.or(prev.email),
      phone: contact.phone.or(prev.phone),
      name:  contact.name.or(prev.name),
    },
    None => contact,
  };
  let raw = serde_json::to_string(&merged).map_err(reclaim_core::Error::from)?;
  store
    .set(&contact_key(session), raw)
    .await
    .map_err(storage)?;
  Ok(merged)
}

/// The configured providers, shared by every session.
#[derive(Default)]
pub struct ContactChain {
  providers: Vec<Box<dyn ContactProvider>>,
}

impl ContactChain {
  pub fn new(providers: Vec<Box<dyn ContactProvider>>) -> Self { Self { providers } }

  /// Append a provider; it is consulted after all existing ones.
  pub fn push(&mut self, provider: Box<dyn ContactProvider>) { self.providers.push(provider); }

  /// The best contact for `session` right now, or an empty one if nobody can
  /// be reached.
  pub fn resolve(&self, session: &SessionKey, captured: Option<&ContactInfo>) -> ContactInfo {
    captured
      .filter(|c| c.is_reachable())
      .cloned()
      .into_iter()
      .chain(self.providers.iter().filter_map(|p| p.resolve(session)))
      .find(ContactInfo::is_reachable)
      .unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::MemoryStore;

  struct Nobody;

  impl ContactProvider for Nobody {
    fn resolve(&self, _: &SessionKey) -> Option<ContactInfo> { None }
  }

  /// Knows exactly one session.
  struct Member;

  impl ContactProvider for Member {
    fn resolve(&self, session: &SessionKey) -> Option<ContactInfo> {
      (session.as_str() == "member").then(|| ContactInfo::email("member@example.com"))
    }
  }

  fn session(key: &str) -> SessionKey { SessionKey::from(key) }

  #[test]
  fn captured_contact_wins_over_providers() {
    let chain = ContactChain::new(vec![
      Box::new(Nobody),
      Box::new(ContactInfo::email("session@example.com")),
    ]);
    let s = session("s1");
    assert_eq!(chain.resolve(&s, None).email.as_deref(), Some("session@example.com"));

    let typed = ContactInfo::email("typed@example.com");
    assert_eq!(chain.resolve(&s, Some(&typed)).email.as_deref(), Some("typed@example.com"));
  }

  #[test]
  fn providers_see_the_session() {
    let chain = ContactChain::new(vec![Box::new(Member)]);
    assert!(chain.resolve(&session("member"), None).is_reachable());
    assert!(!chain.resolve(&session("guest"), None).is_reachable());
  }

  #[tokio::test]
  async fn capture_persists_and_merges_per_session() {
    let store = MemoryStore::new();
    let s1 = session("s1");
    let first = capture(&store, &s1, None, ContactInfo::email("a@example.com"))
      .await
      .unwrap();
    capture(&store, &s1, Some(first), ContactInfo::phone("+15550100"))
      .await
      .unwrap();

    let contact = load_captured(&store, &s1).await.unwrap().unwrap();
    assert_eq!(contact.email.as_deref(), Some("a@example.com"));
    assert_eq!(contact.phone.as_deref(), Some("+15550100"));
    assert_eq!(load_captured(&store, &session("s2")).await.unwrap(), None);
  }

  #[tokio::test]
  async fn corrupt_record_is_removed() {
    let store = MemoryStore::new();
    let s1 = session("s1");
    store.set(&contact_key(&s1), "][".into()).await.unwrap();

    assert_eq!(load_captured(&store, &s1).await.unwrap(), None);
    assert_eq!(store.get(&contact_key(&s1)).await.unwrap(), None);
  }

  #[test]
  fn nobody_reachable_resolves_empty() {
    let chain = ContactChain::new(vec![Box::new(Nobody)]);
    assert!(!chain.resolve(&session("s1"), None).is_reachable());
  }
}
