//! Cached view of one session's storefront cart.

use std::sync::Arc;

use reclaim_core::{
  capability::CartSnapshotSource,
  cart::CartSnapshot,
  session::SessionKey,
};
use tracing::debug;

/// Polls a [`CartSnapshotSource`] for one session and remembers the last good
/// snapshot.
///
/// `refresh` takes `&mut self`, so at most one fetch per service is ever in
/// flight.
pub struct CartStateService<S> {
  source:  Arc<S>,
  session: SessionKey,
  current: Option<CartSnapshot>,
}

impl<S: CartSnapshotSource> CartStateService<S> {
  pub fn new(source: Arc<S>, session: SessionKey) -> Self {
    Self { source, session, current: None }
  }

  /// Fetch the latest snapshot and report whether its contents differ from
  /// the previous one. The first successful fetch counts as a change.
  ///
  /// A failed fetch keeps the previous snapshot and surfaces as
  /// [`FetchFailure`](reclaim_core::Error::FetchFailure); the next scheduled
  /// poll is the retry.
  pub async fn refresh(&mut self) -> reclaim_core::Result<bool> {
    let next = self
      .source
      .fetch_current(&self.session)
      .await
      .map_err(|e| reclaim_core::Error::FetchFailure(e.to_string()))?;

    let changed = self
      .current
      .as_ref()
      .is_none_or(|prev| !prev.same_contents(&next));
    if changed {
      debug!(
        session = %self.session,
        token = %next.token,
        items = next.item_count,
        "cart contents changed"
      );
    }
    self.current = Some(next);
    Ok(changed)
  }

  pub fn current_snapshot(&self) -> Option<&CartSnapshot> { self.current.as_ref() }

  pub fn session(&self) -> &SessionKey { &self.session }
}
