//! Cart snapshots and the abandonment event built from them.
//!
//! A snapshot is an immutable reading of the storefront cart. Field names
//! follow the storefront's `cart.json` so a response body deserialises
//! straight into [`CartSnapshot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionKey;

/// One line of the cart, reduced to what recovery content needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
  pub title: String,
  #[serde(default)]
  pub image: Option<String>,
}

/// The state of a cart at the moment it was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
  pub token:              String,
  pub item_count:         u32,
  /// Cart total in minor currency units (cents).
  #[serde(rename = "total_price")]
  pub total_price_minor:  u64,
  #[serde(default)]
  pub items:              Vec<CartItem>,
}

impl CartSnapshot {
  pub fn is_empty(&self) -> bool { self.item_count == 0 }

  /// Cart total in major currency units.
  pub fn value(&self) -> f64 { self.total_price_minor as f64 / 100.0 }

  /// Total formatted with exactly two decimals, e.g. `5000` → `"50.00"`.
  pub fn formatted_total(&self) -> String {
    format!(
      "{}.{:02}",
      self.total_price_minor / 100,
      self.total_price_minor % 100
    )
  }

  /// Structural comparison used for change detection. The token is not part
  /// of the comparison; only the contents are.
  pub fn same_contents(&self, other: &CartSnapshot) -> bool {
    self.item_count == other.item_count
      && self.total_price_minor == other.total_price_minor
      && self.items == other.items
  }
}

/// Emitted once per idle episode when a populated cart is left alone past the
/// abandonment threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonmentEvent {
  pub session:      SessionKey,
  pub cart:         CartSnapshot,
  pub triggered_at: DateTime<Utc>,
}
