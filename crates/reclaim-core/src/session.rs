//! Browsing-session identity.
//!
//! Detection state is kept per browsing session. Hosts choose what the key
//! is; the storefront host uses the value of the shopper's `cart` cookie, so
//! the key also authorises cart reads on the shopper's behalf.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
  pub fn new(key: impl Into<String>) -> Self { Self(key.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  /// Keys are opaque but must be non-blank and free of whitespace and cookie
  /// separators, since they end up in cookie headers and storage keys.
  pub fn is_valid(&self) -> bool {
    !self.0.is_empty()
      && !self
        .0
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, ';' | ',' | '"'))
  }
}

impl fmt::Display for SessionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<String> for SessionKey {
  fn from(s: String) -> Self { Self(s) }
}

impl From<&str> for SessionKey {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}
