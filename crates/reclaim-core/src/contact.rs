//! Customer contact details and the providers that resolve them.

use serde::{Deserialize, Serialize};

use crate::session::SessionKey;

/// How the customer can be reached. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  /// Used for the `customer_name` placeholder.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:  Option<String>,
}

impl ContactInfo {
  pub fn email(address: impl Into<String>) -> Self {
    Self { email: Some(address.into()), ..Self::default() }
  }

  pub fn phone(number: impl Into<String>) -> Self {
    Self { phone: Some(number.into()), ..Self::default() }
  }

  /// Blank strings count as absent.
  pub fn email_address(&self) -> Option<&str> {
    self.email.as_deref().filter(|s| !s.trim().is_empty())
  }

  pub fn phone_number(&self) -> Option<&str> {
    self.phone.as_deref().filter(|s| !s.trim().is_empty())
  }

  /// `true` when at least one delivery channel is known.
  pub fn is_reachable(&self) -> bool {
    self.email_address().is_some() || self.phone_number().is_some()
  }
}

/// A source of contact details, e.g. a platform session or a form field
/// captured by the host. Providers are consulted in order; the first
/// reachable result wins.
pub trait ContactProvider: Send + Sync {
  fn resolve(&self, session: &SessionKey) -> Option<ContactInfo>;
}

/// A fixed contact is itself a provider; handy for hosts that learn the
/// customer up front.
impl ContactProvider for ContactInfo {
  fn resolve(&self, _: &SessionKey) -> Option<ContactInfo> {
    self.is_reachable().then(|| self.clone())
  }
}
