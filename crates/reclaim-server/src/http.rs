//! Outbound HTTP adapters: the storefront cart endpoint and message delivery.

use axum::http::header;
use reclaim_core::{
  capability::{CartSnapshotSource, Channel, NotificationSender, RenderedContent},
  cart::CartSnapshot,
  session::SessionKey,
};
use serde_json::json;
use tracing::debug;

use crate::error::Error;

fn join(base: &str, path: &str) -> String {
  format!("{}{path}", base.trim_end_matches('/'))
}

// ─── Cart ────────────────────────────────────────────────────────────────────

/// Reads `GET <storefront>/cart.json` as the shopper, by presenting the
/// session key as the storefront's `cart` cookie.
#[derive(Clone)]
pub struct StorefrontCartSource {
  client:   reqwest::Client,
  cart_url: String,
}

impl StorefrontCartSource {
  pub fn new(client: reqwest::Client, storefront_url: &str) -> Self {
    Self { client, cart_url: join(storefront_url, "/cart.json") }
  }
}

impl CartSnapshotSource for StorefrontCartSource {
  type Error = Error;

  async fn fetch_current(&self, session: &SessionKey) -> Result<CartSnapshot, Error> {
    let cart = self
      .client
      .get(&self.cart_url)
      .header(header::ACCEPT, "application/json")
      .header(header::COOKIE, format!("cart={session}"))
      .send()
      .await?
      .error_for_status()?
      .json::<CartSnapshot>()
      .await?;
    Ok(cart)
  }
}

// ─── Delivery ────────────────────────────────────────────────────────────────

/// Email goes through the storefront's contact form; SMS is posted as JSON to
/// an optional webhook.
#[derive(Clone)]
pub struct StorefrontNotifier {
  client:      reqwest::Client,
  contact_url: String,
  sms_webhook: Option<String>,
}

impl StorefrontNotifier {
  pub fn new(client: reqwest::Client, storefront_url: &str, sms_webhook: Option<String>) -> Self {
    Self { client, contact_url: join(storefront_url, "/contact"), sms_webhook }
  }

  async fn send_email(&self, to: &str, content: &RenderedContent) -> Result<(), Error> {
    let kind = content.kind.to_string();
    let form = [
      ("form_type", "cart_recovery"),
      ("email", to),
      ("subject", content.subject.as_deref().unwrap_or_default()),
      ("body", content.body.as_str()),
      ("cart_token", content.cart_token.as_str()),
      ("template_type", kind.as_str()),
    ];
    self
      .client
      .post(&self.contact_url)
      .form(&form)
      .send()
      .await?
      .error_for_status()?;
    Ok(())
  }

  async fn send_sms(&self, to: &str, content: &RenderedContent) -> Result<(), Error> {
    let url = self.sms_webhook.as_deref().ok_or(Error::SmsNotConfigured)?;
    self
      .client
      .post(url)
      .json(&json!({
        "to":            to,
        "body":          content.body,
        "cart_token":    content.cart_token,
        "template_type": content.kind,
      }))
      .send()
      .await?
      .error_for_status()?;
    Ok(())
  }
}

impl NotificationSender for StorefrontNotifier {
  type Error = Error;

  async fn send(
    &self,
    channel: Channel,
    recipient: &str,
    content: &RenderedContent,
  ) -> Result<(), Error> {
    match channel {
      Channel::Email => self.send_email(recipient, content).await?,
      Channel::Sms => self.send_sms(recipient, content).await?,
    }
    debug!(%channel, kind = %content.kind, "delivered");
    Ok(())
  }
}
