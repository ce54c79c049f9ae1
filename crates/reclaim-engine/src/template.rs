//! Placeholder substitution for recovery content.
//!
//! Supported placeholders: `{{item_count}}`, `{{total_price}}`,
//! `{{recovery_url}}`, `{{customer_name}}` and `{{discount_code}}`. Every
//! occurrence is replaced; unknown placeholders are left as written.

use reclaim_core::cart::CartSnapshot;

const DEFAULT_CUSTOMER_NAME: &str = "there";

/// Values available to a template.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
  pub cart:          &'a CartSnapshot,
  pub recovery_url:  String,
  pub customer_name: Option<&'a str>,
  pub discount_code: Option<&'a str>,
}

impl<'a> RenderContext<'a> {
  pub fn new(cart: &'a CartSnapshot, storefront_url: &str) -> Self {
    Self {
      cart,
      recovery_url: recovery_url(storefront_url, &cart.token),
      customer_name: None,
      discount_code: None,
    }
  }
}

/// `<storefront>/cart/<token>`, tolerating a trailing slash on the base.
pub fn recovery_url(storefront_url: &str, cart_token: &str) -> String {
  format!("{}/cart/{cart_token}", storefront_url.trim_end_matches('/'))
}

pub fn render(template: &str, ctx: &RenderContext<'_>) -> String {
  let name = ctx
    .customer_name
    .filter(|n| !n.trim().is_empty())
    .unwrap_or(DEFAULT_CUSTOMER_NAME);

  template
    .replace("{{item_count}}", &ctx.cart.item_count.to_string())
    .replace("{{total_price}}", &ctx.cart.formatted_total())
    .replace("{{recovery_url}}", &ctx.recovery_url)
    .replace("{{customer_name}}", name)
    .replace("{{discount_code}}", ctx.discount_code.unwrap_or_default())
}
