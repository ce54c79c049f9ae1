//! Core types and capability traits for the Reclaim cart-recovery engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The engine and the hosts depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod analytics;
pub mod capability;
pub mod cart;
pub mod clock;
pub mod contact;
pub mod error;
pub mod sequence;
pub mod session;

pub use error::{Error, Result};
