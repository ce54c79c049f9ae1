//! Cart abandonment detection and recovery sequencing.
//!
//! [`Engine`] keeps one [`AbandonmentDetector`] per browsing session, feeds
//! their events to a [`SequenceOrchestrator`] and runs everything on a single
//! tokio task. Hosts supply the capabilities from
//! `reclaim-core` (cart source, notification sender, key-value store) and
//! talk to the running engine through an [`EngineHandle`].

pub mod activity;
pub mod cart_state;
pub mod config;
pub mod contact;
pub mod detector;
pub mod engine;
pub mod error;
pub mod event_log;
pub mod events;
pub mod memory;
pub mod orchestrator;
pub mod session;
pub mod template;
pub mod timers;
pub mod timing;

#[cfg(test)]
mod testing;

pub use config::RecoveryConfig;
pub use detector::AbandonmentDetector;
pub use engine::{Engine, EngineHandle, EngineStatus, RunningEngine};
pub use error::{Error, Result};
pub use orchestrator::SequenceOrchestrator;
