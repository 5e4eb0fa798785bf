//! Synchronous WebDriverAgent protocol client.
//!
//! Speaks the session-oriented JSON-over-HTTP protocol exposed by
//! WebDriverAgent running on an iOS device: session lifecycle, gestures,
//! screenshots, app control, native element lookup, and device state.
//!
//! The client is deliberately policy-free: every gesture is a single remote
//! side effect with no retry logic. Waiting and retrying belong to the
//! orchestration layer built on top of it.

mod client;
mod error;
mod protocol;

pub use client::{DEFAULT_WDA_URL, WdaClient};
pub use error::{Result, WdaError};
pub use protocol::{ElementRect, ElementRef};
