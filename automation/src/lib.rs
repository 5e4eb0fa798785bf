//! Text-driven UI automation over a remote device.
//!
//! Combines the WDA protocol client with OCR over screenshots so callers
//! can locate on-screen text and tap it without the target app exposing
//! accessibility identifiers. Layers, bottom up:
//!
//! - [`UiSurface`]: the contract every backend satisfies; it can capture a
//!   frame and deliver coordinate-addressed input events.
//! - [`ScreenText`]: couples a surface with an OCR engine; find / wait-for /
//!   tap semantics with a cached frame and explicit refresh.
//! - [`Automator`]: task-level actions (launch, type, scroll-until-found,
//!   retry) plus scoped session lifecycle for the WDA backend.
//!
//! Everything is synchronous and strictly sequential: capture → recognize →
//! decide → act. Overlapping a gesture with a stale capture would corrupt
//! the tap target, so there is deliberately no concurrency here.

mod automator;
mod screen;
mod surface;

#[cfg(feature = "mirror")]
mod mirror;

pub use automator::{Automator, AutomatorConfig, SwipeDirection};
pub use screen::ScreenText;
pub use surface::UiSurface;

#[cfg(feature = "mirror")]
pub use mirror::MirrorSurface;
