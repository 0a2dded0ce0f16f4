//! # Overview
//!
//! Run-time decisions about *when* heavy 3D content starts loading and *how
//! expensive* it is allowed to render.
//!
//! * A [`LoadGate`] opens once per component according to its [`LoadPriority`]:
//!   immediately, one second after the first evaluation, or when an anchor
//!   element comes near the [`Viewport`].
//! * A [`PerformanceMonitor`] classifies the device into a [`PerformanceTier`]
//!   and downgrades it when the frame rate reported by the [`FrameClock`] drops
//!   below 30 frames per second.
//! * [`quality_settings`] maps a tier to the [`QualitySettings`] the renderer uses.
//!
//! Everything runs on the host's event loop. The host passes the current time
//! into every call, pumps the [`Viewport`] with layout and scroll changes and
//! presents frames on the [`FrameClock`]. Nothing in this crate blocks or
//! spawns threads.

mod device;
mod frame_clock;
mod load_gate;
mod performance;
mod quality;
mod tier;
mod viewport;

pub use device::*;
pub use frame_clock::*;
pub use load_gate::*;
pub use performance::*;
pub use quality::*;
pub use tier::*;
pub use viewport::*;
