//! Media-playback unlock controller.
//!
//! Autoplay policy blocks unmuted playback until a user gesture (or a
//! remembered grant) permits it. The controller in `core` keeps retrying —
//! muted fallback, gesture rearm, fixed-interval recovery polls — until
//! sound is confirmed, and `consent` persists the grant across loads.

mod consent;
mod core;

pub use self::consent::{CONSENT_GRANTED, ConsentStore, FileConsentStore, MemoryConsent};
pub use self::core::{
    MediaSignal, MediaSurface, PlaybackError, UnlockConfig, UnlockController, UnlockPhase,
};
