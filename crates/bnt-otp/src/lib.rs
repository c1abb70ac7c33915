//! One-time-code challenges gating registration and password reset.
//!
//! A [`Challenge`] binds a short-lived numeric code to an (email, purpose)
//! pair. The manager enforces the whole lifecycle: a fresh issue supersedes
//! any prior challenge, expiry is checked lazily, wrong guesses burn an
//! attempt atomically, and resends are throttled by a cooldown window.
//!
//! Independent of the identity crate by design; the registration, login,
//! and password-reset flows compose the two.
mod challenge;
mod error;
mod manager;

pub use challenge::*;
pub use error::*;
pub use manager::*;

#[cfg(feature = "database")]
mod repository;

#[cfg(feature = "server")]
mod postman;
#[cfg(feature = "server")]
pub use postman::*;
