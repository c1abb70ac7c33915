//! Account identity: resolution, handle allocation, and sessions.
//!
//! Decides who a user is across login paths. External provider assertions
//! are mapped onto local accounts by [`resolve`]; display handles come from
//! the collision-free [`handle::allocate`] probe; passwords and tokens
//! follow the platform's Argon2 + JWT conventions.
//!
//! ## Identity Types
//!
//! - [`Account`] — Durable identity record
//! - [`Assertion`] — Verified claim from an external identity provider
//! - [`Session`] — Active login session with expiry and revocation
//!
//! ## Security
//!
//! - [`Crypto`] — JWT signing and verification
//! - [`Claims`] — JWT payload structure
//! - [`password`] — Argon2 hashing and verification
mod account;
mod claims;
mod crypto;
mod error;
mod resolver;
mod session;
pub mod handle;
pub mod password;

pub use account::*;
pub use claims::*;
pub use crypto::*;
pub use error::*;
pub use resolver::*;
pub use session::*;

#[cfg(feature = "database")]
mod repository;
#[cfg(feature = "database")]
pub use repository::*;

#[cfg(feature = "server")]
mod middleware;
#[cfg(feature = "server")]
pub use middleware::*;
