//! API request and response types.
//!
//! Plain serde structs shared between the HTTP handlers and the client
//! synchronizer. No domain logic lives here.
mod request;
mod response;

pub use request::*;
pub use response::*;
