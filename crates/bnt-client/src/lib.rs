//! Client-side auth state: one storage, many tabs, one realtime link.
//!
//! The [`Synchronizer`] keeps a bearer token and cached profile in the
//! platform's persistent storage and treats that storage as the single
//! source of truth: change events, in-process or cross-tab, are wake-up
//! signals after which every view re-reads. The [`Gate`] decides when the
//! persistent realtime connection may exist; a token change always means a
//! full reconnect cycle.
mod gate;
mod store;
mod sync;

pub use gate::*;
pub use store::*;
pub use sync::*;
