//! Account identity and verification subsystem for the banter chat platform.
//!
//! This facade crate re-exports all public bnt crates for convenient access.
//!
//! ## Crate Organization
//!
//! ### Core Types
//! - [`core`] — Type aliases, constants, and shared traits
//! - [`dto`] — API request/response types
//!
//! ### Domain Logic
//! - [`identity`] — Account resolution, handles, passwords, tokens
//! - [`otp`] — One-time-code challenges
//!
//! ### Infrastructure
//! - [`pg`] — Database connectivity and DDL
//!
//! ### Application
//! - [`client`] — Browser-side auth-state synchronizer
//! - [`server`] — Unified auth backend

pub use bnt_client as client;
pub use bnt_core as core;
pub use bnt_dto as dto;
pub use bnt_identity as identity;
pub use bnt_otp as otp;
pub use bnt_pg as pg;
pub use bnt_server as server;

// Re-export commonly used types at the root
pub use bnt_core::*;
