//! # Skirmish Test Utilities
//!
//! Shared testing infrastructure for the skirmish crates.
//!
//! ## Modules
//!
//! - [`fixtures`] - Pre-built worlds and entity helpers
//! - [`determinism`] - Determinism verification harness and proptest strategies
//! - [`peers`] - Two-peer harnesses for reconciliation tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod determinism;
pub mod fixtures;
pub mod peers;

pub use proptest;
