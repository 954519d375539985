//! Core types and utilities for the gatehouse authentication gateway.
//!
//! This crate provides the foundational types and error handling shared
//! by the access policy, the OAuth flow, and the HTTP server.

pub mod error;
pub mod name;

pub use error::Result;
pub use name::{ParseProviderNameError, ProviderName};
