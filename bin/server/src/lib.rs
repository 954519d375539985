//! gatehouse authentication gateway server.
//!
//! This crate wires the OAuth login flow and the access policy into an axum
//! application: configuration, the HTTP gateway, and the page routes.

pub mod app;
pub mod config;
pub mod gateway;
