//! Integration test utilities for the chat relay
//!
//! This crate provides helpers for running end-to-end tests against
//! the WebSocket gateway and its HTTP endpoints.

pub mod client;
pub mod helpers;

pub use client::*;
pub use helpers::*;
