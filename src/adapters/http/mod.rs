//! Kiosk REST API adapters.
//!
//! - `HttpKioskApi` - `reqwest` client for the kiosk backend
//! - `MockKioskApi` - Configurable in-process API for tests

mod client;
mod mock;

pub use client::{HttpApiConfig, HttpKioskApi};
pub use mock::MockKioskApi;
