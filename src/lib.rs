//! Unimate Kiosk - Realtime session bridge for campus kiosks
//!
//! Merges card-scan logins pushed over the realtime gateway with REST
//! credential logins into one session, keeps the gateway connection alive,
//! and logs the kiosk out after a period of inactivity.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
