//! Vendor telemetry API - HTTP client and wire types.
//!
//! [`client::VendorClient`] is the production [`TelemetrySource`](crate::core::telemetry::TelemetrySource).

/// Session-based HTTP client for the inverter vendor cloud
pub mod client;
/// JSON payloads returned by the vendor API
pub mod types;

pub use client::VendorClient;
