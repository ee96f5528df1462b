//! Core business logic - framework-agnostic monitoring, alerting and reporting.
//!
//! Nothing in here knows about Discord or HTTP: telemetry comes in through
//! [`telemetry::TelemetrySource`], messages go out through [`notify::Notifier`].

/// Period totals built from daily energy figures
pub mod aggregate;
/// Outage, overheat, liveness, record and reminder rules
pub mod alerts;
/// Injectable time source
pub mod clock;
/// Text command parsing and execution
pub mod commands;
/// Localized message catalog
pub mod messages;
/// Shared monitoring service
pub mod monitor;
/// Outbound notification sink
pub mod notify;
/// Cron and interval driven jobs
pub mod scheduler;
/// Telemetry source contract and snapshot cache
pub mod telemetry;
