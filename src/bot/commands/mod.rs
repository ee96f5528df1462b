//! Discord slash commands.
//!
//! The chat grammar itself is plain text (see [`crate::core::commands`]); these
//! `/help` slash command only covers discoverability.

/// General utility commands
pub mod general;

pub use general::*;
