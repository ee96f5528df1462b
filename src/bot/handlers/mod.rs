//! Discord event handlers
//!
//! Plain-text chat commands arrive as gateway message events rather than poise
//! commands, so the whole text grammar stays in the framework-agnostic dispatcher.

/// Message handler routing chat text to the command dispatcher
pub mod message;

pub use message::event_handler;
