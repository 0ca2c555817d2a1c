//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Chat backends (Ollama over HTTP, a scripted client for offline use)
//! - Presenters (channel to a UI loop, plain console output)
//! - The session runtime task and the terminal front end

pub mod adapter;
pub mod container;
pub mod runtime;
pub mod tui;

pub use adapter::*;
pub use container::*;
pub use runtime::*;
