//! # Domain Layer
//!
//! Conversation model, streaming buffer state and the pure chunking rules.
//! This layer is independent of transports and terminals.

mod error;
pub mod models;
pub mod services;

pub use error::*;
pub use models::*;
pub use services::*;
