//! Pure domain services.

mod chunking;

pub use chunking::*;
