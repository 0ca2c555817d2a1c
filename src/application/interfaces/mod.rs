mod chat_client;
mod presenter;

pub use chat_client::*;
pub use presenter::*;
