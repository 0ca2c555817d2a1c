mod channel_presenter;
mod console_presenter;
mod ndjson;
mod ollama_client;
mod scripted_chat_client;

pub use channel_presenter::*;
pub use console_presenter::*;
pub use ollama_client::*;
pub use scripted_chat_client::*;
