mod chat_session;
mod chunk_renderer;
mod stream_ingestor;

pub use chat_session::*;
pub use chunk_renderer::*;
pub use stream_ingestor::*;
