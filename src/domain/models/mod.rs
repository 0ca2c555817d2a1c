mod chat_request;
mod chunk;
mod session_event;
mod stream;
mod stream_buffer;
mod transcript;
mod turn;

pub use chat_request::*;
pub use chunk::*;
pub use session_event::*;
pub use stream::*;
pub use stream_buffer::*;
pub use transcript::*;
pub use turn::*;
