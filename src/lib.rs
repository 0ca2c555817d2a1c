pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use application::{
    ChatClient, ChatSession, ChunkRenderer, FragmentStream, OpeningStream, PendingStream,
    Presenter, SessionState, StreamHandle, StreamIngestor, StreamOpening,
};

pub use connector::{
    ChannelPresenter, ConsolePresenter, Container, ContainerConfig, OllamaClient,
    ScriptedChatClient, SessionCommand, SessionRuntime,
};

pub use domain::{
    derive_new_chunks, dangling_word, ChatRequest, ChunkCursor, ChunkDerivation, ChunkReveal,
    DomainError, FadeIn, Role, SessionEvent, StreamBuffer, StreamEvent, StreamId, Transcript,
    Turn,
};
