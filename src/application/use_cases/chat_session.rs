use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::use_cases::{ChunkRenderer, StreamHandle, StreamIngestor, StreamOpening};
use crate::application::{ChatClient, FragmentStream, Presenter};
use crate::domain::{
    DomainError, FadeIn, SessionEvent, StreamBuffer, StreamEvent, StreamId, Transcript, Turn,
};

/// Whether a session can accept a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming(StreamId),
}

/// A stream accepted by [`ChatSession::submit`] whose fragments have not
/// been pulled yet.
pub struct PendingStream {
    handle: StreamHandle,
    fragments: FragmentStream,
}

impl PendingStream {
    pub fn handle(&self) -> &StreamHandle {
        &self.handle
    }

    /// Pull fragments and forward them, tagged, to `tx` until the stream ends
    /// or the handle is cancelled. Cancelling drops the fragment stream.
    pub async fn forward(self, tx: mpsc::UnboundedSender<StreamEvent>) {
        let PendingStream {
            handle,
            mut fragments,
        } = self;
        let stream = handle.id();

        loop {
            let event = tokio::select! {
                biased;
                _ = handle.cancelled() => {
                    debug!("Stream {} closed by cancellation", stream);
                    return;
                }
                item = fragments.next() => match item {
                    Some(Ok(text)) => StreamEvent::Fragment { stream, text },
                    Some(Err(error)) => StreamEvent::Failed { stream, error },
                    None => StreamEvent::Completed { stream },
                },
            };

            let terminal = event.is_terminal();
            if tx.send(event).is_err() || terminal {
                return;
            }
        }
    }
}

/// A stream accepted by [`ChatSession::begin`] whose call is not established
/// yet.
pub struct OpeningStream {
    opening: StreamOpening,
}

impl OpeningStream {
    pub fn handle(&self) -> &StreamHandle {
        self.opening.handle()
    }

    /// Establish the call, then forward like [`PendingStream::forward`]. A
    /// call that cannot be established is forwarded as a `Failed` event.
    /// Cancelling while connecting abandons the call.
    pub async fn forward(self, tx: mpsc::UnboundedSender<StreamEvent>) {
        let handle = self.handle().clone();
        let stream = handle.id();

        let opened = tokio::select! {
            biased;
            _ = handle.cancelled() => {
                debug!("Stream {} cancelled while connecting", stream);
                return;
            }
            opened = self.opening.open() => opened,
        };

        match opened {
            Ok((handle, fragments)) => PendingStream { handle, fragments }.forward(tx).await,
            Err(error) => {
                if tx.send(StreamEvent::Failed { stream, error }).is_err() {
                    debug!("Session gone before stream {} failed to open", stream);
                }
            }
        }
    }
}

/// One conversation: the single writer of its transcript, stream buffer and
/// chunk cursor.
///
/// A submitted prompt and its answer are committed to the transcript together
/// when the stream completes. A failed or cancelled stream leaves the
/// transcript exactly as it was and hands the prompt back through the
/// presenter.
pub struct ChatSession {
    ingestor: StreamIngestor,
    renderer: ChunkRenderer,
    transcript: Transcript,
    presenter: Arc<dyn Presenter>,
}

impl ChatSession {
    pub fn new(
        client: Arc<dyn ChatClient>,
        model: impl Into<String>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            ingestor: StreamIngestor::new(client, model),
            renderer: ChunkRenderer::default(),
            transcript: Transcript::new(),
            presenter,
        }
    }

    pub fn with_fade(mut self, fade: FadeIn) -> Self {
        self.renderer = ChunkRenderer::new(fade);
        self
    }

    pub fn state(&self) -> SessionState {
        match self.ingestor.active_stream() {
            Some(stream) => SessionState::Streaming(stream),
            None => SessionState::Idle,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Snapshot of the in-flight answer, if any.
    pub fn buffer(&self) -> Option<&StreamBuffer> {
        self.ingestor.buffer()
    }

    pub fn renderer(&self) -> &ChunkRenderer {
        &self.renderer
    }

    pub fn model(&self) -> &str {
        self.ingestor.model()
    }

    /// Start answering `text`.
    ///
    /// Rejects blank input and any submission while a stream is active. The
    /// active stream is not touched by a rejected submission; call
    /// [`cancel`](Self::cancel) first to replace it.
    pub async fn submit(&mut self, text: &str) -> Result<PendingStream, DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.reject(text, DomainError::invalid_input("message is empty")));
        }

        let prompt = Turn::user(text);
        match self.ingestor.start(prompt.clone()).await {
            Ok((handle, fragments)) => {
                self.renderer.reset();
                self.presenter.present(SessionEvent::StreamStarted {
                    stream: handle.id(),
                    prompt,
                });
                Ok(PendingStream { handle, fragments })
            }
            Err(error) => Err(self.reject(text, error)),
        }
    }

    /// Accept `text` and reserve its stream without waiting for the service.
    ///
    /// Validation and the busy check are the same as [`submit`](Self::submit),
    /// but the call is established by [`OpeningStream::forward`], so a slow
    /// or unreachable server surfaces later as a `StreamFailed` event.
    pub fn begin(&mut self, text: &str) -> Result<OpeningStream, DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.reject(text, DomainError::invalid_input("message is empty")));
        }

        let prompt = Turn::user(text);
        match self.ingestor.begin(prompt.clone()) {
            Ok(opening) => {
                self.renderer.reset();
                self.presenter.present(SessionEvent::StreamStarted {
                    stream: opening.handle().id(),
                    prompt,
                });
                Ok(OpeningStream { opening })
            }
            Err(error) => Err(self.reject(text, error)),
        }
    }

    /// Apply one stream event. Returns `false` if it was stale and ignored.
    pub fn apply(&mut self, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Fragment { stream, text } => {
                let Some(buffer) = self.ingestor.on_fragment(stream, &text) else {
                    return false;
                };
                let chunks = self.renderer.observe(buffer);
                if !chunks.is_empty() {
                    self.presenter
                        .present(SessionEvent::ChunksRevealed { stream, chunks });
                }
                true
            }
            StreamEvent::Completed { stream } => {
                if self.ingestor.active_stream() != Some(stream) {
                    debug!("Ignoring completion of inactive stream {}", stream);
                    return false;
                }
                if let Some(buffer) = self.ingestor.buffer() {
                    let chunks = self.renderer.flush(buffer);
                    if !chunks.is_empty() {
                        self.presenter
                            .present(SessionEvent::ChunksRevealed { stream, chunks });
                    }
                }
                let Some((prompt, answer)) = self.ingestor.on_complete(stream) else {
                    return false;
                };
                self.renderer.reset();
                self.transcript.push(prompt);
                self.transcript.push(answer.clone());
                self.presenter.present(SessionEvent::StreamCompleted {
                    stream,
                    turn: answer,
                });
                self.presenter.present(SessionEvent::TranscriptUpdated(
                    self.transcript.turns().to_vec(),
                ));
                true
            }
            StreamEvent::Failed { stream, error } => {
                let Some(prompt) = self.ingestor.on_error(stream, &error) else {
                    return false;
                };
                self.renderer.reset();
                self.presenter.present(SessionEvent::StreamFailed {
                    stream,
                    prompt,
                    error,
                });
                true
            }
        }
    }

    /// Pull `pending` to its end, applying each item in arrival order.
    ///
    /// Returns the assistant turn on completion, `None` if the handle was
    /// cancelled meanwhile, or the stream's error.
    pub async fn drive(&mut self, pending: PendingStream) -> Result<Option<Turn>, DomainError> {
        let PendingStream {
            handle,
            mut fragments,
        } = pending;
        let stream = handle.id();

        loop {
            let item = tokio::select! {
                biased;
                _ = handle.cancelled() => {
                    self.cancel();
                    return Ok(None);
                }
                item = fragments.next() => item,
            };

            match item {
                Some(Ok(text)) => {
                    self.apply(StreamEvent::Fragment { stream, text });
                }
                Some(Err(error)) => {
                    self.apply(StreamEvent::Failed {
                        stream,
                        error: error.clone(),
                    });
                    return Err(error);
                }
                None => {
                    if !self.apply(StreamEvent::Completed { stream }) {
                        return Ok(None);
                    }
                    return Ok(self.transcript.last().cloned());
                }
            }
        }
    }

    /// Submit `text` and drive its stream to the end.
    pub async fn ask(&mut self, text: &str) -> Result<Option<Turn>, DomainError> {
        let pending = self.submit(text).await?;
        self.drive(pending).await
    }

    /// Close the active stream, discarding its partial answer.
    pub fn cancel(&mut self) -> Option<StreamId> {
        let (stream, prompt) = self.ingestor.cancel()?;
        self.renderer.reset();
        self.presenter
            .present(SessionEvent::StreamCancelled { stream, prompt });
        Some(stream)
    }

    fn reject(&self, prompt: &str, error: DomainError) -> DomainError {
        if error.is_busy() {
            info!("Submission rejected: {}", error);
        } else {
            warn!("Submission failed: {}", error);
        }
        self.presenter.present(SessionEvent::Rejected {
            prompt: prompt.to_string(),
            error: error.clone(),
        });
        error
    }
}
