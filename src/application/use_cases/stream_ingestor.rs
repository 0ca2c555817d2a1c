use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info, warn};

use crate::application::{ChatClient, FragmentStream};
use crate::domain::{ChatRequest, DomainError, StreamBuffer, StreamId, Turn};

/// Handle over one in-flight stream. Cloning shares the same cancellation.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    id: StreamId,
    cancel: CancellationToken,
}

impl StreamHandle {
    fn new() -> Self {
        Self {
            id: StreamId::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Close the handle. Whoever is pulling fragments stops at the next
    /// suspension point and drops the underlying stream.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}

/// A stream reserved by [`StreamIngestor::begin`] whose call has not been
/// established yet. Opening it needs no access to the ingestor, so it can run
/// on another task.
pub struct StreamOpening {
    handle: StreamHandle,
    client: Arc<dyn ChatClient>,
    request: ChatRequest,
}

impl StreamOpening {
    pub fn handle(&self) -> &StreamHandle {
        &self.handle
    }

    /// Establish the call with the inference service.
    pub async fn open(self) -> Result<(StreamHandle, FragmentStream), DomainError> {
        let StreamOpening {
            handle,
            client,
            request,
        } = self;
        let model = request.model.clone();
        let fragments = client.chat(request).await?;
        info!(
            "Stream {} opened on {} (model {})",
            handle.id(),
            client.name(),
            model
        );
        Ok((handle, fragments))
    }
}

struct ActiveStream {
    handle: StreamHandle,
    prompt: Turn,
    buffer: StreamBuffer,
}

/// Accumulates the fragments of at most one stream at a time.
///
/// `start` (or `begin` followed by [`StreamOpening::open`]) opens the stream,
/// `on_fragment` is the only writer of the buffer,
/// and exactly one of `on_complete`, `on_error` or `cancel` ends it. Calls
/// naming a stream other than the active one are ignored.
pub struct StreamIngestor {
    client: Arc<dyn ChatClient>,
    model: String,
    active: Option<ActiveStream>,
}

impl StreamIngestor {
    pub fn new(client: Arc<dyn ChatClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            active: None,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_stream(&self) -> Option<StreamId> {
        self.active.as_ref().map(|a| a.handle.id())
    }

    pub fn buffer(&self) -> Option<&StreamBuffer> {
        self.active.as_ref().map(|a| &a.buffer)
    }

    /// Open a stream for `turn`.
    ///
    /// Fails with `Busy` while another stream is active (its buffer is left
    /// untouched), or with the client's error if the call cannot be
    /// established. A failed call leaves the ingestor idle.
    pub async fn start(&mut self, turn: Turn) -> Result<(StreamHandle, FragmentStream), DomainError> {
        let opening = self.begin(turn)?;
        let stream = opening.handle().id();
        match opening.open().await {
            Ok(opened) => Ok(opened),
            Err(e) => {
                self.abandon(stream);
                Err(e)
            }
        }
    }

    /// Reserve the stream for `turn` without contacting the service.
    ///
    /// From here the ingestor is busy and accepts fragments for the new
    /// stream. If opening fails, report it through [`on_error`](Self::on_error).
    pub fn begin(&mut self, turn: Turn) -> Result<StreamOpening, DomainError> {
        if let Some(active) = &self.active {
            return Err(DomainError::busy(format!(
                "stream {} is still active; cancel it before submitting again",
                active.handle.id()
            )));
        }

        let handle = StreamHandle::new();
        debug!("Stream {} reserved", handle.id());
        self.active = Some(ActiveStream {
            handle: handle.clone(),
            prompt: turn.clone(),
            buffer: StreamBuffer::new(),
        });

        Ok(StreamOpening {
            handle,
            client: Arc::clone(&self.client),
            request: ChatRequest::streaming(&self.model, turn),
        })
    }

    /// Append `fragment` to the active buffer and return the new snapshot.
    pub fn on_fragment(&mut self, stream: StreamId, fragment: &str) -> Option<&StreamBuffer> {
        let active = self.active_for(stream)?;
        active.buffer.append(fragment);
        debug!(
            "Stream {} fragment #{} ({} bytes buffered)",
            stream,
            active.buffer.fragment_count(),
            active.buffer.len()
        );
        Some(&active.buffer)
    }

    /// Freeze the buffer into an assistant turn. Returns the prompt and the
    /// answer.
    pub fn on_complete(&mut self, stream: StreamId) -> Option<(Turn, Turn)> {
        self.active_for(stream)?;
        let active = self.active.take()?;
        info!(
            "Stream {} completed: {} fragments, {} words",
            stream,
            active.buffer.fragment_count(),
            active.buffer.word_count()
        );
        Some((active.prompt, Turn::assistant(active.buffer.into_string())))
    }

    /// Discard the buffer. Returns the prompt so it can be handed back.
    pub fn on_error(&mut self, stream: StreamId, error: &DomainError) -> Option<Turn> {
        self.active_for(stream)?;
        let active = self.active.take()?;
        warn!(
            "Stream {} failed after {} bytes, discarding partial output: {}",
            stream,
            active.buffer.len(),
            error
        );
        Some(active.prompt)
    }

    /// Close the active handle and discard its buffer.
    pub fn cancel(&mut self) -> Option<(StreamId, Turn)> {
        let active = self.active.take()?;
        active.handle.cancel();
        info!(
            "Stream {} cancelled, discarding {} bytes",
            active.handle.id(),
            active.buffer.len()
        );
        Some((active.handle.id(), active.prompt))
    }

    fn abandon(&mut self, stream: StreamId) {
        if self.active_for(stream).is_some() {
            self.active = None;
        }
    }

    fn active_for(&mut self, stream: StreamId) -> Option<&mut ActiveStream> {
        match self.active.as_mut() {
            Some(active) if active.handle.id() == stream => Some(active),
            _ => {
                debug!("Ignoring event for inactive stream {}", stream);
                None
            }
        }
    }
}
