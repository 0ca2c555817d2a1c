use std::collections::VecDeque;
use std::fmt::Display;

use futures_util::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::application::FragmentStream;
use crate::domain::DomainError;

/// Splits a byte stream into complete lines. Bytes are only decoded once a
/// whole line is present, so multi-byte characters split across network
/// reads survive intact.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    /// Whatever is left once the input has ended.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// One line of a streamed `/api/chat` response.
#[derive(Debug, Deserialize)]
struct ChatLine {
    #[serde(default)]
    message: Option<LineMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LineMessage {
    #[serde(default)]
    content: String,
}

struct DecodeState<S> {
    body: std::pin::Pin<Box<S>>,
    lines: LineBuffer,
    ready: VecDeque<Result<String, DomainError>>,
    done: bool,
    failed: bool,
}

impl<S> DecodeState<S> {
    fn finished(&self) -> bool {
        self.done || self.failed
    }

    fn fail(&mut self, error: DomainError) {
        self.failed = true;
        self.ready.push_back(Err(error));
    }

    fn consume(&mut self, line: &str) {
        if self.finished() {
            return;
        }
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let parsed: ChatLine = match serde_json::from_str(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.fail(DomainError::model(format!("malformed stream line: {e}")));
                return;
            }
        };

        if let Some(error) = parsed.error {
            self.fail(DomainError::model(error));
            return;
        }

        if let Some(message) = parsed.message {
            if !message.content.is_empty() {
                self.ready.push_back(Ok(message.content));
            }
        }

        if parsed.done {
            debug!("Chat stream reported done");
            self.done = true;
        }
    }
}

/// Turn a newline-delimited JSON chat body into a [`FragmentStream`].
///
/// Body read failures surface as `Transport`; error lines, unparseable lines
/// and a body that ends before `"done": true` surface as `Model`. Nothing is
/// read after the first terminal line.
pub(crate) fn decode_chat_stream<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        lines: LineBuffer::default(),
        ready: VecDeque::new(),
        done: false,
        failed: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.finished() {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    for line in state.lines.push(bytes.as_ref()) {
                        state.consume(&line);
                    }
                }
                Some(Err(e)) => {
                    state.fail(DomainError::transport(format!("stream interrupted: {e}")));
                }
                None => {
                    if let Some(line) = state.lines.finish() {
                        state.consume(&line);
                    }
                    if !state.finished() {
                        state.fail(DomainError::model("stream ended before completion"));
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Send + 'static {
        let owned: Vec<Result<Vec<u8>, std::io::Error>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(owned)
    }

    async fn decode(parts: &[&str]) -> Vec<Result<String, DomainError>> {
        decode_chat_stream(body(parts)).collect().await
    }

    #[test]
    fn line_buffer_joins_split_lines() {
        let mut lines = LineBuffer::default();
        assert!(lines.push(b"{\"a\":").is_empty());
        assert_eq!(lines.push(b"1}\n{\"b\""), vec!["{\"a\":1}"]);
        assert_eq!(lines.finish(), Some("{\"b\"".to_string()));
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn line_buffer_keeps_multibyte_chars_split_across_reads() {
        let mut lines = LineBuffer::default();
        let text = "héllo\n".as_bytes();
        assert!(lines.push(&text[..2]).is_empty());
        assert_eq!(lines.push(&text[2..]), vec!["héllo"]);
    }

    #[tokio::test]
    async fn yields_message_contents_until_done() {
        let items = decode(&[
            "{\"message\":{\"role\":\"assistant\",\"content\":\"The \"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"quick\"},\"done\":false}\n{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"ignored\"},\"done\":false}\n",
        ])
        .await;

        assert_eq!(items, vec![Ok("The ".to_string()), Ok("quick".to_string())]);
    }

    #[tokio::test]
    async fn final_line_without_newline_is_parsed() {
        let items = decode(&[
            "{\"message\":{\"content\":\"hi\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"\"},\"done\":true}",
        ])
        .await;

        assert_eq!(items, vec![Ok("hi".to_string())]);
    }

    #[tokio::test]
    async fn error_line_is_a_model_error() {
        let items = decode(&[
            "{\"message\":{\"content\":\"Partial \"},\"done\":false}\n",
            "{\"error\":\"model crashed\"}\n",
        ])
        .await;

        assert_eq!(
            items,
            vec![
                Ok("Partial ".to_string()),
                Err(DomainError::model("model crashed"))
            ]
        );
    }

    #[tokio::test]
    async fn garbage_line_is_a_model_error() {
        let items = decode(&["not json\n"]).await;
        assert_eq!(items.len(), 1);
        assert!(items[0].as_ref().unwrap_err().is_model());
    }

    #[tokio::test]
    async fn truncated_body_is_a_model_error() {
        let items = decode(&["{\"message\":{\"content\":\"Partial resul\"},\"done\":false}\n"]).await;
        assert_eq!(items.len(), 2);
        assert!(items[1].as_ref().unwrap_err().is_model());
    }

    #[tokio::test]
    async fn read_failure_is_a_transport_error() {
        let parts: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"{\"message\":{\"content\":\"a \"},\"done\":false}\n".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let items: Vec<_> = decode_chat_stream(stream::iter(parts)).collect().await;

        assert_eq!(items[0], Ok("a ".to_string()));
        assert!(items[1].as_ref().unwrap_err().is_transport());
        assert_eq!(items.len(), 2);
    }
}
