//! Integration tests for the session runtime task.
//!
//! Commands and stream events must be applied strictly in arrival order, and
//! a cancelled stream must never bleed into the next one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use chatstream::{
    ChannelPresenter, ChatSession, DomainError, ScriptedChatClient, SessionCommand, SessionEvent,
    SessionRuntime, Turn,
};

fn spawn(client: ScriptedChatClient) -> (SessionRuntime, UnboundedReceiver<SessionEvent>) {
    let (presenter, events) = ChannelPresenter::new();
    let session = ChatSession::new(Arc::new(client), "test-model", Arc::new(presenter));
    (SessionRuntime::spawn(session), events)
}

/// Collect events until `stop` matches one, failing after a generous timeout.
async fn collect_until(
    events: &mut UnboundedReceiver<SessionEvent>,
    stop: impl Fn(&SessionEvent) -> bool,
) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("session task stopped");
        let done = stop(&event);
        out.push(event);
        if done {
            return out;
        }
    }
}

#[tokio::test]
async fn test_submit_streams_to_completion() {
    let (runtime, mut events) = spawn(ScriptedChatClient::new(["Hello ", "from ", "the ", "model"]));

    assert!(runtime.send(SessionCommand::Submit("hi".into())));
    let seen = collect_until(&mut events, |e| matches!(e, SessionEvent::TranscriptUpdated(_))).await;

    assert!(matches!(seen.first(), Some(SessionEvent::StreamStarted { .. })));
    assert!(seen.iter().any(|e| matches!(
        e,
        SessionEvent::StreamCompleted { turn, .. } if turn.content() == "Hello from the model"
    )));
    match seen.last() {
        Some(SessionEvent::TranscriptUpdated(turns)) => {
            assert_eq!(turns, &vec![Turn::user("hi"), Turn::assistant("Hello from the model")]);
        }
        other => panic!("unexpected last event: {other:?}"),
    }

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_second_submit_while_streaming_is_rejected() {
    let client = ScriptedChatClient::new(["slow ", "answer "]).with_delay(Duration::from_millis(200));
    let (runtime, mut events) = spawn(client);

    runtime.send(SessionCommand::Submit("first".into()));
    runtime.send(SessionCommand::Submit("second".into()));

    let seen = collect_until(&mut events, |e| matches!(e, SessionEvent::Rejected { .. })).await;
    match seen.last() {
        Some(SessionEvent::Rejected { prompt, error }) => {
            assert_eq!(prompt, "second");
            assert!(error.is_busy());
        }
        other => panic!("unexpected event: {other:?}"),
    }

    runtime.send(SessionCommand::Cancel);
    collect_until(&mut events, |e| matches!(e, SessionEvent::StreamCancelled { .. })).await;
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_cancel_then_submit_replaces_the_stream() {
    let client = ScriptedChatClient::new(["one ", "two ", "three ", "four "])
        .with_delay(Duration::from_millis(50));
    let (runtime, mut events) = spawn(client);

    runtime.send(SessionCommand::Submit("first".into()));
    runtime.send(SessionCommand::Cancel);
    runtime.send(SessionCommand::Submit("second".into()));

    let seen = collect_until(&mut events, |e| matches!(e, SessionEvent::TranscriptUpdated(_))).await;

    let started: Vec<_> = seen
        .iter()
        .filter_map(|e| match e {
            SessionEvent::StreamStarted { stream, prompt } => Some((*stream, prompt.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(started.len(), 2);
    assert_eq!(started[0].1, Turn::user("first"));
    assert_eq!(started[1].1, Turn::user("second"));

    let (first_stream, second_stream) = (started[0].0, started[1].0);
    assert!(seen.iter().any(|e| matches!(
        e,
        SessionEvent::StreamCancelled { stream, .. } if *stream == first_stream
    )));
    for event in &seen {
        if let SessionEvent::ChunksRevealed { stream, .. } = event {
            assert_eq!(*stream, second_stream, "cancelled stream revealed chunks");
        }
    }

    match seen.last() {
        Some(SessionEvent::TranscriptUpdated(turns)) => {
            assert_eq!(
                turns,
                &vec![Turn::user("second"), Turn::assistant("one two three four ")]
            );
        }
        other => panic!("unexpected last event: {other:?}"),
    }

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_failure_returns_session_to_idle() {
    let client = ScriptedChatClient::new(["a ", "b ", "c "])
        .fail_after(1, DomainError::transport("connection reset"));
    let (runtime, mut events) = spawn(client);

    runtime.send(SessionCommand::Submit("first".into()));
    let seen = collect_until(&mut events, |e| matches!(e, SessionEvent::StreamFailed { .. })).await;
    assert!(matches!(
        seen.last(),
        Some(SessionEvent::StreamFailed { error: DomainError::Transport(_), .. })
    ));

    // Idle again: a new submission is accepted rather than rejected as busy.
    runtime.send(SessionCommand::Submit("retry".into()));
    let seen = collect_until(&mut events, |e| {
        matches!(e, SessionEvent::StreamStarted { .. } | SessionEvent::Rejected { .. })
    })
    .await;
    assert!(matches!(seen.last(), Some(SessionEvent::StreamStarted { .. })));

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_slow_connection_does_not_block_commands() {
    let client = ScriptedChatClient::new(["never ", "seen "])
        .with_connect_delay(Duration::from_secs(30));
    let (runtime, mut events) = spawn(client);

    runtime.send(SessionCommand::Submit("first".into()));
    runtime.send(SessionCommand::Submit("second".into()));

    let seen = collect_until(&mut events, |e| matches!(e, SessionEvent::Rejected { .. })).await;
    assert!(matches!(seen.first(), Some(SessionEvent::StreamStarted { .. })));
    assert!(matches!(
        seen.last(),
        Some(SessionEvent::Rejected { prompt, error }) if prompt == "second" && error.is_busy()
    ));

    runtime.send(SessionCommand::Cancel);
    let seen = collect_until(&mut events, |e| matches!(e, SessionEvent::StreamCancelled { .. })).await;
    assert!(matches!(
        seen.last(),
        Some(SessionEvent::StreamCancelled { prompt, .. }) if *prompt == Turn::user("first")
    ));

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_server_fails_the_started_stream() {
    let (runtime, mut events) = spawn(ScriptedChatClient::unreachable());

    runtime.send(SessionCommand::Submit("hello".into()));
    let seen = collect_until(&mut events, |e| matches!(e, SessionEvent::StreamFailed { .. })).await;

    match seen.last() {
        Some(SessionEvent::StreamFailed { prompt, error, .. }) => {
            assert_eq!(prompt, &Turn::user("hello"));
            assert!(error.is_transport());
        }
        other => panic!("unexpected event: {other:?}"),
    }

    runtime.shutdown().await;
}
