use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::application::ChatSession;
use crate::domain::StreamEvent;

/// Requests from a front end to its session task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Submit(String),
    Cancel,
}

/// Runs a [`ChatSession`] on its own task.
///
/// Commands and stream events are handled one at a time, in arrival order,
/// so the session stays the only writer of its state. Nothing here waits on
/// the network: establishing the call and pumping its fragments happen on
/// separate tasks that only forward tagged events back here.
pub struct SessionRuntime {
    commands: mpsc::UnboundedSender<SessionCommand>,
    task: JoinHandle<()>,
}

impl SessionRuntime {
    pub fn spawn(session: ChatSession) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_session(session, rx));
        Self { commands, task }
    }

    /// Queue a command. Returns `false` once the session task has stopped.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Cancel any active stream and wait for the session task to finish.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(e) = self.task.await {
            debug!("Session task ended abnormally: {}", e);
        }
    }
}

async fn run_session(mut session: ChatSession, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
    let (stream_tx, mut stream_rx) = mpsc::unbounded_channel::<StreamEvent>();
    info!("Session started (model {})", session.model());

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::Submit(text)) => {
                    if let Ok(opening) = session.begin(&text) {
                        tokio::spawn(opening.forward(stream_tx.clone()));
                    }
                }
                Some(SessionCommand::Cancel) => {
                    session.cancel();
                }
                None => {
                    session.cancel();
                    break;
                }
            },
            Some(event) = stream_rx.recv() => {
                session.apply(event);
            }
        }
    }

    info!("Session ended with {} turns", session.transcript().len());
}
