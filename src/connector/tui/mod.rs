//! Interactive terminal chat.

mod app;
mod ui;

pub use app::*;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyEventKind};
use futures_util::StreamExt;
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;
use tracing::info;

use crate::connector::{ChannelPresenter, Container, SessionRuntime};
use crate::domain::SessionEvent;

/// Redraw interval while a fade is in progress (~30 fps).
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

fn setup_panic_hook() {
    let original = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        original(info);
    }));
}

/// Run the chat UI until the user quits.
pub async fn run(container: &Container) -> Result<()> {
    let (presenter, mut session_events) = ChannelPresenter::new();
    let runtime = SessionRuntime::spawn(container.session(Arc::new(presenter)));
    let mut app = App::new(container.model(), container.backend());

    setup_panic_hook();
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut app, &runtime, &mut session_events).await;
    ratatui::restore();

    runtime.shutdown().await;
    info!("Chat closed with {} turns", app.transcript.len());
    result
}

async fn event_loop(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    runtime: &SessionRuntime,
    session_events: &mut mpsc::UnboundedReceiver<SessionEvent>,
) -> Result<()> {
    let mut keys = EventStream::new();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        tokio::select! {
            event = keys.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if let Some(command) = app.handle_key(key) {
                        if !runtime.send(command) {
                            break;
                        }
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(event) = session_events.recv() => {
                app.handle_session_event(event);
            }
            _ = frames.tick(), if app.is_animating(std::time::Instant::now()) => {}
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
