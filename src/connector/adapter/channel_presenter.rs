use tokio::sync::mpsc;
use tracing::debug;

use crate::application::Presenter;
use crate::domain::SessionEvent;

/// Forwards session events over an unbounded channel, typically to a UI
/// loop running elsewhere.
pub struct ChannelPresenter {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelPresenter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Presenter for ChannelPresenter {
    fn present(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            debug!("Presentation channel closed; dropping event");
        }
    }
}
