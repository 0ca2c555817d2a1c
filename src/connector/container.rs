use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::application::{ChatClient, ChatSession, Presenter};
use crate::connector::{OllamaClient, ScriptedChatClient};
use crate::domain::FadeIn;

/// Pause between scripted fragments so `--mock` looks like a live stream.
const MOCK_FRAGMENT_DELAY: Duration = Duration::from_millis(60);

pub struct ContainerConfig {
    /// Base URL of the inference server. `None` reads `OLLAMA_HOST`.
    pub base_url: Option<String>,
    /// Model name. `None` reads `OLLAMA_MODEL`.
    pub model: Option<String>,
    /// Use the scripted client instead of a real server.
    pub mock: bool,
    /// Duration of each chunk's fade-in.
    pub fade_ms: u64,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: None,
            mock: false,
            fade_ms: FadeIn::DEFAULT_MILLIS,
        }
    }
}

/// Builds the chat backend once and hands out sessions wired to it.
pub struct Container {
    client: Arc<dyn ChatClient>,
    model: String,
    fade: FadeIn,
}

impl Container {
    pub fn new(config: ContainerConfig) -> Self {
        let client: Arc<dyn ChatClient> = if config.mock {
            debug!("Using scripted chat client");
            Arc::new(ScriptedChatClient::echo().with_delay(MOCK_FRAGMENT_DELAY))
        } else {
            let base_url = config
                .base_url
                .unwrap_or_else(OllamaClient::configured_base_url);
            debug!("Using Ollama at {}", base_url);
            Arc::new(OllamaClient::new(base_url))
        };

        let model = config.model.unwrap_or_else(OllamaClient::configured_model);

        Self {
            client,
            model,
            fade: FadeIn::from_millis(config.fade_ms),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn backend(&self) -> &str {
        self.client.name()
    }

    pub fn session(&self, presenter: Arc<dyn Presenter>) -> ChatSession {
        ChatSession::new(self.client.clone(), self.model.clone(), presenter).with_fade(self.fade)
    }
}
