use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tracing::debug;

use crate::application::{ChatClient, FragmentStream};
use crate::domain::{ChatRequest, DomainError};

enum Script {
    Fixed(Vec<String>),
    Echo,
}

/// A [`ChatClient`] that replays a fixed fragment script instead of calling a
/// model. Backs `--mock` and the tests.
pub struct ScriptedChatClient {
    script: Script,
    delay: Duration,
    connect_delay: Duration,
    failure: Option<(usize, DomainError)>,
    reachable: bool,
}

impl ScriptedChatClient {
    /// Reply with exactly `fragments`, in order, for every request.
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Script::Fixed(fragments.into_iter().map(Into::into).collect()),
            delay: Duration::ZERO,
            connect_delay: Duration::ZERO,
            failure: None,
            reachable: true,
        }
    }

    /// Reply with a canned answer quoting the prompt, one word per fragment.
    pub fn echo() -> Self {
        Self {
            script: Script::Echo,
            delay: Duration::ZERO,
            connect_delay: Duration::ZERO,
            failure: None,
            reachable: true,
        }
    }

    /// Fail every call as if no server were listening.
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new(Vec::<String>::new())
        }
    }

    /// Sleep this long before each fragment.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sleep this long before answering the call, like a slow server.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Yield `fragments` items, then `error` instead of the rest.
    pub fn fail_after(mut self, fragments: usize, error: DomainError) -> Self {
        self.failure = Some((fragments, error));
        self
    }

    fn fragments_for(&self, request: &ChatRequest) -> Vec<String> {
        match &self.script {
            Script::Fixed(fragments) => fragments.clone(),
            Script::Echo => {
                let reply = format!(
                    "You asked: \"{}\". This is a scripted reply from {}, streamed one word at a time.",
                    request.prompt(),
                    request.model
                );
                reply.split_inclusive(' ').map(str::to_string).collect()
            }
        }
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<FragmentStream, DomainError> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if !self.reachable {
            return Err(DomainError::transport(
                "ScriptedChatClient: connection refused",
            ));
        }

        let mut items: Vec<Result<String, DomainError>> = self
            .fragments_for(&request)
            .into_iter()
            .map(Ok)
            .collect();

        if let Some((after, error)) = &self.failure {
            items.truncate(*after);
            items.push(Err(error.clone()));
        }

        debug!("Scripted reply with {} items", items.len());

        let delay = self.delay;
        if delay.is_zero() {
            Ok(stream::iter(items).boxed())
        } else {
            Ok(stream::iter(items)
                .then(move |item| async move {
                    tokio::time::sleep(delay).await;
                    item
                })
                .boxed())
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Turn;

    async fn collect(client: &ScriptedChatClient, prompt: &str) -> Vec<Result<String, DomainError>> {
        let request = ChatRequest::streaming("mock", Turn::user(prompt));
        client.chat(request).await.unwrap().collect().await
    }

    #[tokio::test]
    async fn replays_fixed_script() {
        let client = ScriptedChatClient::new(["a ", "b"]);
        let items = collect(&client, "ignored").await;
        assert_eq!(items, vec![Ok("a ".to_string()), Ok("b".to_string())]);
    }

    #[tokio::test]
    async fn echo_quotes_the_prompt() {
        let client = ScriptedChatClient::echo();
        let text: String = collect(&client, "why?")
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert!(text.starts_with("You asked: \"why?\"."));
    }

    #[tokio::test]
    async fn failure_replaces_the_tail() {
        let client = ScriptedChatClient::new(["one ", "two ", "three "])
            .fail_after(1, DomainError::model("boom"));
        let items = collect(&client, "x").await;
        assert_eq!(
            items,
            vec![Ok("one ".to_string()), Err(DomainError::model("boom"))]
        );
    }

    #[tokio::test]
    async fn unreachable_fails_to_open() {
        let client = ScriptedChatClient::unreachable();
        let request = ChatRequest::streaming("mock", Turn::user("x"));
        let err = client.chat(request).await.err().unwrap();
        assert!(err.is_transport());
    }
}
