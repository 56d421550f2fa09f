use futures::future::BoxFuture;
use rig::completion::{Chat, Message as RigMessage};
use rig::prelude::CompletionClient;
use rig::providers::openai;
use snafu::{ResultExt, ensure};
use tokio::sync::Mutex;

use super::provider::{
    AssistantService, EmptyPromptSnafu, EmptyResponseSnafu, HttpClientSnafu, MissingApiKeySnafu,
    PromptFailedSnafu, ProviderConfig, ProviderResult,
};

pub const RIG_OPENAI_PROVIDER_ID: &str = "openai";

/// OpenAI-compatible assistant backed by a rig agent.
///
/// The adapter keeps the running chat history itself so each `ask` only
/// carries the newest prompt across the seam.
pub struct RigAssistant {
    config: ProviderConfig,
    history: Mutex<Vec<RigMessage>>,
}

impl RigAssistant {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        ensure!(
            !config.api_key.is_empty(),
            MissingApiKeySnafu {
                stage: "rig-assistant-new",
                provider_id: config.provider_id.clone(),
            }
        );

        Ok(Self {
            config,
            history: Mutex::new(Vec::new()),
        })
    }

    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    fn build_client(config: &ProviderConfig) -> ProviderResult<openai::Client> {
        let mut builder = openai::Client::builder().api_key(config.api_key.as_str());
        if !config.endpoint.is_empty() {
            builder = builder.base_url(config.endpoint.as_str());
        }
        builder.build().context(HttpClientSnafu {
            stage: "build-client",
        })
    }

    async fn complete(&self, prompt: String) -> ProviderResult<String> {
        self.complete_with(prompt, |message, history| self.send_to_agent(message, history))
            .await
    }

    /// Runs one turn through `send` and records it in the history on success.
    ///
    /// `send` receives the new user message and a snapshot of prior turns.
    async fn complete_with<F, Fut>(&self, prompt: String, send: F) -> ProviderResult<String>
    where
        F: FnOnce(RigMessage, Vec<RigMessage>) -> Fut,
        Fut: Future<Output = ProviderResult<String>>,
    {
        ensure!(
            !prompt.trim().is_empty(),
            EmptyPromptSnafu {
                stage: "complete-check-prompt",
            }
        );

        // Snapshot so the lock is not held across the provider round trip.
        let history = self.history.lock().await.clone();
        let prior_turns = history.len();

        tracing::debug!(
            provider_id = %self.config.provider_id,
            model_id = %self.config.model_id,
            prior_turns,
            "sending completion request"
        );

        let reply = send(RigMessage::user(prompt.clone()), history).await?;

        ensure!(
            !reply.trim().is_empty(),
            EmptyResponseSnafu {
                stage: "complete-check-reply",
            }
        );

        let mut history = self.history.lock().await;
        history.push(RigMessage::user(prompt));
        history.push(RigMessage::assistant(reply.clone()));

        tracing::debug!(
            model_id = %self.config.model_id,
            reply_len = reply.len(),
            history_len = history.len(),
            "completion received"
        );

        Ok(reply)
    }

    async fn send_to_agent(
        &self,
        message: RigMessage,
        history: Vec<RigMessage>,
    ) -> ProviderResult<String> {
        let client = Self::build_client(&self.config)?;
        let mut builder = client.agent(self.config.model_id.clone());
        if !self.config.persona.is_empty() {
            builder = builder.preamble(self.config.persona.as_str());
        }
        let agent = builder.build();

        agent.chat(message, history).await.context(PromptFailedSnafu {
            stage: "agent-chat",
        })
    }
}

impl AssistantService for RigAssistant {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn ask(&self, prompt: String) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move {
            let result = self.complete(prompt).await;
            if let Err(error) = &result {
                tracing::warn!(
                    provider_id = %self.config.provider_id,
                    model_id = %self.config.model_id,
                    error = %error,
                    "assistant completion failed"
                );
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderError;

    fn config() -> ProviderConfig {
        ProviderConfig::new("openai", "sk-test", "", "", "You are Fish Coach.")
    }

    #[test]
    fn blank_model_falls_back_to_default() {
        let assistant = RigAssistant::new(config()).expect("adapter should build");
        assert_eq!(assistant.model_id(), crate::DEFAULT_OPENAI_MODEL);
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected_without_touching_history() {
        let assistant = RigAssistant::new(config()).expect("adapter should build");

        let result = assistant.ask("   \n".to_string()).await;

        assert!(matches!(result, Err(ProviderError::EmptyPrompt { .. })));
        assert_eq!(assistant.history_len().await, 0);
    }

    #[tokio::test]
    async fn successful_turns_are_appended_to_history() {
        let assistant = RigAssistant::new(config()).expect("adapter should build");

        let reply = assistant
            .complete_with("Best tide?".to_string(), |_, history| async move {
                assert!(history.is_empty());
                Ok("Incoming, two hours after low.".to_string())
            })
            .await
            .expect("scripted reply");
        assert_eq!(reply, "Incoming, two hours after low.");
        assert_eq!(assistant.history_len().await, 2);

        assistant
            .complete_with("And for bass?".to_string(), |_, history| async move {
                assert_eq!(history.len(), 2);
                Ok("Early morning on the flats.".to_string())
            })
            .await
            .expect("scripted reply");
        assert_eq!(assistant.history_len().await, 4);
    }

    #[tokio::test]
    async fn failed_or_blank_turns_leave_history_untouched() {
        let assistant = RigAssistant::new(config()).expect("adapter should build");

        let failed = assistant
            .complete_with("Best tide?".to_string(), |_, _| async {
                Err(ProviderError::EmptyResponse { stage: "scripted" })
            })
            .await;
        assert!(failed.is_err());

        let blank = assistant
            .complete_with("Best tide?".to_string(), |_, _| async {
                Ok("  \n".to_string())
            })
            .await;
        assert!(matches!(blank, Err(ProviderError::EmptyResponse { .. })));
        assert_eq!(assistant.history_len().await, 0);
    }
}
