use futures::future::BoxFuture;
use snafu::Snafu;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Connection and persona settings for one assistant backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider_id: String,
    pub api_key: String,
    pub endpoint: String,
    pub model_id: String,
    /// System instruction sent with every completion.
    pub persona: String,
}

impl ProviderConfig {
    pub fn new(
        provider_id: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model_id: impl Into<String>,
        persona: impl Into<String>,
    ) -> Self {
        let model_id = model_id.into().trim().to_string();
        Self {
            provider_id: provider_id.into().trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            endpoint: endpoint.into().trim().to_string(),
            model_id: if model_id.is_empty() {
                DEFAULT_OPENAI_MODEL.to_string()
            } else {
                model_id
            },
            persona: persona.into().trim().to_string(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProviderError {
    #[snafu(display("missing API key for provider '{provider_id}'"))]
    MissingApiKey {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("provider '{provider_id}' is not supported"))]
    UnsupportedProvider {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("refusing to send a blank prompt on `{stage}`"))]
    EmptyPrompt { stage: &'static str },
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    HttpClient {
        stage: &'static str,
        source: rig::http_client::Error,
    },
    #[snafu(display("completion failed on `{stage}`, {source}"))]
    PromptFailed {
        stage: &'static str,
        source: rig::completion::PromptError,
    },
    #[snafu(display("provider returned a blank completion on `{stage}`"))]
    EmptyResponse { stage: &'static str },
}

/// Opaque asynchronous completion call: prompt text in, reply text out.
///
/// Implementations own whatever conversational context the backend needs;
/// callers only see one prompt and one reply per call.
pub trait AssistantService: Send + Sync {
    fn id(&self) -> &str;
    fn model_id(&self) -> &str;
    fn ask(&self, prompt: String) -> BoxFuture<'_, ProviderResult<String>>;
}
