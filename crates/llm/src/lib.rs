use std::sync::Arc;

mod provider;
mod rig_adapter;

pub use provider::{
    AssistantService, DEFAULT_OPENAI_MODEL, ProviderConfig, ProviderError, ProviderResult,
};
pub use rig_adapter::{RIG_OPENAI_PROVIDER_ID, RigAssistant};

/// Builds the assistant backend named by `config.provider_id`.
///
/// A blank provider id selects the rig OpenAI-compatible adapter.
pub fn create_provider(mut config: ProviderConfig) -> ProviderResult<Arc<dyn AssistantService>> {
    if config.provider_id.trim().is_empty() {
        config.provider_id = RIG_OPENAI_PROVIDER_ID.to_string();
    }

    match config.provider_id.as_str() {
        "openai" | "rig-openai" => {
            config.provider_id = RIG_OPENAI_PROVIDER_ID.to_string();
            Ok(Arc::new(RigAssistant::new(config)?))
        }
        _ => Err(ProviderError::UnsupportedProvider {
            stage: "create-provider",
            provider_id: config.provider_id,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_provider_id_selects_rig_openai() {
        let config = ProviderConfig::new("  ", "sk-test", "", "gpt-4o-mini", "persona");
        let provider = create_provider(config).expect("provider should build");
        assert_eq!(provider.id(), RIG_OPENAI_PROVIDER_ID);
        assert_eq!(provider.model_id(), "gpt-4o-mini");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = ProviderConfig::new("carrier-pigeon", "sk-test", "", "m", "persona");
        let Err(error) = create_provider(config) else {
            panic!("unknown provider must not build");
        };
        assert!(matches!(
            error,
            ProviderError::UnsupportedProvider { ref provider_id, .. } if provider_id == "carrier-pigeon"
        ));
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let config = ProviderConfig::new("openai", "   ", "", "m", "persona");
        assert!(matches!(
            create_provider(config),
            Err(ProviderError::MissingApiKey { .. })
        ));
    }
}
