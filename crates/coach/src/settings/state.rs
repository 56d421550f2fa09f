use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use fishcoach_llm::{DEFAULT_OPENAI_MODEL, ProviderConfig};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::chat::DEFAULT_PERSONA;

pub const DEFAULT_PROVIDER_ID: &str = "openai";
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_REPLY_TIMEOUT_SECS: u64 = 30;
pub const SETTINGS_DIRECTORY_NAME: &str = "fishcoach";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "FISHCOACH_";
/// Conventional key variable, used only when nothing else configured a key.
pub const FALLBACK_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachSettings {
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// System instruction for the assistant. Deployments may override it.
    #[serde(default = "default_persona")]
    pub persona: String,
    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: u64,
}

impl Default for CoachSettings {
    fn default() -> Self {
        Self {
            provider_id: default_provider_id(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            model: default_model(),
            persona: default_persona(),
            reply_timeout_secs: default_reply_timeout_secs(),
        }
    }
}

impl CoachSettings {
    pub fn to_provider_config(&self) -> Option<ProviderConfig> {
        if !self.is_valid() {
            return None;
        }

        Some(ProviderConfig::new(
            &self.provider_id,
            &self.api_key,
            &self.endpoint,
            &self.model,
            &self.persona,
        ))
    }

    pub fn is_valid(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }

    pub fn normalized(mut self) -> Self {
        self.provider_id = non_blank_or(self.provider_id, default_provider_id);
        self.api_key = self.api_key.trim().to_string();
        self.endpoint = non_blank_or(self.endpoint, default_endpoint);
        self.model = non_blank_or(self.model, default_model);
        self.persona = non_blank_or(self.persona, default_persona);
        if self.reply_timeout_secs == 0 {
            self.reply_timeout_secs = default_reply_timeout_secs();
        }
        self
    }

    fn with_api_key_fallback(mut self) -> Self {
        if self.api_key.trim().is_empty()
            && let Ok(api_key) = std::env::var(FALLBACK_API_KEY_ENV)
        {
            self.api_key = api_key.trim().to_string();
        }
        self
    }
}

pub struct SettingsStore {
    settings: CoachSettings,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".fishcoach"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from(&config_path);
        Self {
            settings,
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> &CoachSettings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Defaults, then the JSON file (if present), then `FISHCOACH_*` variables.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(CoachSettings::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn try_load_from(path: &Path) -> Result<CoachSettings, SettingsError> {
        let settings = Self::figment(path)
            .extract::<CoachSettings>()
            .context(ExtractSnafu {
                stage: "extract-settings",
                path: path.to_path_buf(),
            })?;
        Ok(settings.with_api_key_fallback().normalized())
    }

    /// Like [`Self::try_load_from`] but never fails.
    ///
    /// A layer that cannot be parsed is dropped on its own: a broken file
    /// still honors `FISHCOACH_*` variables, and a broken variable still
    /// honors the file. Only when both are unusable do defaults apply.
    pub fn load_from(path: &Path) -> CoachSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }

        let error = match Self::try_load_from(path) {
            Ok(settings) => return settings,
            Err(error) => error,
        };

        let defaults = || Figment::from(Serialized::defaults(CoachSettings::default()));
        let fallbacks = [
            ("environment only", defaults().merge(Env::prefixed(ENV_PREFIX))),
            ("settings file only", defaults().merge(Json::file(path))),
        ];

        for (layers, figment) in fallbacks {
            if let Ok(settings) = figment.extract::<CoachSettings>() {
                tracing::warn!("{error}. using {layers}");
                return settings.with_api_key_fallback().normalized();
            }
        }

        tracing::warn!("{error}. using defaults");
        CoachSettings::default().with_api_key_fallback().normalized()
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to load settings from {path:?} on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        path: PathBuf,
        #[snafu(source(from(figment::Error, Box::new)))]
        source: Box<figment::Error>,
    },
}

fn non_blank_or(value: String, default: fn() -> String) -> String {
    let value = value.trim();
    if value.is_empty() {
        default()
    } else {
        value.to_string()
    }
}

fn default_provider_id() -> String {
    DEFAULT_PROVIDER_ID.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}

fn default_persona() -> String {
    DEFAULT_PERSONA.to_string()
}

fn default_reply_timeout_secs() -> u64 {
    DEFAULT_REPLY_TIMEOUT_SECS
}
