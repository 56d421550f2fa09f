pub mod state;

pub use state::{CoachSettings, SettingsError, SettingsStore};
