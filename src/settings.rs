//src/settings.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_TRAINER_NAME: &str = "Trainer";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Trainer name cannot be empty.")]
    EmptyTrainerName,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub trainer_name: String,
    // Keys this version does not know about are kept and written back unchanged.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            trainer_name: DEFAULT_TRAINER_NAME.to_string(),
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn set_trainer_name(&mut self, name: &str) -> Result<(), SettingsError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SettingsError::EmptyTrainerName);
        }
        self.trainer_name = name.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.trainer_name, "Trainer");
    }

    #[test]
    fn unknown_keys_survive_round_trip() {
        let settings: Settings =
            serde_json::from_str(r#"{"trainer_name": "Alex", "language": "de"}"#).unwrap();
        let written = serde_json::to_value(&settings).unwrap();
        assert_eq!(
            written,
            serde_json::json!({"trainer_name": "Alex", "language": "de"})
        );
    }

    #[test]
    fn trainer_name_is_trimmed() {
        let mut settings = Settings::default();
        settings.set_trainer_name("  Sam ").unwrap();
        assert_eq!(settings.trainer_name, "Sam");
        assert_eq!(
            settings.set_trainer_name(" "),
            Err(SettingsError::EmptyTrainerName)
        );
        assert_eq!(settings.trainer_name, "Sam");
    }
}
