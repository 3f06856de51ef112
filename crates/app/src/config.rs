use std::path::Path;

use biovox_ecg::EcgConfig;
use biovox_foundation::ConfigError;
use biovox_voice::{CommandMapping, VoiceConfig};
use serde::{Deserialize, Serialize};

/// Top-level configuration, aggregating every component's config into one
/// TOML-deserializable tree per §6's configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub device: Option<String>,
    pub templates_dir: String,
    pub command_mappings: Vec<CommandMapping>,
    pub log_retention_days: u64,
    pub voice: VoiceConfig,
    pub ecg: EcgConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device: None,
            templates_dir: "templates".to_string(),
            command_mappings: default_command_mappings(),
            log_retention_days: 7,
            voice: VoiceConfig::default(),
            ecg: EcgConfig::default(),
        }
    }
}

/// The source's own template bank ships filenames beginning with a spoken
/// word for each command; kept here as ordinary data rather than baked
/// into match logic so a deployment can ship its own vocabulary via config.
fn default_command_mappings() -> Vec<CommandMapping> {
    vec![
        CommandMapping { substring: "qidong".into(), command: "START".into() },
        CommandMapping { substring: "tiaoyue".into(), command: "JUMP".into() },
        CommandMapping { substring: "xiadun".into(), command: "DUCK".into() },
        CommandMapping { substring: "zuo".into(), command: "LEFT".into() },
        CommandMapping { substring: "you".into(), command: "RIGHT".into() },
        CommandMapping { substring: "tingzhi".into(), command: "STOP".into() },
    ]
}

impl AppConfig {
    /// Loads from `path` if given, else from `biovox.toml` in the current
    /// directory if it exists, else falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let candidate = path.map(|p| p.to_path_buf()).unwrap_or_else(|| Path::new("biovox.toml").to_path_buf());
        if !candidate.exists() {
            if path.is_some() {
                return Err(ConfigError::MissingField(format!(
                    "config file not found: {}",
                    candidate.display()
                )));
            }
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&candidate)?;
        let config: AppConfig = toml::from_str(&text)?;
        Ok(config)
    }
}
