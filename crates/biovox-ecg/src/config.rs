use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EcgConfig {
    pub port: Option<String>,
    pub baud: u32,
    pub sample_rate: u32,
    pub bpm_threshold: f32,
    pub bpm_recovery: f32,
    pub fallback_bpm: f32,
    pub no_signal_timeout_secs: f32,
    pub retry_interval_secs: f32,
}

impl Default for EcgConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: 115_200,
            sample_rate: 500,
            bpm_threshold: 40.0,
            bpm_recovery: 50.0,
            fallback_bpm: 75.0,
            no_signal_timeout_secs: 5.0,
            retry_interval_secs: 3.0,
        }
    }
}
