use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BioVoxError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ecg(#[from] EcgError),

    #[error(transparent)]
    Vad(#[from] VadError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("component failed health check: {component}")]
    HealthCheckFailed { component: String },

    #[error("shutdown requested")]
    ShutdownRequested,

    #[error("fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("transient error, will retry: {0}")]
    Transient(String),
}

impl From<tokio::task::JoinError> for BioVoxError {
    fn from(err: tokio::task::JoinError) -> Self {
        BioVoxError::Transient(format!("task join failed: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("Device disconnected")]
    DeviceDisconnected,

    #[error("Format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("Buffer overflow, dropped {count} samples")]
    BufferOverflow { count: usize },

    #[error("No audio data for {duration:?}")]
    NoDataTimeout { duration: Duration },

    #[error("Silence detected for {duration:?}")]
    SilenceDetected { duration: Duration },

    #[error("CPAL error: {0}")]
    Cpal(#[from] cpal::StreamError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("Supported stream configs error: {0}")]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),
}

#[derive(Debug, thiserror::Error)]
pub enum VadError {
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    #[error("invalid frame size: expected {expected}, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    #[error("segment too short for feature extraction: {n_samples} samples")]
    SegmentTooShort { n_samples: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum EcgError {
    #[error("serial port open failed: {port}: {reason}")]
    SerialOpenFailed { port: String, reason: String },

    #[error("no serial data for {duration:?}")]
    NoSignalTimeout { duration: Duration },

    #[error("failed to parse ECG line: {line:?}")]
    ParseError { line: String },

    #[error("no serial ports available")]
    NoPortsAvailable,
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("feature extraction failed: {0}")]
    FeatureExtraction(String),

    #[error("no templates loaded for method {method}")]
    NoTemplates { method: String },

    #[error("template file error: {path}: {reason}")]
    TemplateFile { path: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("dispatcher already running")]
    AlreadyRunning,

    #[error("dispatcher not running")]
    NotRunning,

    #[error("subscriber callback panicked: {0}")]
    SubscriberPanic(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("io error reading configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Device status events for monitoring audio device changes.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    DeviceAdded { name: String },
    DeviceRemoved { name: String },
    CurrentDeviceDisconnected { name: String },
    DeviceSwitched { from: Option<String>, to: String },
    DeviceSwitchFailed {
        attempted: String,
        fallback: Option<String>,
    },
    DeviceSwitchRequested { target: String },
}

/// Device status information.
#[derive(Debug, Clone)]
pub struct DeviceStatus {
    pub name: String,
    pub is_current: bool,
    pub is_available: bool,
    pub is_default: bool,
    pub last_seen: std::time::Instant,
}

#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay: Duration },
    Fallback { to: String },
    Restart,
    Ignore,
    Fatal,
}

impl BioVoxError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            BioVoxError::Audio(AudioError::DeviceDisconnected) => RecoveryStrategy::Retry {
                max_attempts: 5,
                delay: Duration::from_secs(2),
            },
            BioVoxError::Audio(AudioError::DeviceNotFound { .. }) => RecoveryStrategy::Fallback {
                to: "default".into(),
            },
            BioVoxError::Audio(AudioError::BufferOverflow { .. }) => RecoveryStrategy::Ignore,
            BioVoxError::Ecg(EcgError::SerialOpenFailed { .. }) => {
                RecoveryStrategy::Fallback { to: "synthetic".into() }
            }
            BioVoxError::Ecg(EcgError::NoSignalTimeout { .. }) => {
                RecoveryStrategy::Fallback { to: "synthetic".into() }
            }
            BioVoxError::Ecg(EcgError::ParseError { .. }) => RecoveryStrategy::Ignore,
            BioVoxError::Vad(VadError::SegmentTooShort { .. }) => RecoveryStrategy::Ignore,
            BioVoxError::Bus(BusError::SubscriberPanic(_)) => RecoveryStrategy::Ignore,
            BioVoxError::Fatal(_) | BioVoxError::ShutdownRequested => RecoveryStrategy::Fatal,
            _ => RecoveryStrategy::Restart,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AudioConfig {
    pub silence_threshold: i16,
    /// Ring buffer capacity in samples. At 16kHz mono, 8000 samples = 500ms,
    /// the pre-roll window the VAD needs to recover before onset.
    pub capture_buffer_samples: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 100,
            capture_buffer_samples: 8_000,
        }
    }
}
