pub mod config;
pub mod constants;
pub mod energy;
pub mod threshold;
pub mod types;
pub mod vad;

pub use config::VadConfig;
pub use constants::{
    CHANNELS_MONO, FRAME_DURATION_MS, FRAME_SIZE_SAMPLES, MAX_SPEECH_MS, MIN_SPEECH_MS, MULT_HIGH,
    MULT_LOW, PRE_ROLL_MS, SAMPLE_RATE_HZ, SILENCE_MS,
};
pub use energy::EnergyCalculator;
pub use threshold::AdaptiveThreshold;
pub use types::{VadOutcome, VadState};
pub use vad::VoiceActivityDetector;
