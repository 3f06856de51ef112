use serde::{Deserialize, Serialize};

use super::constants::{
    FRAME_SIZE_SAMPLES, MAX_SPEECH_MS, MIN_SPEECH_MS, MULT_HIGH, MULT_LOW, PRE_ROLL_MS,
    SAMPLE_RATE_HZ, SILENCE_MS,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    pub mult_low: f32,
    pub mult_high: f32,
    pub min_speech_ms: u32,
    pub max_speech_ms: u32,
    pub silence_ms: u32,
    pub pre_roll_ms: u32,
    pub frame_size_samples: usize,
    pub sample_rate_hz: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            mult_low: MULT_LOW,
            mult_high: MULT_HIGH,
            min_speech_ms: MIN_SPEECH_MS,
            max_speech_ms: MAX_SPEECH_MS,
            silence_ms: SILENCE_MS,
            pre_roll_ms: PRE_ROLL_MS,
            frame_size_samples: FRAME_SIZE_SAMPLES,
            sample_rate_hz: SAMPLE_RATE_HZ,
        }
    }
}

impl VadConfig {
    pub fn frame_duration_ms(&self) -> f32 {
        (self.frame_size_samples as f32 * 1000.0) / self.sample_rate_hz as f32
    }

    fn chunks_for_ms(&self, ms: u32) -> u32 {
        (ms as f32 / self.frame_duration_ms()).ceil() as u32
    }

    pub fn min_speech_chunks(&self) -> u32 {
        self.chunks_for_ms(self.min_speech_ms)
    }

    pub fn max_speech_chunks(&self) -> u32 {
        self.chunks_for_ms(self.max_speech_ms)
    }

    pub fn silence_chunks(&self) -> u32 {
        self.chunks_for_ms(self.silence_ms)
    }
}
