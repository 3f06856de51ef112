use crate::config::VadConfig;
use crate::energy::EnergyCalculator;
use crate::threshold::AdaptiveThreshold;
use crate::types::{VadOutcome, VadState};

/// Energy-based voice activity detector: `SILENCE -> RECORDING -> PROCESSING`.
///
/// Pre-roll is supplied lazily by the caller on the SILENCE->RECORDING edge
/// (via a closure) rather than held by the VAD itself, since the samples
/// live in the capture ring buffer, not here.
pub struct VoiceActivityDetector {
    config: VadConfig,
    state: VadState,
    threshold: AdaptiveThreshold,
    energy: EnergyCalculator,
    segment: Vec<i16>,
    total_chunks: u32,
    silence_chunks: u32,
}

impl VoiceActivityDetector {
    pub fn new(config: VadConfig) -> Self {
        let threshold = AdaptiveThreshold::new(&config);
        Self {
            config,
            state: VadState::Silence,
            threshold,
            energy: EnergyCalculator::new(),
            segment: Vec::new(),
            total_chunks: 0,
            silence_chunks: 0,
        }
    }

    pub fn calibrate_background(&mut self, background_rms: f32) {
        self.threshold.set_background_rms(background_rms);
    }

    pub fn current_state(&self) -> VadState {
        self.state
    }

    /// Resets to SILENCE with no residual buffer. Required after every
    /// PROCESSING segment before the VAD will accept more chunks.
    pub fn reset(&mut self) {
        self.state = VadState::Silence;
        self.segment.clear();
        self.total_chunks = 0;
        self.silence_chunks = 0;
    }

    pub fn process<F>(&mut self, chunk: &[i16], pre_roll: F) -> VadOutcome
    where
        F: FnOnce() -> Vec<i16>,
    {
        if self.state == VadState::Processing {
            return VadOutcome::Continue;
        }

        let rms = self.energy.calculate_rms(chunk);
        let is_speech = self.threshold.is_speech(rms);

        match self.state {
            VadState::Silence => {
                if is_speech {
                    self.state = VadState::Recording;
                    self.segment = pre_roll();
                    self.segment.extend_from_slice(chunk);
                    self.total_chunks = 1;
                    self.silence_chunks = 0;
                }
                VadOutcome::Continue
            }
            VadState::Recording => {
                self.segment.extend_from_slice(chunk);
                self.total_chunks += 1;
                if is_speech {
                    self.silence_chunks = 0;
                } else {
                    self.silence_chunks += 1;
                }

                let silence_elapsed = self.silence_chunks >= self.config.silence_chunks();
                let max_elapsed = self.total_chunks >= self.config.max_speech_chunks();

                if silence_elapsed || max_elapsed {
                    if self.total_chunks < self.config.min_speech_chunks() {
                        self.reset();
                        return VadOutcome::Discarded;
                    }
                    self.state = VadState::Processing;
                    let segment = std::mem::take(&mut self.segment);
                    return VadOutcome::SegmentReady(segment);
                }
                VadOutcome::Continue
            }
            VadState::Processing => VadOutcome::Continue,
        }
    }
}
