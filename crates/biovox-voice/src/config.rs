use std::collections::HashMap;

use biovox_features::{LpcConfig, MelTemplateConfig, MfccConfig};
use biovox_vad::VadConfig;
use serde::{Deserialize, Serialize};

/// Which LPC matcher runs by default. The fast path is the spec's default
/// (fixed-frame resample + Euclidean, ~20x faster); the slow DTW variant
/// is kept selectable for deployments that need the accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LpcMatcherMode {
    Fast,
    Slow,
}

impl Default for LpcMatcherMode {
    fn default() -> Self {
        Self::Fast
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingMode {
    Soft,
    Hard,
}

impl Default for VotingMode {
    fn default() -> Self {
        Self::Soft
    }
}

/// Per-method distance thresholds. Kept as configuration rather than
/// constants: the source's own defaults disagree across versions (e.g.
/// `THRESHOLD_MFCC_DTW` has shipped as 140, 150, and 320), so none of them
/// is hard-coded here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchThresholds {
    pub mfcc_dtw: f32,
    pub lpc: f32,
    pub mel_cosine: f32,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            mfcc_dtw: 150.0,
            lpc: 60.0,
            mel_cosine: 0.35,
        }
    }
}

/// Fixed per-method weights used when SNR-adaptive weighting is off, and
/// the fallback for any method the adaptive table doesn't mention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodWeights {
    pub weights: HashMap<String, f32>,
}

impl Default for MethodWeights {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert("mfcc_dtw".to_string(), 5.0);
        weights.insert("fast_lpc".to_string(), 0.5);
        weights.insert("slow_lpc_dtw".to_string(), 0.5);
        weights.insert("mel_cosine".to_string(), 1.0);
        Self { weights }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub vad: VadConfig,
    pub mfcc: MfccConfigDto,
    pub mel: MelConfigDto,
    pub lpc: LpcConfigDto,
    pub lpc_matcher_mode: LpcMatcherMode,
    pub dtw_radius: usize,
    pub thresholds: MatchThresholds,
    pub weights: MethodWeights,
    pub adaptive_weighting: bool,
    pub voting_mode: VotingMode,
    /// Milliseconds of chunks collected per noise-template seed segment at
    /// startup; three of these are recorded per §4.7.
    pub noise_seed_segment_ms: u32,
    pub noise_seed_count: u32,
    pub calibration_timeout_secs: u64,
    /// Freedom-mode audio-quality gate: minimum segment length.
    pub freedom_min_length_ms: u32,
    /// Freedom-mode audio-quality gate: RMS multiplier over background.
    pub freedom_min_rms_multiplier: f32,
    /// Per-speaker subdirectory names under the templates directory that
    /// are skipped entirely (e.g. a speaker whose recordings are known to
    /// be mislabeled), per §6's template-directory layout.
    pub speaker_dir_skip_list: Vec<String>,
}

/// Serde-friendly mirror of `biovox_features::MfccConfig` (the upstream
/// struct has no `Serialize`/`Deserialize` derive since it's also used in
/// hot per-frame code where we didn't want to carry serde's trait bounds).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MfccConfigDto {
    pub n_mfcc: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub sample_rate: u32,
    pub fmin: f32,
    pub fmax: f32,
    pub include_deltas: bool,
}

impl Default for MfccConfigDto {
    fn default() -> Self {
        let d = MfccConfig::default();
        Self {
            n_mfcc: d.n_mfcc,
            n_fft: d.n_fft,
            hop_length: d.hop_length,
            n_mels: d.n_mels,
            sample_rate: d.sample_rate,
            fmin: d.fmin,
            fmax: d.fmax,
            include_deltas: d.include_deltas,
        }
    }
}

impl From<MfccConfigDto> for MfccConfig {
    fn from(d: MfccConfigDto) -> Self {
        MfccConfig {
            n_mfcc: d.n_mfcc,
            n_fft: d.n_fft,
            hop_length: d.hop_length,
            n_mels: d.n_mels,
            sample_rate: d.sample_rate,
            fmin: d.fmin,
            fmax: d.fmax,
            include_deltas: d.include_deltas,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MelConfigDto {
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub sample_rate: u32,
    pub fmin: f32,
    pub fmax: f32,
    pub fixed_frames: usize,
}

impl Default for MelConfigDto {
    fn default() -> Self {
        let d = MelTemplateConfig::default();
        Self {
            n_fft: d.n_fft,
            hop_length: d.hop_length,
            n_mels: d.n_mels,
            sample_rate: d.sample_rate,
            fmin: d.fmin,
            fmax: d.fmax,
            fixed_frames: d.fixed_frames,
        }
    }
}

impl From<MelConfigDto> for MelTemplateConfig {
    fn from(d: MelConfigDto) -> Self {
        MelTemplateConfig {
            n_fft: d.n_fft,
            hop_length: d.hop_length,
            n_mels: d.n_mels,
            sample_rate: d.sample_rate,
            fmin: d.fmin,
            fmax: d.fmax,
            fixed_frames: d.fixed_frames,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LpcConfigDto {
    pub order: usize,
    pub frame_ms: u32,
    pub hop_ms: u32,
    pub sample_rate: u32,
}

impl Default for LpcConfigDto {
    fn default() -> Self {
        let d = LpcConfig::default();
        Self {
            order: d.order,
            frame_ms: d.frame_ms,
            hop_ms: d.hop_ms,
            sample_rate: d.sample_rate,
        }
    }
}

impl From<LpcConfigDto> for LpcConfig {
    fn from(d: LpcConfigDto) -> Self {
        LpcConfig {
            order: d.order,
            frame_ms: d.frame_ms,
            hop_ms: d.hop_ms,
            sample_rate: d.sample_rate,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            vad: VadConfig::default(),
            mfcc: MfccConfigDto::default(),
            mel: MelConfigDto::default(),
            lpc: LpcConfigDto::default(),
            lpc_matcher_mode: LpcMatcherMode::default(),
            dtw_radius: 6,
            thresholds: MatchThresholds::default(),
            weights: MethodWeights::default(),
            adaptive_weighting: true,
            voting_mode: VotingMode::default(),
            noise_seed_segment_ms: 1_000,
            noise_seed_count: 3,
            calibration_timeout_secs: 10,
            freedom_min_length_ms: 100,
            freedom_min_rms_multiplier: 1.5,
            speaker_dir_skip_list: Vec::new(),
        }
    }
}
