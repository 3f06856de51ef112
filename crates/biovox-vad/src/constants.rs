//! Audio processing constants for the VAD pipeline.

/// Standard sample rate for all VAD processing (Hz).
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Standard chunk size for all VAD processing (samples).
/// At 16kHz, 512 samples = 32ms chunks.
pub const FRAME_SIZE_SAMPLES: usize = 512;

/// Standard number of channels for mono audio processing.
pub const CHANNELS_MONO: u16 = 1;

/// Chunk duration in milliseconds (derived constant).
pub const FRAME_DURATION_MS: f32 = (FRAME_SIZE_SAMPLES as f32 * 1000.0) / SAMPLE_RATE_HZ as f32;

/// Lower multiplier applied to the measured background RMS.
pub const MULT_LOW: f32 = 1.8;

/// Upper multiplier applied to the measured background RMS.
pub const MULT_HIGH: f32 = 4.0;

/// Minimum retained speech segment length.
pub const MIN_SPEECH_MS: u32 = 150;

/// Maximum speech segment length before it is forced to PROCESSING.
pub const MAX_SPEECH_MS: u32 = 1500;

/// Sustained silence required to end a RECORDING segment.
pub const SILENCE_MS: u32 = 200;

/// Pre-roll retained from the ring buffer on SILENCE->RECORDING.
pub const PRE_ROLL_MS: u32 = 80;
