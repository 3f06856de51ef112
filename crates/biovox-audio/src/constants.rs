/// Target mono sample rate the chunker resamples everything to.
pub const TARGET_SAMPLE_RATE_HZ: u32 = 16_000;

/// Default chunk size handed to the VAD, in samples at the target rate.
pub const DEFAULT_CHUNK_SIZE_SAMPLES: usize = 512;

/// Ring buffer capacity in samples: ~1s at the target rate, comfortably
/// larger than any configured pre-roll window.
pub const RING_BUFFER_CAPACITY_SAMPLES: usize = 16_000;

/// Sample rates tried, in order, before falling back to the device default.
pub const PREFERRED_SAMPLE_RATES_HZ: &[u32] = &[16_000, 48_000, 44_100, 8_000];
