const FRAME_MS: u32 = 20;
const NOISE_PERCENTILE: f32 = 0.40;
const MAX_SNR_DB: f32 = 100.0;
const MIN_SNR_DB: f32 = 0.0;

/// Estimates the segment's signal-to-noise ratio in dB: frame it into short
/// windows, take the 40th-percentile frame energy as the noise floor and
/// the mean energy of above-floor frames as the signal estimate.
pub fn estimate_snr_db(samples: &[f32], sample_rate: u32) -> f32 {
    let frame_len = (sample_rate as u64 * FRAME_MS as u64 / 1000) as usize;
    if frame_len == 0 || samples.len() < frame_len {
        return MIN_SNR_DB;
    }

    let mut energies: Vec<f32> = samples
        .chunks(frame_len)
        .map(|chunk| chunk.iter().map(|&s| s * s).sum::<f32>() / chunk.len() as f32)
        .collect();

    if energies.is_empty() {
        return MIN_SNR_DB;
    }

    let mut sorted = energies.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let idx = ((sorted.len() as f32 - 1.0) * NOISE_PERCENTILE).round() as usize;
    let noise_floor = sorted[idx];

    let above: Vec<f32> = energies.drain(..).filter(|&e| e > noise_floor).collect();
    let signal = if above.is_empty() {
        noise_floor
    } else {
        above.iter().sum::<f32>() / above.len() as f32
    };

    if noise_floor <= 1e-12 {
        return MAX_SNR_DB;
    }
    if signal <= noise_floor {
        return MIN_SNR_DB;
    }

    (10.0 * (signal / noise_floor).log10()).clamp(MIN_SNR_DB, MAX_SNR_DB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_silence_yields_max_snr_clamp() {
        let samples = vec![0.0f32; 16_000];
        assert_eq!(estimate_snr_db(&samples, 16_000), MAX_SNR_DB);
    }

    #[test]
    fn loud_tone_over_quiet_floor_yields_high_snr() {
        let sample_rate = 16_000;
        let mut samples = vec![0.001f32; sample_rate as usize];
        for (i, s) in samples.iter_mut().enumerate().take(8000) {
            *s = (i as f32 * 0.1).sin();
        }
        let snr = estimate_snr_db(&samples, sample_rate);
        assert!(snr > 10.0);
    }

    #[test]
    fn short_segment_does_not_panic() {
        let samples = vec![0.1f32; 10];
        let snr = estimate_snr_db(&samples, 16_000);
        assert_eq!(snr, MIN_SNR_DB);
    }
}
