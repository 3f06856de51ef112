use crate::mel::mel_power_spectrogram;
use crate::matrix::Matrix;

#[derive(Debug, Clone, Copy)]
pub struct MelTemplateConfig {
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub sample_rate: u32,
    pub fmin: f32,
    pub fmax: f32,
    pub fixed_frames: usize,
}

impl Default for MelTemplateConfig {
    fn default() -> Self {
        Self {
            n_fft: 1024,
            hop_length: 256,
            n_mels: 128,
            sample_rate: 16_000,
            fmin: 80.0,
            fmax: 7_600.0,
            fixed_frames: 50,
        }
    }
}

/// Log-compressed mel-spectrogram template, time-resampled to exactly
/// `fixed_frames`. Output shape `(n_mels, fixed_frames)`.
pub fn extract_mel_template(samples: &[f32], config: &MelTemplateConfig) -> Matrix {
    let power = mel_power_spectrogram(
        samples,
        config.n_fft,
        config.hop_length,
        config.n_mels,
        config.sample_rate,
        config.fmin,
        config.fmax,
    );

    if power.rows == 0 {
        return Matrix::zeros(config.n_mels, config.fixed_frames);
    }

    // log1p in (frames, mels) layout, then resample the time axis (rows)
    // to the fixed frame count before transposing to (mels, frames).
    let mut log_power = Matrix::zeros(power.rows, power.cols);
    for r in 0..power.rows {
        for c in 0..power.cols {
            log_power.set(r, c, power.get(r, c).max(0.0).ln_1p());
        }
    }

    let resampled = log_power.resample_rows(config.fixed_frames);

    let mut bins_by_time = Matrix::zeros(config.n_mels, config.fixed_frames);
    for t in 0..config.fixed_frames {
        for m in 0..config.n_mels {
            bins_by_time.set(m, t, resampled.get(t, m));
        }
    }
    bins_by_time
}
