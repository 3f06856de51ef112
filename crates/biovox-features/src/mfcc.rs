use crate::mel::{dct2, mel_power_spectrogram};
use crate::matrix::Matrix;

#[derive(Debug, Clone, Copy)]
pub struct MfccConfig {
    pub n_mfcc: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub sample_rate: u32,
    pub fmin: f32,
    pub fmax: f32,
    pub include_deltas: bool,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            n_mfcc: 13,
            n_fft: 1024,
            hop_length: 256,
            n_mels: 128,
            sample_rate: 16_000,
            fmin: 80.0,
            fmax: 7_600.0,
            include_deltas: true,
        }
    }
}

/// Largest odd window width for the symmetric-difference delta filter that
/// still fits inside `n_frames`, capped at 9 (librosa's default). Returns 0
/// when there aren't enough frames for any difference at all.
fn delta_width(n_frames: usize) -> usize {
    let cap = 9.min(n_frames);
    if cap < 3 {
        return 0;
    }
    if cap % 2 == 0 {
        cap - 1
    } else {
        cap
    }
}

/// First time-derivative via a symmetric-difference (Savitzky-Golay style)
/// filter, edge-padded. Returns an all-zero matrix of the same shape when
/// there are too few frames to form a window.
fn delta(features: &Matrix) -> Matrix {
    if features.rows == 0 {
        return Matrix::zeros(0, features.cols);
    }
    let width = delta_width(features.rows);
    let mut out = Matrix::zeros(features.rows, features.cols);
    if width == 0 {
        return out;
    }
    let half = width / 2;
    let denom: f32 = 2.0 * (1..=half).map(|n| (n * n) as f32).sum::<f32>();

    let get = |t: isize, c: usize| -> f32 {
        let clamped = t.clamp(0, features.rows as isize - 1) as usize;
        features.get(clamped, c)
    };

    for t in 0..features.rows {
        for c in 0..features.cols {
            let mut acc = 0.0f32;
            for n in 1..=half as isize {
                acc += n as f32 * (get(t as isize + n, c) - get(t as isize - n, c));
            }
            out.set(t, c, acc / denom);
        }
    }
    out
}

/// MFCC (+delta, +delta-delta) with per-utterance cepstral mean
/// normalisation. Output shape is `(frames, n_mfcc * {1,2,3})`.
pub fn extract_mfcc(samples: &[f32], config: &MfccConfig) -> Matrix {
    let mel_power = mel_power_spectrogram(
        samples,
        config.n_fft,
        config.hop_length,
        config.n_mels,
        config.sample_rate,
        config.fmin,
        config.fmax,
    );

    if mel_power.rows == 0 {
        let cols = if config.include_deltas {
            config.n_mfcc * 3
        } else {
            config.n_mfcc
        };
        return Matrix::zeros(0, cols);
    }

    let mut log_mel = Matrix::zeros(mel_power.rows, mel_power.cols);
    for r in 0..mel_power.rows {
        for c in 0..mel_power.cols {
            log_mel.set(r, c, (mel_power.get(r, c) + 1e-10).ln());
        }
    }

    let mut mfcc = Matrix::zeros(mel_power.rows, config.n_mfcc);
    for r in 0..mel_power.rows {
        let coeffs = dct2(log_mel.row(r), config.n_mfcc);
        mfcc.row_mut(r).copy_from_slice(&coeffs);
    }

    let mut stacked = if config.include_deltas {
        let d1 = delta(&mfcc);
        let d2 = delta(&d1);
        Matrix::hstack(&[mfcc, d1, d2])
    } else {
        mfcc
    };

    let means = stacked.column_means();
    stacked.subtract_row(&means);
    stacked
}
