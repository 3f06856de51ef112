use rustfft::{num_complex::Complex32, FftPlanner};

use crate::matrix::Matrix;

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank, shape `(n_mels, n_fft / 2 + 1)`.
pub fn mel_filterbank(n_mels: usize, n_fft: usize, sample_rate: u32, fmin: f32, fmax: f32) -> Matrix {
    let n_bins = n_fft / 2 + 1;
    let mel_lo = hz_to_mel(fmin);
    let mel_hi = hz_to_mel(fmax);

    let mut mel_points = Vec::with_capacity(n_mels + 2);
    for i in 0..=n_mels + 1 {
        let mel = mel_lo + (mel_hi - mel_lo) * i as f32 / (n_mels + 1) as f32;
        mel_points.push(mel_to_hz(mel));
    }

    let bin_points: Vec<usize> = mel_points
        .iter()
        .map(|&hz| ((n_fft as f32 + 1.0) * hz / sample_rate as f32).floor() as usize)
        .map(|b| b.min(n_bins - 1))
        .collect();

    let mut fb = Matrix::zeros(n_mels, n_bins);
    for m in 0..n_mels {
        let (left, center, right) = (bin_points[m], bin_points[m + 1], bin_points[m + 2]);
        for k in left..center {
            if center > left {
                fb.set(m, k, (k - left) as f32 / (center - left) as f32);
            }
        }
        for k in center..right {
            if right > center {
                fb.set(m, k, (right - k) as f32 / (right - center) as f32);
            }
        }
    }
    fb
}

fn hann_window(n: usize) -> Vec<f32> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32).cos())
        .collect()
}

/// Power spectrogram `(n_frames, n_fft/2 + 1)` via a centered STFT with a
/// Hann window, matching librosa's default `center=True` framing closely
/// enough for template matching purposes (frame `t` is centered on sample
/// `t * hop_length`).
pub fn power_spectrogram(samples: &[f32], n_fft: usize, hop_length: usize) -> Matrix {
    if samples.is_empty() {
        return Matrix::zeros(0, n_fft / 2 + 1);
    }

    let window = hann_window(n_fft);
    let pad = n_fft / 2;
    let mut padded = vec![0.0f32; pad];
    padded.extend_from_slice(samples);
    padded.extend(vec![0.0f32; pad]);

    let n_frames = if padded.len() >= n_fft {
        (padded.len() - n_fft) / hop_length + 1
    } else {
        0
    };

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let n_bins = n_fft / 2 + 1;
    let mut out = Matrix::zeros(n_frames, n_bins);

    let mut buffer = vec![Complex32::new(0.0, 0.0); n_fft];
    for t in 0..n_frames {
        let start = t * hop_length;
        for i in 0..n_fft {
            buffer[i] = Complex32::new(padded[start + i] * window[i], 0.0);
        }
        fft.process(&mut buffer);
        for (k, row) in out.row_mut(t).iter_mut().enumerate() {
            let c = buffer[k];
            *row = c.re * c.re + c.im * c.im;
        }
    }
    out
}

/// Mel-band power spectrogram `(n_frames, n_mels)`: STFT power times the
/// mel filterbank transpose.
pub fn mel_power_spectrogram(
    samples: &[f32],
    n_fft: usize,
    hop_length: usize,
    n_mels: usize,
    sample_rate: u32,
    fmin: f32,
    fmax: f32,
) -> Matrix {
    let power = power_spectrogram(samples, n_fft, hop_length);
    let fb = mel_filterbank(n_mels, n_fft, sample_rate, fmin, fmax);

    let mut out = Matrix::zeros(power.rows, n_mels);
    for t in 0..power.rows {
        for m in 0..n_mels {
            let mut acc = 0.0f32;
            for k in 0..power.cols {
                acc += power.get(t, k) * fb.get(m, k);
            }
            out.set(t, m, acc);
        }
    }
    out
}

/// Type-II DCT used to turn log-mel energies into cepstral coefficients,
/// orthonormalized the way `librosa`/`scipy` default to.
pub fn dct2(input: &[f32], n_out: usize) -> Vec<f32> {
    let n = input.len();
    let mut out = vec![0.0f32; n_out];
    if n == 0 {
        return out;
    }
    for (k, o) in out.iter_mut().enumerate() {
        let mut sum = 0.0f32;
        for (i, &x) in input.iter().enumerate() {
            sum += x * (std::f32::consts::PI * k as f32 * (2.0 * i as f32 + 1.0) / (2.0 * n as f32)).cos();
        }
        let scale = if k == 0 {
            (1.0 / n as f32).sqrt()
        } else {
            (2.0 / n as f32).sqrt()
        };
        *o = sum * scale;
    }
    out
}
