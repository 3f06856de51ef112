use crate::matrix::Matrix;

#[derive(Debug, Clone, Copy)]
pub struct LpcConfig {
    pub order: usize,
    pub frame_ms: u32,
    pub hop_ms: u32,
    pub sample_rate: u32,
}

impl Default for LpcConfig {
    fn default() -> Self {
        Self {
            order: 12,
            frame_ms: 25,
            hop_ms: 10,
            sample_rate: 16_000,
        }
    }
}

const LPCC_CLAMP: f32 = 50.0;

fn hamming_window(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32).cos())
        .collect()
}

fn autocorrelation(frame: &[f32], order: usize) -> Vec<f32> {
    let n = frame.len();
    let mut r = vec![0.0f32; order + 1];
    for (lag, value) in r.iter_mut().enumerate() {
        let mut sum = 0.0f32;
        for i in 0..n.saturating_sub(lag) {
            sum += frame[i] * frame[i + lag];
        }
        *value = sum;
    }
    r
}

/// Levinson-Durbin recursion. Returns LPC coefficients `a_1..a_order`
/// (the `a_0 = 1` leading term is implicit and omitted).
fn levinson_durbin(r: &[f32], order: usize) -> Vec<f32> {
    let mut a = vec![0.0f32; order + 1];
    let mut e = r[0];
    a[0] = 1.0;

    if e == 0.0 {
        return vec![0.0; order];
    }

    for i in 1..=order {
        let mut acc = r[i];
        for j in 1..i {
            acc += a[j] * r[i - j];
        }
        let k = if e == 0.0 { 0.0 } else { -acc / e };

        let mut a_new = a.clone();
        a_new[i] = k;
        for j in 1..i {
            a_new[j] = a[j] + k * a[i - j];
        }
        a = a_new;
        e *= 1.0 - k * k;
    }

    a[1..=order].to_vec()
}

/// LPC coefficients for one windowed frame.
pub fn compute_lpc(frame: &[f32], order: usize) -> Vec<f32> {
    let window = hamming_window(frame.len());
    let windowed: Vec<f32> = frame.iter().zip(&window).map(|(s, w)| s * w).collect();

    let mut r = autocorrelation(&windowed, order);
    if r[0] == 0.0 {
        return vec![0.0; order];
    }
    let r0 = r[0];
    for v in &mut r {
        *v /= r0;
    }
    levinson_durbin(&r, order)
}

/// Converts LPC coefficients to LPCC (cepstral) coefficients via the
/// standard recursion, clamped to `[-50, 50]` to avoid blow-up on
/// near-silent frames.
pub fn lpc_to_lpcc(lpc: &[f32], n_cepstral: usize) -> Vec<f32> {
    let order = lpc.len();
    let mut c = vec![0.0f32; n_cepstral];

    for n in 1..=n_cepstral {
        let a_n = if n <= order { lpc[n - 1] } else { 0.0 };
        let mut sum = 0.0f32;
        for k in 1..n {
            let a_k = if k <= order { lpc[k - 1] } else { 0.0 };
            sum += (n - k) as f32 * a_k * c[n - k - 1];
        }
        let value = -a_n - sum / n as f32;
        c[n - 1] = value.clamp(-LPCC_CLAMP, LPCC_CLAMP);
    }
    c
}

/// Frames a pre-emphasized segment, computes per-frame LPC, converts to
/// LPCC, and returns a `(frames, order)` matrix.
pub fn extract_lpcc(samples: &[f32], config: &LpcConfig) -> Matrix {
    let frame_len = (config.frame_ms as u64 * config.sample_rate as u64 / 1000) as usize;
    let hop_len = (config.hop_ms as u64 * config.sample_rate as u64 / 1000) as usize;

    if frame_len == 0 || hop_len == 0 || samples.len() < frame_len {
        return Matrix::zeros(0, config.order);
    }

    let mut rows = Vec::new();
    let mut start = 0;
    while start + frame_len <= samples.len() {
        let frame = &samples[start..start + frame_len];
        let lpc = compute_lpc(frame, config.order);
        let lpcc = lpc_to_lpcc(&lpc, config.order);
        rows.push(lpcc);
        start += hop_len;
    }

    if rows.is_empty() {
        return Matrix::zeros(0, config.order);
    }
    Matrix::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, duration_ms: u32, sample_rate: u32) -> Vec<f32> {
        let n = (sample_rate as f32 * duration_ms as f32 / 1000.0) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn lpcc_coefficients_stay_within_clamp() {
        let config = LpcConfig::default();
        let samples = tone(200.0, 300, config.sample_rate);
        let lpcc = extract_lpcc(&samples, &config);
        for &c in lpcc.as_flat() {
            assert!(c.abs() <= 50.0);
        }
    }

    #[test]
    fn near_silent_frame_does_not_blow_up() {
        let samples = vec![0.0f32; 4000];
        let config = LpcConfig::default();
        let lpcc = extract_lpcc(&samples, &config);
        for &c in lpcc.as_flat() {
            assert!(c.abs() <= 50.0);
            assert!(c.is_finite());
        }
    }

    #[test]
    fn short_segment_yields_no_frames_not_a_panic() {
        let config = LpcConfig::default();
        let samples = vec![0.1f32; 10];
        let lpcc = extract_lpcc(&samples, &config);
        assert_eq!(lpcc.rows, 0);
        assert_eq!(lpcc.cols, config.order);
    }

    #[test]
    fn output_shape_matches_order() {
        let config = LpcConfig::default();
        let samples = tone(300.0, 500, config.sample_rate);
        let lpcc = extract_lpcc(&samples, &config);
        assert_eq!(lpcc.cols, config.order);
        assert!(lpcc.rows > 0);
    }
}
