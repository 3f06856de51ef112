/// Pre-emphasis coefficient shared by every feature extractor.
pub const PRE_EMPHASIS: f32 = 0.97;
/// Target RMS after normalisation.
pub const TARGET_RMS: f32 = 0.1;

/// Cast to float, remove DC, pre-emphasize, and RMS-normalize a speech
/// segment. Applied once per segment before any feature extraction runs.
pub fn preprocess(samples: &[i16]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut audio: Vec<f32> = samples.iter().map(|&s| s as f32).collect();

    let mean = audio.iter().sum::<f32>() / audio.len() as f32;
    for v in &mut audio {
        *v -= mean;
    }

    let mut emphasized = Vec::with_capacity(audio.len());
    emphasized.push(audio[0]);
    for i in 1..audio.len() {
        emphasized.push(audio[i] - PRE_EMPHASIS * audio[i - 1]);
    }

    let rms = (emphasized.iter().map(|v| v * v).sum::<f32>() / emphasized.len() as f32).sqrt();
    if rms > 0.0 {
        let scale = TARGET_RMS / rms;
        for v in &mut emphasized {
            *v *= scale;
        }
    }

    emphasized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent_after_first_application() {
        let samples: Vec<i16> = (0..400)
            .map(|i| ((i as f32 * 0.2).sin() * 2000.0) as i16)
            .collect();
        let once = preprocess(&samples);
        let as_i16: Vec<i16> = once.iter().map(|&v| v.round() as i16).collect();
        let twice = preprocess(&as_i16);

        let rms_once = (once.iter().map(|v| v * v).sum::<f32>() / once.len() as f32).sqrt();
        let rms_twice = (twice.iter().map(|v| v * v).sum::<f32>() / twice.len() as f32).sqrt();
        assert!((rms_once - rms_twice).abs() < 0.01);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(preprocess(&[]).is_empty());
    }

    #[test]
    fn removes_dc_offset() {
        let samples: Vec<i16> = vec![1000; 256];
        let out = preprocess(&samples);
        // A constant signal has zero AC energy once the mean is removed;
        // after pre-emphasis it collapses to (almost) zero everywhere but
        // the leading sample, so RMS normalisation cannot amplify noise.
        let mean: f32 = out.iter().sum::<f32>() / out.len() as f32;
        assert!(mean.abs() < 1.0);
    }
}
