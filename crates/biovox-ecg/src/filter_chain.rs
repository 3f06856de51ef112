use biquad::{Biquad, Coefficients, DirectForm2Transposed, Hertz, Type};

/// Length-8 boxcar moving-average / differentiator / squarer / MWI stages
/// that don't need a general biquad section, with state carried across
/// batches.
#[derive(Debug, Clone)]
struct Boxcar {
    window: Vec<f32>,
    pos: usize,
    sum: f32,
    len: usize,
}

impl Boxcar {
    fn new(len: usize) -> Self {
        Self {
            window: vec![0.0; len.max(1)],
            pos: 0,
            sum: 0.0,
            len: len.max(1),
        }
    }

    fn push(&mut self, x: f32) -> f32 {
        self.sum -= self.window[self.pos];
        self.window[self.pos] = x;
        self.sum += x;
        self.pos = (self.pos + 1) % self.len;
        self.sum / self.len as f32
    }
}

/// Biquad cascade applied to each batch of serial samples: notch 60 Hz ->
/// low-pass 40 Hz -> MA smoothing -> differentiation -> squaring -> moving
/// window integrator. All stage states persist across calls.
pub struct EcgFilterChain {
    notch: DirectForm2Transposed<f32>,
    lowpass: DirectForm2Transposed<f32>,
    ma: Boxcar,
    last_sample: f32,
    mwi: Boxcar,
}

impl EcgFilterChain {
    pub fn new(sample_rate: u32) -> Self {
        let fs: Hertz<f32> = (sample_rate as f32).hz();

        let notch_coeffs = Coefficients::<f32>::from_params(Type::Notch, fs, 60.0.hz(), 20.0)
            .expect("valid notch filter parameters");
        let lowpass_coeffs =
            Coefficients::<f32>::from_params(Type::LowPass, fs, 40.0.hz(), std::f32::consts::FRAC_1_SQRT_2)
                .expect("valid Butterworth low-pass parameters");

        let mwi_len = (0.150 * sample_rate as f32).round() as usize;

        Self {
            notch: DirectForm2Transposed::<f32>::new(notch_coeffs),
            lowpass: DirectForm2Transposed::<f32>::new(lowpass_coeffs),
            ma: Boxcar::new(8),
            last_sample: 0.0,
            mwi: Boxcar::new(mwi_len.max(1)),
        }
    }

    /// Processes one raw sample and returns `(display, mwi)`: `display` is
    /// the MA-smoothed signal used for amplitude checks, `mwi` is the
    /// moving-window-integrator output that drives peak detection.
    pub fn process_sample(&mut self, raw: f32) -> (f32, f32) {
        let notched = self.notch.run(raw);
        let lowpassed = self.lowpass.run(notched);
        let display = self.ma.push(lowpassed);

        let diff = display - self.last_sample;
        self.last_sample = display;

        let squared = diff * diff;
        let mwi = self.mwi.push(squared);

        (display, mwi)
    }

    pub fn process_batch(&mut self, raw: &[f32]) -> (Vec<f32>, Vec<f32>) {
        let mut display = Vec::with_capacity(raw.len());
        let mut mwi = Vec::with_capacity(raw.len());
        for &x in raw {
            let (d, m) = self.process_sample(x);
            display.push(d);
            mwi.push(m);
        }
        (display, mwi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_dc_free_signal_without_diverging() {
        let mut chain = EcgFilterChain::new(500);
        for i in 0..2000 {
            let raw = if i % 250 < 10 { 1000.0 } else { 0.0 };
            let (display, mwi) = chain.process_sample(raw);
            assert!(display.is_finite());
            assert!(mwi.is_finite());
            assert!(mwi >= 0.0);
        }
    }

    #[test]
    fn mwi_window_length_matches_150ms() {
        let chain = EcgFilterChain::new(500);
        assert_eq!(chain.mwi.len, 75);
    }
}
