use biovox_features::Matrix;

use crate::distance::{cosine_distance, euclidean_distance};
use crate::dtw::dtw_distance_normalized;
use crate::method::{FeatureKind, MatchMethod};
use crate::template_store::TemplateStore;

const DEFAULT_DTW_RADIUS: usize = 6;
const FAST_LPC_FIXED_FRAMES: usize = 30;

/// DTW over variable-length MFCC(+delta+delta-delta) sequences.
pub struct MfccDtwMatcher {
    store: TemplateStore,
    threshold: f32,
    radius: usize,
}

impl MfccDtwMatcher {
    pub fn new(threshold: f32) -> Self {
        Self {
            store: TemplateStore::new(),
            threshold,
            radius: DEFAULT_DTW_RADIUS,
        }
    }

    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }
}

impl MatchMethod for MfccDtwMatcher {
    fn name(&self) -> &'static str {
        "mfcc_dtw"
    }
    fn feature_kind(&self) -> FeatureKind {
        FeatureKind::MfccDelta
    }
    fn threshold(&self) -> f32 {
        self.threshold
    }
    fn store(&self) -> &TemplateStore {
        &self.store
    }
    fn store_mut(&mut self) -> &mut TemplateStore {
        &mut self.store
    }
    fn distance(&self, a: &Matrix, b: &Matrix) -> f32 {
        dtw_distance_normalized(a, b, self.radius)
    }
}

/// Fast LPC matcher: resample the per-frame LPCC matrix to a fixed frame
/// count and use plain Euclidean distance on the flattened vector. ~20x
/// faster than DTW over LPCC with negligible accuracy loss; this is the
/// default LPC matcher.
pub struct FastLpcMatcher {
    store: TemplateStore,
    threshold: f32,
    fixed_frames: usize,
}

impl FastLpcMatcher {
    pub fn new(threshold: f32) -> Self {
        Self {
            store: TemplateStore::new(),
            threshold,
            fixed_frames: FAST_LPC_FIXED_FRAMES,
        }
    }
}

impl MatchMethod for FastLpcMatcher {
    fn name(&self) -> &'static str {
        "fast_lpc"
    }
    fn feature_kind(&self) -> FeatureKind {
        FeatureKind::Lpcc
    }
    fn threshold(&self) -> f32 {
        self.threshold
    }
    fn store(&self) -> &TemplateStore {
        &self.store
    }
    fn store_mut(&mut self) -> &mut TemplateStore {
        &mut self.store
    }
    fn prepare(&self, features: &Matrix) -> Matrix {
        if features.rows == 0 {
            return Matrix::zeros(self.fixed_frames, features.cols);
        }
        features.resample_rows(self.fixed_frames)
    }
    fn distance(&self, a: &Matrix, b: &Matrix) -> f32 {
        euclidean_distance(a, b)
    }
}

/// Slow alternative LPC matcher: DTW over the variable-length LPCC matrix,
/// selectable via configuration when the fast path's accuracy isn't
/// sufficient for a deployment.
pub struct SlowLpcDtwMatcher {
    store: TemplateStore,
    threshold: f32,
    radius: usize,
}

impl SlowLpcDtwMatcher {
    pub fn new(threshold: f32) -> Self {
        Self {
            store: TemplateStore::new(),
            threshold,
            radius: DEFAULT_DTW_RADIUS,
        }
    }
}

impl MatchMethod for SlowLpcDtwMatcher {
    fn name(&self) -> &'static str {
        "slow_lpc_dtw"
    }
    fn feature_kind(&self) -> FeatureKind {
        FeatureKind::Lpcc
    }
    fn threshold(&self) -> f32 {
        self.threshold
    }
    fn store(&self) -> &TemplateStore {
        &self.store
    }
    fn store_mut(&mut self) -> &mut TemplateStore {
        &mut self.store
    }
    fn distance(&self, a: &Matrix, b: &Matrix) -> f32 {
        dtw_distance_normalized(a, b, self.radius)
    }
}

/// Cosine distance on the flattened fixed-shape log-mel template.
pub struct MelCosineMatcher {
    store: TemplateStore,
    threshold: f32,
}

impl MelCosineMatcher {
    pub fn new(threshold: f32) -> Self {
        Self {
            store: TemplateStore::new(),
            threshold,
        }
    }
}

impl MatchMethod for MelCosineMatcher {
    fn name(&self) -> &'static str {
        "mel_cosine"
    }
    fn feature_kind(&self) -> FeatureKind {
        FeatureKind::MelTemplate
    }
    fn threshold(&self) -> f32 {
        self.threshold
    }
    fn store(&self) -> &TemplateStore {
        &self.store
    }
    fn store_mut(&mut self) -> &mut TemplateStore {
        &mut self.store
    }
    fn distance(&self, a: &Matrix, b: &Matrix) -> f32 {
        cosine_distance(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Decision;

    fn tone_matrix(rows: usize, cols: usize, seed: f32) -> Matrix {
        let mut data = Vec::with_capacity(rows);
        for r in 0..rows {
            let row: Vec<f32> = (0..cols).map(|c| ((r + c) as f32 * seed).sin()).collect();
            data.push(row);
        }
        Matrix::from_rows(data)
    }

    #[test]
    fn self_match_yields_small_distance_and_same_template() {
        let mut matcher = MfccDtwMatcher::new(140.0);
        let features = tone_matrix(40, 13, 0.3);
        matcher.add_template("JUMP", "jump_01".into(), features.clone());

        let result = matcher.match_features(&features);
        assert_eq!(result.decision, Decision::Command("JUMP".into()));
        assert!(result.best_distance < matcher.threshold() / 10.0);
        assert_eq!(result.best_template.as_deref(), Some("jump_01"));
    }

    #[test]
    fn noise_closer_than_best_command_yields_noise() {
        let mut matcher = MelCosineMatcher::new(0.5);
        let command_features = tone_matrix(128, 50, 0.1);
        let noise_features = tone_matrix(128, 50, 0.9);
        matcher.add_template("JUMP", "jump_01".into(), command_features);
        matcher.add_noise_template("noise_01".into(), noise_features.clone());

        let result = matcher.match_features(&noise_features);
        assert_eq!(result.decision, Decision::Noise);
        assert!(result.noise_distance < result.best_distance);
    }

    #[test]
    fn distance_above_threshold_yields_none() {
        let mut matcher = FastLpcMatcher::new(0.001);
        matcher.add_template("JUMP", "jump_01".into(), tone_matrix(20, 12, 0.3));

        let result = matcher.match_features(&tone_matrix(20, 12, 1.7));
        assert_eq!(result.decision, Decision::None);
    }

    #[test]
    fn fast_lpc_resamples_to_fixed_frame_count() {
        let mut matcher = FastLpcMatcher::new(100.0);
        matcher.add_template("JUMP", "jump_01".into(), tone_matrix(12, 12, 0.3));
        for t in matcher.store().commands().flat_map(|(_, ts)| ts) {
            assert_eq!(t.features.rows, 30);
        }
    }
}
