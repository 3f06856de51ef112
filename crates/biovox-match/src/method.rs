use biovox_features::Matrix;

use crate::template_store::TemplateStore;

/// Which feature representation a matcher method consumes. The voice
/// controller extracts each kind at most once per segment and hands the
/// matching matrix to every method that needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    MfccDelta,
    Lpcc,
    MelTemplate,
}

/// A single entry in a method's ranked distance list -- downstream
/// diagnostics need the full ranking, not just the minimum.
#[derive(Debug, Clone)]
pub struct RankedTemplate {
    pub name: String,
    pub distance: f32,
}

/// Decision reached by one matcher method for one input.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Command(String),
    Noise,
    None,
}

#[derive(Debug, Clone)]
pub struct MethodResult {
    pub method: String,
    pub decision: Decision,
    pub best_distance: f32,
    pub best_template: Option<String>,
    pub noise_distance: f32,
    pub ranked: Vec<RankedTemplate>,
}

/// One matching algorithm over one feature representation (MFCC-DTW, fast
/// LPC-Euclidean, slow LPC-DTW, mel-cosine, ...). Each method owns its own
/// template store; `MatchMethodRegistry` runs every registered method
/// against the relevant feature matrix and hands the results to the voter.
pub trait MatchMethod: Send + Sync {
    fn name(&self) -> &'static str;
    fn feature_kind(&self) -> FeatureKind;
    fn threshold(&self) -> f32;
    fn store(&self) -> &TemplateStore;
    fn store_mut(&mut self) -> &mut TemplateStore;
    fn distance(&self, a: &Matrix, b: &Matrix) -> f32;

    /// Transform raw extracted features into the representation this
    /// method actually compares (e.g. fixed-frame resample for fast LPC).
    /// Identity by default.
    fn prepare(&self, features: &Matrix) -> Matrix {
        features.clone()
    }

    fn add_template(&mut self, command: &str, name: String, features: Matrix) {
        let prepared = self.prepare(&features);
        self.store_mut().add_template(command, name, prepared);
    }

    fn replace_templates(&mut self, command: &str, name: String, features: Matrix) {
        let prepared = self.prepare(&features);
        self.store_mut().replace_templates(command, name, prepared);
    }

    fn add_noise_template(&mut self, name: String, features: Matrix) {
        let prepared = self.prepare(&features);
        self.store_mut().add_noise_template(name, prepared);
    }

    /// Match one (already extracted) feature matrix against every loaded
    /// template, per §4.5's decision procedure.
    fn match_features(&self, features: &Matrix) -> MethodResult {
        let prepared = self.prepare(features);
        let store = self.store();

        let mut ranked = Vec::new();
        let mut best_command: Option<String> = None;
        let mut best_distance = f32::INFINITY;
        let mut best_template_name: Option<String> = None;

        for (command, templates) in store.commands() {
            for t in templates {
                let d = self.distance(&prepared, &t.features);
                ranked.push(RankedTemplate {
                    name: t.name.clone(),
                    distance: d,
                });
                if d < best_distance {
                    best_distance = d;
                    best_command = Some(command.to_string());
                    best_template_name = Some(t.name.clone());
                }
            }
        }
        ranked.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());

        let noise_distance = store
            .noise()
            .iter()
            .map(|t| self.distance(&prepared, &t.features))
            .fold(f32::INFINITY, f32::min);

        let decision = if noise_distance < best_distance {
            Decision::Noise
        } else if best_command.is_none() || best_distance > self.threshold() {
            Decision::None
        } else {
            Decision::Command(best_command.clone().unwrap())
        };

        MethodResult {
            method: self.name().to_string(),
            decision,
            best_distance,
            best_template: best_template_name,
            noise_distance,
            ranked,
        }
    }
}
