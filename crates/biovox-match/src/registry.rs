use std::collections::HashMap;

use biovox_features::Matrix;

use crate::method::{FeatureKind, MatchMethod, MethodResult};

/// Registers every matcher method the voice controller should run. Rather
/// than picking one method and failing over, every registered method runs
/// against the feature kind it needs and hands its result to the voter.
#[derive(Default)]
pub struct MatchMethodRegistry {
    methods: Vec<Box<dyn MatchMethod>>,
}

impl MatchMethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: Box<dyn MatchMethod>) {
        self.methods.push(method);
    }

    pub fn method_mut(&mut self, name: &str) -> Option<&mut Box<dyn MatchMethod>> {
        self.methods.iter_mut().find(|m| m.name() == name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &Box<dyn MatchMethod>> {
        self.methods.iter()
    }

    pub fn methods_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn MatchMethod>> {
        self.methods.iter_mut()
    }

    pub fn feature_kinds_needed(&self) -> Vec<FeatureKind> {
        let mut seen = std::collections::HashSet::new();
        self.methods
            .iter()
            .map(|m| m.feature_kind())
            .filter(|k| seen.insert(*k))
            .collect()
    }

    /// Runs every registered method against the feature matrix it needs.
    /// Methods whose required `FeatureKind` is missing from `features` are
    /// skipped (the controller failed to extract that kind for this
    /// segment, e.g. due to a `FeatureExtractionError`).
    pub fn match_all(&self, features: &HashMap<FeatureKind, Matrix>) -> Vec<MethodResult> {
        self.methods
            .iter()
            .filter_map(|method| {
                features
                    .get(&method.feature_kind())
                    .map(|m| method.match_features(m))
            })
            .collect()
    }
}
