use std::collections::HashMap;

use biovox_match::{Decision, MethodResult};

use crate::config::{MethodWeights, VotingMode};

/// A candidate the voter can pick, per §4.6: `NOISE` and `NONE` are
/// distinct labels from any real command, not absorbed into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Command(String),
    Noise,
    None,
}

impl From<&Decision> for Label {
    fn from(d: &Decision) -> Self {
        match d {
            Decision::Command(c) => Label::Command(c.clone()),
            Decision::Noise => Label::Noise,
            Decision::None => Label::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VoteOutcome {
    pub label: Label,
    pub confidence: f32,
    pub method: String,
    pub best_template: Option<String>,
}

/// SNR-adaptive weight table: a descending list of `(min_snr_db, weights)`
/// bands. `resolve` returns the weight for the first band whose
/// `min_snr_db` the given SNR satisfies, falling back to `default_weight`
/// for a method the table doesn't mention (e.g. the mel matcher, which the
/// source's adaptive table never touches).
#[derive(Debug, Clone)]
pub struct AdaptiveWeightTable {
    bands: Vec<(f32, HashMap<String, f32>)>,
}

impl Default for AdaptiveWeightTable {
    fn default() -> Self {
        let high: HashMap<String, f32> = [("mfcc_dtw", 6.0), ("fast_lpc", 0.5), ("slow_lpc_dtw", 0.5)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let mid: HashMap<String, f32> = [("mfcc_dtw", 5.0), ("fast_lpc", 0.5), ("slow_lpc_dtw", 0.5)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let low: HashMap<String, f32> = [("mfcc_dtw", 4.0), ("fast_lpc", 0.5), ("slow_lpc_dtw", 0.5)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Self {
            bands: vec![(30.0, high), (15.0, mid), (f32::NEG_INFINITY, low)],
        }
    }
}

impl AdaptiveWeightTable {
    pub fn resolve(&self, method: &str, snr_db: f32, default_weight: f32) -> f32 {
        for (min_snr, weights) in &self.bands {
            if snr_db >= *min_snr {
                return weights.get(method).copied().unwrap_or(default_weight);
            }
        }
        default_weight
    }
}

/// Confidence for one method's decision per §4.6: `1.0` for `NOISE`,
/// `0.0` for `NONE`, otherwise the linear shortfall below threshold.
fn confidence(result: &MethodResult, threshold: f32) -> f32 {
    match &result.decision {
        Decision::Noise => 1.0,
        Decision::None => 0.0,
        Decision::Command(_) => (1.0 - result.best_distance / threshold).max(0.0),
    }
}

/// Super-weight added to `NOISE` by the hard-voting veto rule when the mel
/// matcher votes `NOISE` and MFCC's confidence is weak.
const VETO_SUPER_WEIGHT: f32 = 100.0;
const VETO_MFCC_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Combines every method's per-segment result into a single decision.
///
/// `thresholds` and `weights` are keyed by method name (`"mfcc_dtw"`,
/// `"fast_lpc"`, `"slow_lpc_dtw"`, `"mel_cosine"`), matching
/// `MatchMethod::name()`.
pub fn vote(
    results: &[MethodResult],
    thresholds: &HashMap<String, f32>,
    weights: &MethodWeights,
    adaptive_table: &AdaptiveWeightTable,
    snr_db: f32,
    adaptive: bool,
    mode: VotingMode,
) -> Option<VoteOutcome> {
    if results.is_empty() {
        return None;
    }

    let resolved_weight = |method: &str| -> f32 {
        let default_weight = weights.weights.get(method).copied().unwrap_or(1.0);
        if adaptive {
            adaptive_table.resolve(method, snr_db, default_weight)
        } else {
            default_weight
        }
    };

    match mode {
        VotingMode::Soft => vote_soft(results, thresholds, resolved_weight),
        VotingMode::Hard => vote_hard(results, thresholds, resolved_weight),
    }
}

fn vote_soft(
    results: &[MethodResult],
    thresholds: &HashMap<String, f32>,
    resolved_weight: impl Fn(&str) -> f32,
) -> Option<VoteOutcome> {
    let mut scores: HashMap<Label, f32> = HashMap::new();
    for r in results {
        let threshold = thresholds.get(&r.method).copied().unwrap_or(1.0);
        let conf = confidence(r, threshold);
        let weight = resolved_weight(&r.method);
        *scores.entry(Label::from(&r.decision)).or_insert(0.0) += weight * conf;
    }

    let (winner, _) = scores
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(l, s)| (l.clone(), *s))?;

    let reporter = results
        .iter()
        .filter(|r| Label::from(&r.decision) == winner)
        .max_by(|a, b| {
            resolved_weight(&a.method)
                .partial_cmp(&resolved_weight(&b.method))
                .unwrap()
        })?;

    let threshold = thresholds.get(&reporter.method).copied().unwrap_or(1.0);
    Some(VoteOutcome {
        label: winner,
        confidence: confidence(reporter, threshold),
        method: reporter.method.clone(),
        best_template: reporter.best_template.clone(),
    })
}

fn vote_hard(
    results: &[MethodResult],
    thresholds: &HashMap<String, f32>,
    resolved_weight: impl Fn(&str) -> f32,
) -> Option<VoteOutcome> {
    let mut scores: HashMap<Label, f32> = HashMap::new();
    for r in results {
        *scores.entry(Label::from(&r.decision)).or_insert(0.0) += resolved_weight(&r.method);
    }

    let mel_voted_noise = results
        .iter()
        .any(|r| r.method == "mel_cosine" && r.decision == Decision::Noise);
    if mel_voted_noise {
        if let Some(mfcc) = results.iter().find(|r| r.method == "mfcc_dtw") {
            let threshold = thresholds.get(&mfcc.method).copied().unwrap_or(1.0);
            if confidence(mfcc, threshold) < VETO_MFCC_CONFIDENCE_THRESHOLD {
                *scores.entry(Label::Noise).or_insert(0.0) += VETO_SUPER_WEIGHT;
            }
        }
    }

    let (winner, _) = scores
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(l, s)| (l.clone(), *s))?;

    let reporter = results
        .iter()
        .filter(|r| Label::from(&r.decision) == winner)
        .max_by(|a, b| {
            resolved_weight(&a.method)
                .partial_cmp(&resolved_weight(&b.method))
                .unwrap()
        })?;

    Some(VoteOutcome {
        label: winner,
        confidence: 1.0,
        method: reporter.method.clone(),
        best_template: reporter.best_template.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use biovox_match::RankedTemplate;

    fn result(method: &str, decision: Decision, best_distance: f32) -> MethodResult {
        MethodResult {
            method: method.to_string(),
            decision,
            best_distance,
            best_template: Some("tmpl".into()),
            noise_distance: f32::INFINITY,
            ranked: vec![RankedTemplate {
                name: "tmpl".into(),
                distance: best_distance,
            }],
        }
    }

    #[test]
    fn soft_vote_prefers_highest_weighted_confident_command() {
        let results = vec![
            result("mfcc_dtw", Decision::Command("JUMP".into()), 10.0),
            result("fast_lpc", Decision::Command("DUCK".into()), 1.0),
        ];
        let mut thresholds = HashMap::new();
        thresholds.insert("mfcc_dtw".to_string(), 150.0);
        thresholds.insert("fast_lpc".to_string(), 60.0);
        let weights = MethodWeights::default();
        let table = AdaptiveWeightTable::default();

        let outcome = vote(
            &results,
            &thresholds,
            &weights,
            &table,
            35.0,
            true,
            VotingMode::Soft,
        )
        .unwrap();
        assert_eq!(outcome.label, Label::Command("JUMP".into()));
    }

    #[test]
    fn noise_and_none_are_distinct_labels() {
        let results = vec![
            result("mfcc_dtw", Decision::Noise, 200.0),
            result("fast_lpc", Decision::None, 200.0),
        ];
        let thresholds = HashMap::new();
        let weights = MethodWeights::default();
        let table = AdaptiveWeightTable::default();
        let outcome = vote(
            &results,
            &thresholds,
            &weights,
            &table,
            20.0,
            true,
            VotingMode::Soft,
        )
        .unwrap();
        assert_eq!(outcome.label, Label::Noise);
    }

    #[test]
    fn adaptive_table_falls_back_to_default_weight_for_unlisted_method() {
        let table = AdaptiveWeightTable::default();
        assert_eq!(table.resolve("mel_cosine", 40.0, 1.0), 1.0);
    }

    #[test]
    fn adaptive_table_resolves_by_snr_band() {
        let table = AdaptiveWeightTable::default();
        assert_eq!(table.resolve("mfcc_dtw", 40.0, 0.0), 6.0);
        assert_eq!(table.resolve("mfcc_dtw", 20.0, 0.0), 5.0);
        assert_eq!(table.resolve("mfcc_dtw", 5.0, 0.0), 4.0);
    }

    #[test]
    fn hard_vote_veto_boosts_noise_when_mel_noise_and_mfcc_weak() {
        let results = vec![
            result("mel_cosine", Decision::Noise, 0.1),
            result("mfcc_dtw", Decision::Command("JUMP".into()), 140.0),
        ];
        let mut thresholds = HashMap::new();
        thresholds.insert("mfcc_dtw".to_string(), 150.0);
        let weights = MethodWeights::default();
        let table = AdaptiveWeightTable::default();

        let outcome = vote(
            &results,
            &thresholds,
            &weights,
            &table,
            20.0,
            false,
            VotingMode::Hard,
        )
        .unwrap();
        assert_eq!(outcome.label, Label::Noise);
    }

    #[test]
    fn empty_results_yield_no_outcome() {
        let thresholds = HashMap::new();
        let weights = MethodWeights::default();
        let table = AdaptiveWeightTable::default();
        assert!(vote(&[], &thresholds, &weights, &table, 20.0, true, VotingMode::Soft).is_none());
    }
}
