use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

use biovox_audio::CaptureSource;
use biovox_bus::{EventBus, EventData};
use biovox_features::{preprocess, Matrix};
use biovox_match::{FeatureKind, MatchMethodRegistry};
use biovox_vad::{VadOutcome, VoiceActivityDetector};

use crate::config::VoiceConfig;
use crate::templates::{add_command_to_registry, extract_for_registry, replace_command_in_registry};
use crate::voter::{self, AdaptiveWeightTable, Label};

#[derive(Debug, Clone)]
struct CalibrationState {
    command: String,
    freedom: bool,
    started_at: Instant,
}

/// Shared handle the owning application uses to drive calibration mode
/// from outside the recognition thread.
#[derive(Clone)]
pub struct CalibrationHandle {
    state: Arc<Mutex<Option<CalibrationState>>>,
}

impl CalibrationHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(None)),
        }
    }

    pub fn start(&self, command: impl Into<String>, freedom: bool) {
        *self.state.lock() = Some(CalibrationState {
            command: command.into(),
            freedom,
            started_at: Instant::now(),
        });
    }

    pub fn stop(&self) {
        *self.state.lock() = None;
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().is_some()
    }

    fn snapshot(&self) -> Option<CalibrationState> {
        self.state.lock().clone()
    }
}

fn rms_f32(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    ((sum_sq / samples.len() as f64).sqrt()) as f32
}

/// Orchestrates the voice half of the pipeline: capture -> VAD -> feature
/// extraction (memoised per segment) -> per-method matching -> ensemble
/// voting -> event publication, per §4.7. Runs on a single recognition
/// thread; VAD and matcher state are touched only there.
pub struct VoiceController {
    config: VoiceConfig,
    bus: Arc<EventBus>,
    capture: Box<dyn CaptureSource>,
    vad: VoiceActivityDetector,
    registry: MatchMethodRegistry,
    calibration: CalibrationHandle,
    thresholds: HashMap<String, f32>,
    adaptive_table: AdaptiveWeightTable,
    background_rms: f32,
}

impl VoiceController {
    pub fn new(
        config: VoiceConfig,
        bus: Arc<EventBus>,
        capture: Box<dyn CaptureSource>,
        registry: MatchMethodRegistry,
    ) -> Self {
        let vad = VoiceActivityDetector::new(config.vad.clone());
        let mut thresholds = HashMap::new();
        thresholds.insert("mfcc_dtw".to_string(), config.thresholds.mfcc_dtw);
        thresholds.insert("fast_lpc".to_string(), config.thresholds.lpc);
        thresholds.insert("slow_lpc_dtw".to_string(), config.thresholds.lpc);
        thresholds.insert("mel_cosine".to_string(), config.thresholds.mel_cosine);

        Self {
            config,
            bus,
            capture,
            vad,
            registry,
            calibration: CalibrationHandle::new(),
            thresholds,
            adaptive_table: AdaptiveWeightTable::default(),
            background_rms: 0.0,
        }
    }

    pub fn calibration_handle(&self) -> CalibrationHandle {
        self.calibration.clone()
    }

    /// Runs the recognition loop until `running` clears. Calibrates
    /// background RMS, seeds noise templates, then drains the capture
    /// source and feeds the VAD/matcher/voter chain for every segment.
    pub fn spawn(mut self, running: Arc<AtomicBool>) -> JoinHandle<()> {
        thread::Builder::new()
            .name("biovox-voice".into())
            .spawn(move || {
                if let Err(e) = self.capture.start() {
                    warn!(error = %e, "audio capture unavailable, voice engine disabled");
                    self.bus.publish(EventData::VoiceError {
                        message: format!("audio device unavailable: {e}"),
                    });
                    return;
                }

                self.background_rms = self.capture.measure_background(500);
                self.vad.calibrate_background(self.background_rms);
                self.seed_noise_templates();

                while running.load(Ordering::SeqCst) {
                    self.check_calibration_timeout();

                    let chunk = self.capture.get_chunk(Duration::from_millis(100));
                    if chunk.is_empty() {
                        continue;
                    }

                    let pre_roll_ms = self.config.vad.pre_roll_ms;
                    let outcome = {
                        let capture = &self.capture;
                        self.vad.process(&chunk, || capture.get_pre_roll(pre_roll_ms))
                    };

                    if let VadOutcome::SegmentReady(segment) = outcome {
                        self.handle_segment(segment);
                        self.vad.reset();
                    }
                }
            })
            .expect("failed to spawn voice recognition thread")
    }

    fn seed_noise_templates(&mut self) {
        for i in 0..self.config.noise_seed_count {
            let mut collected = Vec::new();
            let target_len = (self.config.vad.sample_rate_hz as u64
                * self.config.noise_seed_segment_ms as u64
                / 1000) as usize;
            let deadline = Instant::now() + Duration::from_secs(3);
            while collected.len() < target_len && Instant::now() < deadline {
                let chunk = self.capture.get_chunk(Duration::from_millis(100));
                collected.extend(chunk);
            }
            if collected.is_empty() {
                continue;
            }
            let preprocessed = preprocess(&collected);
            let features = extract_for_registry(&self.registry, &preprocessed, &self.config);
            crate::templates::add_noise_seed(&mut self.registry, format!("startup_noise_{i}"), &features);
        }
        info!(count = self.config.noise_seed_count, "seeded noise templates from ambient recording");
    }

    fn check_calibration_timeout(&mut self) {
        if let Some(cal) = self.calibration.snapshot() {
            let timeout = Duration::from_secs(self.config.calibration_timeout_secs);
            if cal.started_at.elapsed() >= timeout {
                warn!(command = %cal.command, "calibration timed out");
                self.bus.publish(EventData::CalibrationResult {
                    command: cal.command,
                    success: false,
                });
                self.calibration.stop();
            }
        }
    }

    fn handle_segment(&mut self, segment: Vec<i16>) {
        if let Some(cal) = self.calibration.snapshot() {
            if cal.freedom {
                self.try_freedom_calibration(&cal.command, &segment);
            } else {
                self.try_guided_calibration(&cal.command, &segment);
            }
            return;
        }
        self.process_segment(segment);
    }

    fn try_freedom_calibration(&mut self, command: &str, segment: &[i16]) {
        let length_ms =
            segment.len() as f32 * 1000.0 / self.config.vad.sample_rate_hz as f32;
        let rms = rms_f32(segment);
        let min_rms = self.background_rms * self.config.freedom_min_rms_multiplier;

        if length_ms < self.config.freedom_min_length_ms as f32 || rms < min_rms {
            return;
        }

        let preprocessed = preprocess(segment);
        let features = extract_for_registry(&self.registry, &preprocessed, &self.config);
        replace_command_in_registry(&mut self.registry, command, format!("{command}_freedom"), &features);

        info!(command, "freedom-mode calibration captured template");
        self.bus.publish(EventData::CalibrationResult {
            command: command.to_string(),
            success: true,
        });
        self.calibration.stop();
    }

    fn try_guided_calibration(&mut self, command: &str, segment: &[i16]) {
        let preprocessed = preprocess(segment);
        let sample_rate = self.config.vad.sample_rate_hz;
        let snr_db = biovox_features::estimate_snr_db(&preprocessed, sample_rate);
        let features = extract_for_registry(&self.registry, &preprocessed, &self.config);
        let feature_map: HashMap<FeatureKind, Matrix> = features.iter().cloned().collect();
        let results = self.registry.match_all(&feature_map);

        let outcome = voter::vote(
            &results,
            &self.thresholds,
            &self.config.weights,
            &self.adaptive_table,
            snr_db,
            self.config.adaptive_weighting,
            self.config.voting_mode,
        );

        match outcome.map(|o| o.label) {
            Some(Label::Command(c)) if c == command => {
                add_command_to_registry(
                    &mut self.registry,
                    command,
                    format!("{command}_calibrated_{}", now_suffix()),
                    &features,
                );
                info!(command, "calibration recognised target command, template added");
                self.bus.publish(EventData::CalibrationResult {
                    command: command.to_string(),
                    success: true,
                });
                self.calibration.stop();
            }
            _ => {
                // keep waiting for a matching utterance, or for the
                // timeout checked at the top of the loop
            }
        }
    }

    fn process_segment(&mut self, segment: Vec<i16>) {
        let preprocessed = preprocess(&segment);
        let sample_rate = self.config.vad.sample_rate_hz;
        let snr_db = biovox_features::estimate_snr_db(&preprocessed, sample_rate);

        let features = extract_for_registry(&self.registry, &preprocessed, &self.config);
        let feature_map: HashMap<FeatureKind, Matrix> = features.into_iter().collect();
        let results = self.registry.match_all(&feature_map);

        let outcome = voter::vote(
            &results,
            &self.thresholds,
            &self.config.weights,
            &self.adaptive_table,
            snr_db,
            self.config.adaptive_weighting,
            self.config.voting_mode,
        );

        let per_method_distances: Vec<(String, f32)> = results
            .iter()
            .map(|r| (r.method.clone(), r.best_distance))
            .collect();

        match outcome {
            Some(o) => match o.label {
                Label::Command(command) => {
                    self.bus.publish(EventData::VoiceCommand {
                        command,
                        confidence: o.confidence,
                        method: o.method,
                        best_template: o.best_template.unwrap_or_default(),
                        snr_db,
                        per_method_distances,
                    });
                }
                Label::Noise => {
                    self.bus.publish(EventData::VoiceNoise { snr_db });
                }
                Label::None => {
                    tracing::debug!(snr_db, "no method matched above threshold");
                }
            },
            None => {
                tracing::debug!("no matcher methods registered, nothing to vote on");
            }
        }
    }
}

fn now_suffix() -> u64 {
    use std::sync::atomic::AtomicU64;
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
