use biovox_vad::config::VadConfig;
use biovox_vad::constants::FRAME_SIZE_SAMPLES;
use biovox_vad::energy::EnergyCalculator;
use biovox_vad::threshold::AdaptiveThreshold;
use biovox_vad::types::{VadOutcome, VadState};
use biovox_vad::vad::VoiceActivityDetector;

fn loud_chunk(amplitude: i16) -> Vec<i16> {
    vec![amplitude; FRAME_SIZE_SAMPLES]
}

fn quiet_chunk() -> Vec<i16> {
    vec![0i16; FRAME_SIZE_SAMPLES]
}

#[test]
fn energy_silence_has_zero_rms() {
    let calc = EnergyCalculator::new();
    assert_eq!(calc.calculate_rms(&quiet_chunk()), 0.0);
}

#[test]
fn threshold_sits_at_midpoint_of_multipliers() {
    let config = VadConfig {
        mult_low: 2.0,
        mult_high: 4.0,
        ..Default::default()
    };
    let mut threshold = AdaptiveThreshold::new(&config);
    threshold.set_background_rms(100.0);
    assert_eq!(threshold.threshold(), 300.0);
}

#[test]
fn resetting_after_processing_clears_all_state() {
    let config = VadConfig {
        max_speech_ms: 32,
        min_speech_ms: 32,
        ..Default::default()
    };
    let mut vad = VoiceActivityDetector::new(config);
    vad.calibrate_background(10.0);

    let outcome = vad.process(&loud_chunk(5000), Vec::new);
    assert!(matches!(outcome, VadOutcome::SegmentReady(_)));
    assert_eq!(vad.current_state(), VadState::Processing);

    vad.reset();
    assert_eq!(vad.current_state(), VadState::Silence);

    // VAD accepts new input immediately after reset.
    let outcome = vad.process(&loud_chunk(5000), Vec::new);
    assert_eq!(vad.current_state(), VadState::Recording);
    assert_eq!(outcome, VadOutcome::Continue);
}

#[test]
fn full_segment_lifecycle_silence_then_speech_then_silence() {
    let config = VadConfig {
        mult_low: 1.0,
        mult_high: 1.0,
        min_speech_ms: 96,  // 3 chunks
        max_speech_ms: 1500,
        silence_ms: 96, // 3 chunks
        pre_roll_ms: 32,
        frame_size_samples: FRAME_SIZE_SAMPLES,
        sample_rate_hz: 16_000,
    };
    let mut vad = VoiceActivityDetector::new(config);
    vad.calibrate_background(10.0);

    // Background silence doesn't trigger recording.
    for _ in 0..5 {
        let outcome = vad.process(&quiet_chunk(), Vec::new);
        assert_eq!(outcome, VadOutcome::Continue);
        assert_eq!(vad.current_state(), VadState::Silence);
    }

    // Speech onset pulls in pre-roll and starts RECORDING.
    let pre_roll = vec![3i16; FRAME_SIZE_SAMPLES / 2];
    vad.process(&loud_chunk(5000), || pre_roll.clone());
    assert_eq!(vad.current_state(), VadState::Recording);

    // Sustained speech.
    for _ in 0..4 {
        let outcome = vad.process(&loud_chunk(5000), Vec::new);
        assert_eq!(outcome, VadOutcome::Continue);
    }

    // Trailing silence eventually closes the segment.
    let mut segment = None;
    for _ in 0..4 {
        match vad.process(&quiet_chunk(), Vec::new) {
            VadOutcome::SegmentReady(s) => {
                segment = Some(s);
                break;
            }
            VadOutcome::Continue => {}
            VadOutcome::Discarded => panic!("segment should have met min_speech_ms"),
        }
    }

    let segment = segment.expect("expected a completed segment");
    assert!(segment.len() >= pre_roll.len());
    assert_eq!(vad.current_state(), VadState::Processing);
}
