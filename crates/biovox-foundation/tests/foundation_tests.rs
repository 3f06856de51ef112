//! Foundation crate tests
//!
//! Tests cover clock abstraction (RealClock, TestClock, SharedClock) and the
//! layered error taxonomy (BioVoxError, AudioError, EcgError, VadError, MatchError).

use biovox_foundation::clock::{real_clock, test_clock, Clock, RealClock, TestClock};
use biovox_foundation::error::{
    AudioError, BioVoxError, ConfigError, EcgError, MatchError, RecoveryStrategy, VadError,
};
use std::time::{Duration, Instant};

// ─── RealClock Tests ────────────────────────────────────────────────

#[test]
fn real_clock_now_returns_current_time() {
    let clock = RealClock::new();
    let before = Instant::now();
    let clock_time = clock.now();
    let after = Instant::now();
    assert!(clock_time >= before);
    assert!(clock_time <= after);
}

#[test]
fn real_clock_factory_function() {
    let clock = real_clock();
    let t = clock.now();
    assert!(t.elapsed() < Duration::from_secs(1));
}

// ─── TestClock Tests ────────────────────────────────────────────────

#[test]
fn test_clock_advance() {
    let clock = TestClock::new();
    let t0 = clock.now();
    clock.advance(Duration::from_secs(5));
    let t1 = clock.now();
    assert_eq!(t1.duration_since(t0), Duration::from_secs(5));
}

#[test]
fn test_clock_advance_accumulates() {
    let clock = TestClock::new();
    let start = clock.now();
    clock.advance(Duration::from_millis(100));
    clock.advance(Duration::from_millis(200));
    clock.advance(Duration::from_millis(300));
    let elapsed = clock.now().duration_since(start);
    assert_eq!(elapsed, Duration::from_millis(600));
}

#[test]
fn test_clock_sleep_advances_time() {
    let clock = TestClock::new();
    let t0 = clock.now();
    clock.sleep(Duration::from_secs(10));
    let t1 = clock.now();
    assert_eq!(t1.duration_since(t0), Duration::from_secs(10));
}

#[test]
fn test_clock_factory_function() {
    let clock = test_clock();
    let t = clock.now();
    clock.sleep(Duration::from_secs(1));
    let t2 = clock.now();
    assert_eq!(t2.duration_since(t), Duration::from_secs(1));
}

// ─── Error Type Tests ───────────────────────────────────────────────

#[test]
fn audio_error_device_not_found() {
    let err = AudioError::DeviceNotFound {
        name: Some("test_mic".to_string()),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("test_mic"));
}

#[test]
fn audio_error_buffer_overflow() {
    let err = AudioError::BufferOverflow { count: 512 };
    let msg = format!("{}", err);
    assert!(msg.contains("512"));
}

#[test]
fn ecg_error_serial_open_failed() {
    let err = EcgError::SerialOpenFailed {
        port: "/dev/ttyUSB0".to_string(),
        reason: "permission denied".to_string(),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("/dev/ttyUSB0"));
    assert!(msg.contains("permission denied"));
}

#[test]
fn ecg_error_no_signal_timeout_recovers_to_fallback() {
    let err = BioVoxError::Ecg(EcgError::NoSignalTimeout {
        duration: Duration::from_secs(5),
    });
    assert!(matches!(
        err.recovery_strategy(),
        RecoveryStrategy::Fallback { .. }
    ));
}

#[test]
fn vad_error_segment_too_short() {
    let err = VadError::SegmentTooShort { n_samples: 40 };
    let msg = format!("{}", err);
    assert!(msg.contains('4'));
}

#[test]
fn match_error_no_templates() {
    let err = MatchError::NoTemplates {
        method: "mfcc_dtw".to_string(),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("mfcc_dtw"));
}

#[test]
fn biovox_error_from_audio_error() {
    let audio_err = AudioError::DeviceDisconnected;
    let err: BioVoxError = audio_err.into();
    assert!(matches!(err, BioVoxError::Audio(_)));
}

#[test]
fn biovox_error_from_ecg_error() {
    let ecg_err = EcgError::NoPortsAvailable;
    let err: BioVoxError = ecg_err.into();
    assert!(matches!(err, BioVoxError::Ecg(_)));
}

#[test]
fn biovox_error_from_vad_error() {
    let vad_err = VadError::ProcessingFailed("test".to_string());
    let err: BioVoxError = vad_err.into();
    assert!(matches!(err, BioVoxError::Vad(_)));
}

#[test]
fn biovox_error_shutdown() {
    let err = BioVoxError::ShutdownRequested;
    let msg = format!("{}", err);
    assert!(msg.contains("shutdown"));
}

#[test]
fn biovox_error_fatal_recovery_is_fatal() {
    let err = BioVoxError::Fatal("critical failure".to_string());
    assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Fatal));
}

#[test]
fn config_error_validation() {
    let err = ConfigError::Validation {
        field: "sample_rate".to_string(),
        reason: "must be 16000".to_string(),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("sample_rate"));
}
