// Logging behavior:
// - Writes logs to both stderr and a daily-rotated file at logs/biovox.log.
// - Default log level is INFO. Control via RUST_LOG, e.g.:
//   * RUST_LOG=debug                       # verbose, includes VAD state transitions
//   * RUST_LOG=biovox_voice=trace          # fine-grained per-crate control
// - logs/ is created on startup if missing; file output uses a non-blocking writer
//   and disables ANSI so the file stays clean for offline analysis.
mod config;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use biovox_audio::{CaptureSource, CpalCaptureSource, DeviceManager};
use biovox_bus::{EventBus, EventData, EventType};
use biovox_ecg::{default_opener, EcgManager};
use biovox_foundation::{AppState, HealthCheck, HealthMonitor, ShutdownHandler, StateManager};
use biovox_match::{FastLpcMatcher, MatchMethodRegistry, MelCosineMatcher, MfccDtwMatcher, SlowLpcDtwMatcher};
use biovox_voice::{load_template_directory, LpcMatcherMode, VoiceController};

use config::AppConfig;

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "biovox.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);
    let file_layer = fmt::layer().with_writer(non_blocking_file).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Removes rotated log files in `logs/` older than `retention_days` days.
/// `retention_days == 0` disables pruning.
fn prune_old_logs(retention_days: u64) {
    if retention_days == 0 {
        tracing::debug!("log retention disabled (retention_days=0)");
        return;
    }
    let Some(cutoff) = SystemTime::now().checked_sub(Duration::from_secs(retention_days * 24 * 60 * 60)) else {
        return;
    };
    let logs_dir = Path::new("logs");
    if !logs_dir.exists() {
        return;
    }
    let Ok(entries) = fs::read_dir(logs_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if !name.starts_with("biovox.log.") {
            continue;
        }
        if let Ok(meta) = entry.metadata() {
            if let Ok(modified) = meta.modified() {
                if modified < cutoff {
                    match fs::remove_file(&path) {
                        Ok(()) => tracing::info!(file = %path.display(), "removed old log file"),
                        Err(e) => tracing::warn!(file = %path.display(), error = %e, "failed to remove old log"),
                    }
                }
            }
        }
    }
}

/// Reports component state to the health monitor without owning it;
/// `EcgManager` and `VoiceController` run on their own threads, so this
/// check only confirms the recognition threads are still alive.
struct ThreadAliveCheck {
    name: &'static str,
    running: Arc<std::sync::atomic::AtomicBool>,
}

impl HealthCheck for ThreadAliveCheck {
    fn check(&self) -> Result<(), String> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(format!("{} thread has stopped", self.name))
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[derive(Parser, Debug)]
#[command(name = "biovox", author, version, about = "ECG peak detector and voice command engine")]
struct Cli {
    /// List available audio input devices and exit
    #[arg(long = "list-devices")]
    list_devices: bool,

    /// Path to a TOML configuration file (defaults to ./biovox.toml if present)
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Directory of WAV command/noise templates, overriding the config value
    #[arg(long = "templates-dir")]
    templates_dir: Option<PathBuf>,

    /// Serial port for the ECG device, overriding the config value
    #[arg(long = "ecg-port")]
    ecg_port: Option<String>,
}

fn build_registry(config: &config::AppConfig) -> MatchMethodRegistry {
    let mut registry = MatchMethodRegistry::new();
    registry.register(Box::new(MfccDtwMatcher::new(config.voice.thresholds.mfcc_dtw).with_radius(config.voice.dtw_radius)));
    match config.voice.lpc_matcher_mode {
        LpcMatcherMode::Fast => registry.register(Box::new(FastLpcMatcher::new(config.voice.thresholds.lpc))),
        LpcMatcherMode::Slow => registry.register(Box::new(SlowLpcDtwMatcher::new(config.voice.thresholds.lpc))),
    }
    registry.register(Box::new(MelCosineMatcher::new(config.voice.thresholds.mel_cosine)));
    registry
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = init_logging()?;
    tracing::info!("starting biovox");

    let cli = Cli::parse();

    if cli.list_devices {
        let dm = DeviceManager::new()?;
        tracing::info!("cpal host: {:?}", dm.host_id());
        println!("Input devices (host: {:?}):", dm.host_id());
        for d in dm.enumerate_devices() {
            let def = if d.is_default { " (default)" } else { "" };
            println!("- {}{}", d.name, def);
        }
        return Ok(());
    }

    let mut config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to load configuration, using defaults");
        AppConfig::default()
    });
    if let Some(dir) = &cli.templates_dir {
        config.templates_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(port) = &cli.ecg_port {
        config.ecg.port = Some(port.clone());
    }
    if let Some(device) = &config.device {
        tracing::info!(device, "using configured capture device");
    }

    prune_old_logs(config.log_retention_days);

    let state_manager = StateManager::new();
    let health_monitor = HealthMonitor::new(Duration::from_secs(10));

    let bus = Arc::new(EventBus::new());
    bus.start()?;

    let mut registry = build_registry(&config);
    let templates_path = PathBuf::from(&config.templates_dir);
    if templates_path.is_dir() {
        match load_template_directory(&templates_path, &config.command_mappings, &mut registry, &config.voice) {
            Ok(n) => tracing::info!(count = n, dir = %templates_path.display(), "loaded voice templates"),
            Err(e) => tracing::warn!(error = %e, dir = %templates_path.display(), "failed to load templates, starting with an empty bank"),
        }
    } else {
        tracing::warn!(dir = %templates_path.display(), "templates directory not found, starting with an empty bank");
    }

    let capture: Box<dyn CaptureSource> = Box::new(CpalCaptureSource::new(config.device.clone()));
    let voice_controller = VoiceController::new(config.voice.clone(), Arc::clone(&bus), capture, registry);
    let calibration = voice_controller.calibration_handle();

    let voice_running = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let voice_handle = voice_controller.spawn(Arc::clone(&voice_running));
    health_monitor.register(Box::new(ThreadAliveCheck {
        name: "voice",
        running: Arc::clone(&voice_running),
    }));

    let ecg_running = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let ecg_opener = default_opener(config.ecg.clone());
    let ecg_manager = EcgManager::new(config.ecg.clone(), Arc::clone(&bus), ecg_opener, std::time::Instant::now());
    let ecg_handle = ecg_manager.spawn(Arc::clone(&ecg_running));
    health_monitor.register(Box::new(ThreadAliveCheck {
        name: "ecg",
        running: Arc::clone(&ecg_running),
    }));

    let _health_monitor = health_monitor.start();
    let shutdown = ShutdownHandler::new().install().await;

    state_manager.transition(AppState::Running)?;
    tracing::info!("application state: Running");

    let bpm_log = Arc::new(std::sync::atomic::AtomicU64::new(0));
    let bpm_log_clone = Arc::clone(&bpm_log);
    bus.subscribe(EventType::EcgBpmUpdate, move |event| {
        if let EventData::EcgBpmUpdate { bpm } = &event.data {
            bpm_log_clone.store(bpm.to_bits() as u64, Ordering::Relaxed);
        }
    });
    bus.subscribe(EventType::VoiceCommand, |event| {
        if let EventData::VoiceCommand { command, confidence, method, .. } = &event.data {
            tracing::info!(%command, %confidence, %method, "voice command recognised");
        }
    });
    bus.subscribe(EventType::VoiceNoise, |_| {
        tracing::debug!("voice segment classified as noise");
    });
    bus.subscribe(EventType::CalibrationResult, |event| {
        if let EventData::CalibrationResult { command, success } = &event.data {
            tracing::info!(%command, success = *success, "calibration finished");
        }
    });

    // Suppress an unused-binding warning: calibration is the public handle
    // an operator-facing control surface (CLI/IPC) would drive; this binary
    // doesn't yet expose one, but the controller itself owns it correctly.
    let _ = &calibration;

    let mut stats_interval = tokio::time::interval(Duration::from_secs(30));
    tokio::select! {
        _ = shutdown.wait() => {
            tracing::info!("shutdown signal received");
        }
        _ = async {
            loop {
                stats_interval.tick().await;
                let bpm = f32::from_bits(bpm_log.load(Ordering::Relaxed) as u32);
                tracing::info!(bpm, healthy = health_monitor_all_healthy(&_health_monitor), "pipeline running");
            }
        } => {}
    }

    tracing::debug!("beginning graceful shutdown");
    state_manager.transition(AppState::Stopping)?;
    voice_running.store(false, Ordering::SeqCst);
    ecg_running.store(false, Ordering::SeqCst);
    let _ = voice_handle.join();
    let _ = ecg_handle.join();
    bus.stop()?;
    state_manager.transition(AppState::Stopped)?;
    tracing::debug!("shutdown complete");

    Ok(())
}

fn health_monitor_all_healthy(monitor: &HealthMonitor) -> bool {
    monitor.all_healthy()
}
