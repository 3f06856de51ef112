use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use biovox_bus::{EventBus, EventData};
use biovox_foundation::EcgError;
use tracing::{info, warn};

use crate::config::EcgConfig;
use crate::filter_chain::EcgFilterChain;
use crate::peak_detector::{PeakDetector, PeakDetectorConfig};
use crate::serial::{auto_detect_port_name, parse_ecg_line, RealSerialPort, SerialPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Real,
    Fallback,
}

type PortOpener = Box<dyn FnMut() -> Result<Box<dyn SerialPort>, EcgError> + Send>;

/// Opens a `RealSerialPort` against the configured port name, or
/// auto-detects one (preferring an "Arduino" description) when unset.
pub fn default_opener(config: EcgConfig) -> PortOpener {
    Box::new(move || {
        let port_name = match &config.port {
            Some(name) => name.clone(),
            None => auto_detect_port_name()?,
        };
        let timeout = Duration::from_millis(200);
        RealSerialPort::open(&port_name, config.baud, timeout).map(|p| Box::new(p) as Box<dyn SerialPort>)
    })
}

/// REAL/FALLBACK adapter over the ECG filter chain and peak detector:
/// while a serial device is readable and producing a plausible heart rate,
/// consumers see real beats; otherwise a synthetic stream of the same
/// shape keeps the event contract unbroken.
pub struct EcgManager {
    config: EcgConfig,
    bus: Arc<EventBus>,
    opener: PortOpener,

    state: ManagerState,
    port: Option<Box<dyn SerialPort>>,
    filter: EcgFilterChain,
    detector: PeakDetector,

    last_peak_at: Instant,
    next_fallback_peak_at: Instant,
    next_retry_at: Instant,
    fallback_dir: i8,
}

impl EcgManager {
    pub fn new(config: EcgConfig, bus: Arc<EventBus>, mut opener: PortOpener, now: Instant) -> Self {
        let filter = EcgFilterChain::new(config.sample_rate);
        let detector = PeakDetector::new(PeakDetectorConfig {
            sample_rate: config.sample_rate,
            ..Default::default()
        });

        let (state, port) = match opener() {
            Ok(port) => {
                info!(port = port.port_name(), "ECG serial port opened");
                (ManagerState::Real, Some(port))
            }
            Err(e) => {
                warn!(error = %e, "ECG serial port unavailable, starting in fallback");
                (ManagerState::Fallback, None)
            }
        };

        let fallback_period = Duration::from_secs_f32(60.0 / config.fallback_bpm.max(1.0));
        let retry_period = Duration::from_secs_f32(config.retry_interval_secs.max(0.1));

        Self {
            config,
            bus,
            opener,
            state,
            port,
            filter,
            detector,
            last_peak_at: now,
            next_fallback_peak_at: now + fallback_period,
            next_retry_at: now + retry_period,
            fallback_dir: -1,
        }
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn bpm(&self) -> f32 {
        self.detector.bpm()
    }

    /// Advances the manager by one pacing step. Called in a loop with a
    /// short pacing sleep between calls (1 ms in production, driven
    /// directly by tests).
    pub fn tick(&mut self, now: Instant) {
        match self.state {
            ManagerState::Real => self.tick_real(now),
            ManagerState::Fallback => self.tick_fallback(now),
        }
    }

    fn tick_real(&mut self, now: Instant) {
        let Some(port) = self.port.as_mut() else {
            self.enter_fallback(now);
            return;
        };

        match port.read_line() {
            Ok(Some(line)) => {
                if let Some(sample) = parse_ecg_line(&line) {
                    let (display, mwi) = self.filter.process_sample(sample);
                    if let Some(event) = self.detector.process_sample(display, mwi) {
                        self.last_peak_at = now;
                        self.bus.publish(EventData::EcgPeak {
                            amplitude: event.amplitude,
                            dir: event.dir,
                            bpm: event.bpm,
                        });
                        self.bus.publish(EventData::EcgBpmUpdate { bpm: event.bpm });

                        if event.bpm > 0.0 && event.bpm < self.config.bpm_threshold {
                            warn!(bpm = event.bpm, "ECG bpm below threshold, entering fallback");
                            self.enter_fallback(now);
                        }
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "ECG serial read error, entering fallback");
                self.enter_fallback(now);
                return;
            }
        }

        let since_last_peak = now.duration_since(self.last_peak_at);
        if since_last_peak.as_secs_f32() >= self.config.no_signal_timeout_secs {
            warn!(
                timeout_s = self.config.no_signal_timeout_secs,
                "no ECG signal, entering fallback"
            );
            self.bus.publish(EventData::EcgError {
                message: format!(
                    "no ECG signal for {:.1}s",
                    since_last_peak.as_secs_f32()
                ),
            });
            self.enter_fallback(now);
        }
    }

    fn tick_fallback(&mut self, now: Instant) {
        if now >= self.next_fallback_peak_at {
            let period = Duration::from_secs_f32(60.0 / self.config.fallback_bpm.max(1.0));
            self.next_fallback_peak_at = now + period;
            self.fallback_dir = -self.fallback_dir;

            self.bus.publish(EventData::EcgPeak {
                amplitude: 300.0,
                dir: self.fallback_dir,
                bpm: self.config.fallback_bpm,
            });
            self.bus.publish(EventData::EcgBpmUpdate {
                bpm: self.config.fallback_bpm,
            });
        }

        if now >= self.next_retry_at {
            let retry_period = Duration::from_secs_f32(self.config.retry_interval_secs.max(0.1));
            self.next_retry_at = now + retry_period;

            match (self.opener)() {
                Ok(port) => {
                    info!(port = port.port_name(), "ECG serial port recovered");
                    self.port = Some(port);
                    self.filter = EcgFilterChain::new(self.config.sample_rate);
                    self.detector = PeakDetector::new(PeakDetectorConfig {
                        sample_rate: self.config.sample_rate,
                        ..Default::default()
                    });
                    self.last_peak_at = now;
                    self.state = ManagerState::Real;
                }
                Err(_) => {
                    // stays in fallback, will retry again at the next interval
                }
            }
        }
    }

    fn enter_fallback(&mut self, now: Instant) {
        self.port = None;
        self.state = ManagerState::Fallback;
        let period = Duration::from_secs_f32(60.0 / self.config.fallback_bpm.max(1.0));
        self.next_fallback_peak_at = now + period;
        let retry_period = Duration::from_secs_f32(self.config.retry_interval_secs.max(0.1));
        self.next_retry_at = now + retry_period;
    }

    /// Runs the tick loop until `running` clears, pacing with a 1 ms sleep
    /// between iterations as the concurrency model specifies.
    pub fn spawn(mut self, running: Arc<AtomicBool>) -> JoinHandle<()> {
        thread::Builder::new()
            .name("biovox-ecg".into())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    self.tick(Instant::now());
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .expect("failed to spawn ECG processing thread")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct FakePort {
        lines: VecDeque<String>,
    }

    impl SerialPort for FakePort {
        fn read_line(&mut self) -> std::io::Result<Option<String>> {
            Ok(self.lines.pop_front())
        }

        fn port_name(&self) -> &str {
            "FAKE"
        }
    }

    fn unopenable_opener() -> PortOpener {
        Box::new(|| {
            Err(EcgError::SerialOpenFailed {
                port: "FAKE".into(),
                reason: "no device".into(),
            })
        })
    }

    #[test]
    fn starts_in_fallback_when_port_cannot_open() {
        let bus = Arc::new(EventBus::new());
        let manager = EcgManager::new(
            EcgConfig::default(),
            bus,
            unopenable_opener(),
            Instant::now(),
        );
        assert_eq!(manager.state(), ManagerState::Fallback);
    }

    #[test]
    fn fallback_emits_peak_at_configured_period() {
        let bus = Arc::new(EventBus::new());
        let received = Arc::new(Mutex::new(0usize));
        let received_clone = Arc::clone(&received);
        bus.subscribe(biovox_bus::EventType::EcgPeak, move |_| {
            *received_clone.lock().unwrap() += 1;
        });

        let config = EcgConfig {
            fallback_bpm: 75.0,
            ..Default::default()
        };
        let start = Instant::now();
        let mut manager = EcgManager::new(config, Arc::clone(&bus), unopenable_opener(), start);

        let period = Duration::from_secs_f32(60.0 / 75.0);
        manager.tick(start + period + Duration::from_millis(1));
        assert_eq!(*received.lock().unwrap(), 1);
    }

    #[test]
    fn fallback_alternates_dir_each_emission() {
        let bus = Arc::new(EventBus::new());
        let dirs = Arc::new(Mutex::new(Vec::new()));
        let dirs_clone = Arc::clone(&dirs);
        bus.subscribe(biovox_bus::EventType::EcgPeak, move |event| {
            if let biovox_bus::EventData::EcgPeak { dir, .. } = event.data {
                dirs_clone.lock().unwrap().push(dir);
            }
        });

        let config = EcgConfig {
            fallback_bpm: 120.0,
            ..Default::default()
        };
        let start = Instant::now();
        let mut manager = EcgManager::new(config, bus, unopenable_opener(), start);
        let period = Duration::from_secs_f32(60.0 / 120.0);
        for i in 1..=4 {
            manager.tick(start + period * i + Duration::from_millis(1));
        }

        let dirs = dirs.lock().unwrap();
        assert_eq!(dirs.len(), 4);
        for pair in dirs.windows(2) {
            assert_eq!(pair[0], -pair[1]);
        }
    }

    #[test]
    fn real_port_parses_lines_and_feeds_detector() {
        let bus = Arc::new(EventBus::new());
        let mut lines = VecDeque::new();
        for _ in 0..2000 {
            lines.push_back("0.0".to_string());
        }
        let port: Box<dyn SerialPort> = Box::new(FakePort { lines });
        let opener: PortOpener = Box::new(move || {
            // only succeeds once; consumed via take-like pattern below
            Err(EcgError::SerialOpenFailed {
                port: "FAKE".into(),
                reason: "already consumed".into(),
            })
        });

        let config = EcgConfig::default();
        let start = Instant::now();
        let mut manager = EcgManager::new(config, bus, opener, start);
        // Manually install the fake port since our opener above cannot
        // hand out a boxed trait object twice.
        manager.port = Some(port);
        manager.state = ManagerState::Real;

        for _ in 0..2000 {
            manager.tick(Instant::now());
        }
        // no panics, no parse errors surfaced as crashes
        assert!(manager.bpm() >= 0.0);
    }
}
