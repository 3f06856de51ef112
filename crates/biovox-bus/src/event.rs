use std::time::Instant;

/// Discriminant used for subscription routing. One variant per event kind
/// published anywhere in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    EcgPeak,
    EcgBpmUpdate,
    EcgError,
    VoiceCommand,
    VoiceNoise,
    VoiceError,
    CalibrationResult,
    PlaybackStart,
    PlaybackComplete,
    SystemShutdown,
}

/// Payload carried by an event. Each variant's fields are exactly the keys
/// named for that event kind in the component design.
#[derive(Debug, Clone)]
pub enum EventData {
    EcgPeak {
        amplitude: f32,
        dir: i8,
        bpm: f32,
    },
    EcgBpmUpdate {
        bpm: f32,
    },
    EcgError {
        message: String,
    },
    VoiceCommand {
        command: String,
        confidence: f32,
        method: String,
        best_template: String,
        snr_db: f32,
        /// Best distance from every registered matcher method, `(method,
        /// distance)`, for downstream diagnostics. Preserved per §9's
        /// design note that per-template distances must not be optimised
        /// away down to just the winning method's minimum.
        per_method_distances: Vec<(String, f32)>,
    },
    VoiceNoise {
        snr_db: f32,
    },
    VoiceError {
        message: String,
    },
    CalibrationResult {
        command: String,
        success: bool,
    },
    PlaybackStart {
        command: String,
    },
    PlaybackComplete {
        command: String,
    },
    SystemShutdown,
}

impl EventData {
    pub fn event_type(&self) -> EventType {
        match self {
            EventData::EcgPeak { .. } => EventType::EcgPeak,
            EventData::EcgBpmUpdate { .. } => EventType::EcgBpmUpdate,
            EventData::EcgError { .. } => EventType::EcgError,
            EventData::VoiceCommand { .. } => EventType::VoiceCommand,
            EventData::VoiceNoise { .. } => EventType::VoiceNoise,
            EventData::VoiceError { .. } => EventType::VoiceError,
            EventData::CalibrationResult { .. } => EventType::CalibrationResult,
            EventData::PlaybackStart { .. } => EventType::PlaybackStart,
            EventData::PlaybackComplete { .. } => EventType::PlaybackComplete,
            EventData::SystemShutdown => EventType::SystemShutdown,
        }
    }
}

/// An event as it travels through the bus: payload plus a monotonic
/// publish timestamp used only for diagnostics (ordering is guaranteed by
/// FIFO queueing, not by this timestamp).
#[derive(Debug, Clone)]
pub struct Event {
    pub data: EventData,
    pub timestamp: Instant,
}

impl Event {
    pub fn new(data: EventData) -> Self {
        Self {
            data,
            timestamp: Instant::now(),
        }
    }

    pub fn event_type(&self) -> EventType {
        self.data.event_type()
    }
}
