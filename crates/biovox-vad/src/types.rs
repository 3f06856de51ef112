#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    Silence,
    Recording,
    Processing,
}

impl Default for VadState {
    fn default() -> Self {
        Self::Silence
    }
}

/// What a single `process` call did.
#[derive(Debug, Clone, PartialEq)]
pub enum VadOutcome {
    /// No segment is ready yet; the caller should keep feeding chunks.
    Continue,
    /// A candidate segment fell below `MIN_SPEECH_MS` and was discarded.
    Discarded,
    /// RECORDING -> PROCESSING: the concatenated speech segment.
    SegmentReady(Vec<i16>),
}
