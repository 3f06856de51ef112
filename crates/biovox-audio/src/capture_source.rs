use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use biovox_foundation::{AudioConfig, AudioError};

use super::capture::{AudioCaptureThread, DeviceConfig};
use super::constants::{DEFAULT_CHUNK_SIZE_SAMPLES, RING_BUFFER_CAPACITY_SAMPLES};
use super::ring_buffer::{AudioConsumer, AudioRingBuffer};

/// Seam between the voice controller and the concrete capture backend, so
/// the recognition pipeline is drivable in tests with a canned sample
/// source instead of a real device.
pub trait CaptureSource: Send {
    fn start(&mut self) -> Result<(), AudioError>;
    /// Pops a chunk of samples, waiting up to `timeout`. Returns an empty
    /// vec on timeout rather than an error.
    fn get_chunk(&mut self, timeout: Duration) -> Vec<i16>;
    /// Returns up to `ms` milliseconds of the most recently captured
    /// samples, without consuming them.
    fn get_pre_roll(&self, ms: u32) -> Vec<i16>;
    /// Drains `ms` worth of chunks and returns their RMS.
    fn measure_background(&mut self, ms: u32) -> f32;
}

fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    ((sum_sq / samples.len() as f64).sqrt()) as f32
}

/// Real capture source: a cpal-backed device stream feeding a ring buffer,
/// plus a small rolling history retained separately so pre-roll lookups
/// don't consume the chunk stream.
pub struct CpalCaptureSource {
    device_name: Option<String>,
    chunk_size: usize,
    history_capacity: usize,
    thread: Option<AudioCaptureThread>,
    consumer: Option<AudioConsumer>,
    device_config: Option<DeviceConfig>,
    history: Arc<Mutex<VecDeque<i16>>>,
}

impl CpalCaptureSource {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            chunk_size: DEFAULT_CHUNK_SIZE_SAMPLES,
            history_capacity: RING_BUFFER_CAPACITY_SAMPLES,
            thread: None,
            consumer: None,
            device_config: None,
            history: Arc::new(Mutex::new(VecDeque::with_capacity(RING_BUFFER_CAPACITY_SAMPLES))),
        }
    }

    fn push_history(&self, sample: i16) {
        let mut history = self.history.lock();
        if history.len() == self.history_capacity {
            history.pop_front();
        }
        history.push_back(sample);
    }

    fn pop_one(&mut self, timeout: Duration) -> Option<i16> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(sample) = self.consumer.as_mut()?.pop() {
                self.push_history(sample);
                return Some(sample);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }
}

impl CaptureSource for CpalCaptureSource {
    fn start(&mut self) -> Result<(), AudioError> {
        if self.thread.is_some() {
            return Ok(());
        }
        let ring = AudioRingBuffer::new(self.history_capacity);
        let (producer, consumer) = ring.split();
        let config = AudioConfig::default();
        let (thread, device_config, _device_cfg_rx) =
            AudioCaptureThread::spawn(config, producer, self.device_name.clone())?;
        self.thread = Some(thread);
        self.consumer = Some(consumer);
        self.device_config = Some(device_config);
        Ok(())
    }

    fn get_chunk(&mut self, timeout: Duration) -> Vec<i16> {
        let deadline = Instant::now() + timeout;
        let mut out = Vec::with_capacity(self.chunk_size);
        while out.len() < self.chunk_size {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.pop_one(remaining) {
                Some(sample) => out.push(sample),
                None => break,
            }
        }
        if out.len() < self.chunk_size {
            Vec::new()
        } else {
            out
        }
    }

    fn get_pre_roll(&self, ms: u32) -> Vec<i16> {
        let sample_rate = self.device_config.as_ref().map(|c| c.sample_rate).unwrap_or(16_000);
        let n = (sample_rate as u64 * ms as u64 / 1000) as usize;
        let history = self.history.lock();
        let len = history.len();
        let start = len.saturating_sub(n);
        history.iter().skip(start).copied().collect()
    }

    fn measure_background(&mut self, ms: u32) -> f32 {
        let sample_rate = self.device_config.as_ref().map(|c| c.sample_rate).unwrap_or(16_000);
        let n = (sample_rate as u64 * ms as u64 / 1000) as usize;
        let mut collected = Vec::with_capacity(n);
        let deadline = Instant::now() + Duration::from_millis(ms as u64 * 2 + 200);
        while collected.len() < n && Instant::now() < deadline {
            match self.pop_one(Duration::from_millis(50)) {
                Some(sample) => collected.push(sample),
                None => continue,
            }
        }
        rms(&collected)
    }
}

/// Canned-sample source for driving the voice controller in tests without
/// a real audio device.
pub struct FakeCaptureSource {
    queue: VecDeque<i16>,
    history: VecDeque<i16>,
    chunk_size: usize,
    background_rms: f32,
}

impl FakeCaptureSource {
    pub fn new(samples: Vec<i16>, chunk_size: usize) -> Self {
        Self {
            queue: samples.into(),
            history: VecDeque::new(),
            chunk_size,
            background_rms: 0.0,
        }
    }

    pub fn with_background_rms(mut self, rms: f32) -> Self {
        self.background_rms = rms;
        self
    }

    pub fn push_samples(&mut self, samples: &[i16]) {
        self.queue.extend(samples.iter().copied());
    }
}

impl CaptureSource for FakeCaptureSource {
    fn start(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn get_chunk(&mut self, _timeout: Duration) -> Vec<i16> {
        if self.queue.len() < self.chunk_size {
            return Vec::new();
        }
        let chunk: Vec<i16> = self.queue.drain(..self.chunk_size).collect();
        self.history.extend(chunk.iter().copied());
        chunk
    }

    fn get_pre_roll(&self, ms: u32) -> Vec<i16> {
        let n = (16_000u64 * ms as u64 / 1000) as usize;
        let len = self.history.len();
        let start = len.saturating_sub(n);
        self.history.iter().skip(start).copied().collect()
    }

    fn measure_background(&mut self, _ms: u32) -> f32 {
        self.background_rms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_source_yields_chunks_until_exhausted() {
        let mut source = FakeCaptureSource::new(vec![0; 10], 4);
        assert_eq!(source.get_chunk(Duration::from_millis(1)).len(), 4);
        assert_eq!(source.get_chunk(Duration::from_millis(1)).len(), 4);
        assert_eq!(source.get_chunk(Duration::from_millis(1)).len(), 0);
    }

    #[test]
    fn fake_source_reports_configured_background() {
        let mut source = FakeCaptureSource::new(vec![], 4).with_background_rms(123.0);
        assert_eq!(source.measure_background(100), 123.0);
    }
}
