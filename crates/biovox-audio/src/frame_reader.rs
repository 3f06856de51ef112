use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::capture::AudioFrame;
use super::ring_buffer::AudioConsumer;

/// Drains the ring buffer's consumer end and assembles fixed-size frames
/// for the chunker, buffering leftover samples between calls.
pub struct FrameReader {
    consumer: AudioConsumer,
    sample_rate: u32,
    channels: u16,
    frame_samples: usize,
    buffer: VecDeque<i16>,
    #[allow(dead_code)]
    idle_timeout: Option<Duration>,
}

impl FrameReader {
    pub fn new(
        consumer: AudioConsumer,
        sample_rate: u32,
        channels: u16,
        frame_samples: usize,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            consumer,
            sample_rate,
            channels,
            frame_samples,
            buffer: VecDeque::with_capacity(frame_samples * channels.max(1) as usize * 2),
            idle_timeout,
        }
    }

    pub fn update_device_config(&mut self, sample_rate: u32, channels: u16) {
        self.sample_rate = sample_rate;
        self.channels = channels;
    }

    /// Pops up to `max_pop` samples from the ring buffer and returns a
    /// complete frame if enough interleaved samples have accumulated.
    /// Returns `None` without blocking if a full frame isn't ready yet.
    pub fn read_frame(&mut self, max_pop: usize) -> Option<AudioFrame> {
        for _ in 0..max_pop {
            match self.consumer.pop() {
                Some(sample) => self.buffer.push_back(sample),
                None => break,
            }
        }

        let needed = self.frame_samples * self.channels.max(1) as usize;
        if needed == 0 || self.buffer.len() < needed {
            return None;
        }

        let samples: Vec<i16> = self.buffer.drain(..needed).collect();
        Some(AudioFrame {
            samples,
            timestamp: Instant::now(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring_buffer::AudioRingBuffer;

    #[test]
    fn accumulates_across_calls_until_a_frame_is_ready() {
        let rb = AudioRingBuffer::new(64);
        let (mut producer, consumer) = rb.split();
        producer.write(&[1, 2, 3]).unwrap();
        let mut reader = FrameReader::new(consumer, 16_000, 1, 5, None);

        assert!(reader.read_frame(16).is_none());

        producer.write(&[4, 5]).unwrap();
        let frame = reader.read_frame(16).expect("frame should be ready");
        assert_eq!(frame.samples, vec![1, 2, 3, 4, 5]);
    }
}
