use biovox_foundation::AudioError;

/// Single-writer/single-reader ring buffer for raw PCM samples crossing
/// from the capture callback (driver thread) to the chunker (tokio task).
/// `split` hands out the two ends; capacity is in samples, not bytes.
pub struct AudioRingBuffer {
    capacity: usize,
}

impl AudioRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1) }
    }

    pub fn split(self) -> (AudioProducer, AudioConsumer) {
        let (producer, consumer) = rtrb::RingBuffer::<i16>::new(self.capacity);
        (AudioProducer { inner: producer }, AudioConsumer { inner: consumer })
    }
}

/// Capture-side handle. `write` never blocks: once the buffer is full it
/// drops the remainder and reports how many samples actually landed so the
/// caller can count the rest as dropped.
pub struct AudioProducer {
    inner: rtrb::Producer<i16>,
}

impl AudioProducer {
    pub fn write(&mut self, data: &[i16]) -> Result<usize, AudioError> {
        let mut written = 0;
        for &sample in data {
            match self.inner.push(sample) {
                Ok(()) => written += 1,
                Err(_) => break,
            }
        }
        Ok(written)
    }
}

/// Chunker-side handle.
pub struct AudioConsumer {
    inner: rtrb::Consumer<i16>,
}

impl AudioConsumer {
    pub fn pop(&mut self) -> Option<i16> {
        self.inner.pop().ok()
    }

    pub fn available(&self) -> usize {
        self.inner.slots()
    }
}
