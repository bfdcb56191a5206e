//! Microphone streaming.
//!
//! While recording, the second ADC free-runs and every conversion is
//! accumulated; an 8 kHz timer folds the accumulator into one averaged
//! byte and appends it to a 256-byte ring of eight 32-byte batches.
//!
//! The writer counts completed batches and the reader counts consumed
//! ones. Both counters wrap, their difference is the number of batches
//! waiting. A batch is servable while `1 <= pending <= 7`: at eight the
//! writer has lapped into the batch the reader is on, so the reader is
//! moved up to the oldest batch that is still intact.

use crate::config::{AUDIO_BATCHES, AUDIO_BATCH_SIZE, AUDIO_RING_SIZE};

/// Mean of the conversions that arrived since the last timer tick.
#[derive(Debug, Default)]
pub struct MicAccumulator {
    sum: u32,
    count: u16,
}

impl MicAccumulator {
    pub const fn new() -> Self {
        Self { sum: 0, count: 0 }
    }

    pub fn add(&mut self, sample: u8) {
        self.sum += sample as u32;
        self.count = self.count.saturating_add(1);
    }

    /// Averaged sample, 0 (silence) if nothing arrived. Resets the accumulator.
    pub fn take_mean(&mut self) -> u8 {
        let mean = match self.count {
            0 => 0,
            n => (self.sum / n as u32) as u8,
        };
        self.sum = 0;
        self.count = 0;
        mean
    }
}

pub struct AudioRing {
    data: [u8; AUDIO_RING_SIZE],
    write: usize,
    written: u8,
    read: u8,
}

impl AudioRing {
    pub const fn new() -> Self {
        Self {
            data: [0; AUDIO_RING_SIZE],
            write: 0,
            written: 0,
            read: 0,
        }
    }

    pub fn reset(&mut self) {
        self.write = 0;
        self.written = 0;
        self.read = 0;
    }

    /// Append a sample. Returns true when this sample completed a batch.
    pub fn push(&mut self, sample: u8) -> bool {
        self.data[self.write] = sample;
        self.write = (self.write + 1) % AUDIO_RING_SIZE;
        if self.write % AUDIO_BATCH_SIZE != 0 {
            return false;
        }
        self.written = self.written.wrapping_add(1);
        if self.pending() >= AUDIO_BATCHES as u8 {
            self.read = self.written.wrapping_sub(AUDIO_BATCHES as u8 - 1);
        }
        true
    }

    /// Completed batches not yet consumed.
    pub fn pending(&self) -> u8 {
        self.written.wrapping_sub(self.read)
    }

    /// Whether the batch at the read cursor is fully written and intact.
    pub fn batch_ready(&self) -> bool {
        (1..AUDIO_BATCHES as u8).contains(&self.pending())
    }

    /// Index (0-7) of the batch the host is served next.
    pub fn batch_index(&self) -> u8 {
        self.read % AUDIO_BATCHES as u8
    }

    pub fn current_batch(&self) -> &[u8] {
        let start = self.batch_index() as usize * AUDIO_BATCH_SIZE;
        &self.data[start..start + AUDIO_BATCH_SIZE]
    }

    /// Read counter of the batch at the read cursor.
    pub fn read_count(&self) -> u8 {
        self.read
    }

    /// Mark batch `served` (a [`read_count`](Self::read_count) value)
    /// consumed. No-op if a resync already moved the reader past it.
    pub fn consume(&mut self, served: u8) {
        if self.read == served {
            self.read = served.wrapping_add(1);
        }
    }

    pub fn data(&self) -> &[u8; AUDIO_RING_SIZE] {
        &self.data
    }
}

impl Default for AudioRing {
    fn default() -> Self {
        Self::new()
    }
}

/// Recording session: accumulator plus ring.
#[derive(Default)]
pub struct AudioPipeline {
    pub ring: AudioRing,
    mic: MicAccumulator,
    recording: bool,
}

impl AudioPipeline {
    pub const fn new() -> Self {
        Self {
            ring: AudioRing::new(),
            mic: MicAccumulator::new(),
            recording: false,
        }
    }

    pub fn start(&mut self) {
        self.ring.reset();
        self.mic = MicAccumulator::new();
        self.recording = true;
    }

    pub fn stop(&mut self) {
        self.recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Conversion-complete handler of the free-running ADC.
    pub fn sample(&mut self, raw: u8) {
        if self.recording {
            self.mic.add(raw);
        }
    }

    /// Timer handler. Returns true when a batch boundary was crossed.
    pub fn tick(&mut self) -> bool {
        if !self.recording {
            return false;
        }
        let mean = self.mic.take_mean();
        self.ring.push(mean)
    }
}
