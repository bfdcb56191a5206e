//! I2C slave protocol engine.
//!
//! Writes land in the [`CommandBuffer`]; the first byte is the opcode.
//! A write that arrives while the previous command is still waiting for
//! the main loop is refused at the address phase, which is the only
//! back-pressure the protocol has.
//!
//! Reads always start with the status byte, followed by whatever the
//! [`TxCursor`] points at. The bytes are snapshotted into a window when
//! the read starts, so the host never sees a torn multi-byte value. A
//! host that reads past the window gets the window again from the top.

use crate::audio::AudioRing;
use crate::config::{AUDIO_BATCH_SIZE, I2C_BUFFER_SIZE};
use crate::flags::Flags;
use crate::hal::Ack;
use crate::state::STATE_SIZE;

/// Status byte plus one audio batch, the longest read window.
pub const TX_WINDOW_SIZE: usize = 1 + AUDIO_BATCH_SIZE;

/// Bytes of one in-flight host write.
pub struct CommandBuffer {
    data: [u8; I2C_BUFFER_SIZE],
    len: usize,
}

impl CommandBuffer {
    pub const fn new() -> Self {
        Self {
            data: [0; I2C_BUFFER_SIZE],
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Append a byte. Returns false if the buffer was already full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.data[self.len] = byte;
        self.len += 1;
        true
    }

    pub fn is_full(&self) -> bool {
        self.len == I2C_BUFFER_SIZE
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Replace the contents with a reply to be served on the next read.
    fn load_reply(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(I2C_BUFFER_SIZE);
        self.data[..n].copy_from_slice(&bytes[..n]);
        self.len = n;
        n
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// What follows the status byte on the next read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxTarget {
    /// The rest of the device state.
    State,
    /// A command reply held in the command buffer (one read only).
    Reply,
    /// The oldest unread audio batch.
    Audio,
}

/// Snapshot of the read in progress.
pub struct TxCursor {
    window: [u8; TX_WINDOW_SIZE],
    len: usize,
    sent: usize,
    /// The audio batch was fully written when the read began.
    batch_valid: bool,
    /// Ring read counter of the batch in the window.
    served: u8,
}

impl TxCursor {
    const fn new() -> Self {
        Self {
            window: [0; TX_WINDOW_SIZE],
            len: 0,
            sent: 0,
            batch_valid: false,
            served: 0,
        }
    }

    fn byte_at(&self, i: usize) -> u8 {
        self.window[i % self.len.max(1)]
    }
}

pub struct BusEngine {
    command: CommandBuffer,
    target: TxTarget,
    tx: TxCursor,
    receiving: bool,
}

impl BusEngine {
    pub const fn new() -> Self {
        Self {
            command: CommandBuffer::new(),
            target: TxTarget::State,
            tx: TxCursor::new(),
            receiving: false,
        }
    }

    /// Contents of the last completed write.
    pub fn command(&self) -> &[u8] {
        self.command.as_slice()
    }

    pub fn target(&self) -> TxTarget {
        self.target
    }

    /// Serve `bytes` after the status byte on the next read.
    pub fn redirect_to_reply(&mut self, bytes: &[u8]) {
        self.command.load_reply(bytes);
        self.target = TxTarget::Reply;
    }

    pub fn redirect_to_audio(&mut self) {
        self.target = TxTarget::Audio;
    }

    pub fn redirect_to_state(&mut self) {
        self.target = TxTarget::State;
    }

    // Master writing

    pub fn start_receive(&mut self, flags: &Flags) -> Ack {
        if flags.any(Flags::COMMAND_READY) {
            self.receiving = false;
            return Ack::Nack;
        }
        self.command.clear();
        self.receiving = true;
        Ack::Ack
    }

    pub fn receive(&mut self, byte: u8) -> Ack {
        if !self.receiving || !self.command.push(byte) || self.command.is_full() {
            return Ack::Nack;
        }
        Ack::Ack
    }

    /// Completes a write. Empty writes are bus probes and carry no command.
    pub fn stop_receive(&mut self, flags: &Flags) {
        if self.receiving && !self.command.as_slice().is_empty() {
            flags.set(Flags::COMMAND_READY);
        }
        self.receiving = false;
    }

    // Master reading

    /// Snapshot the read window. `state` is the serialized device state
    /// with an up-to-date status byte.
    pub fn start_transmit(&mut self, state: &[u8; STATE_SIZE], ring: &AudioRing) {
        let tx = &mut self.tx;
        tx.sent = 0;
        tx.window[0] = state[0];
        tx.len = match self.target {
            TxTarget::State => {
                tx.window[..STATE_SIZE].copy_from_slice(state);
                STATE_SIZE
            }
            TxTarget::Reply => {
                let reply = self.command.as_slice();
                tx.window[1..1 + reply.len()].copy_from_slice(reply);
                1 + reply.len()
            }
            TxTarget::Audio => {
                tx.batch_valid = ring.batch_ready();
                tx.served = ring.read_count();
                tx.window[1..].copy_from_slice(ring.current_batch());
                TX_WINDOW_SIZE
            }
        };
    }

    pub fn transmit(&mut self) -> u8 {
        let b = self.tx.byte_at(self.tx.sent);
        self.tx.sent += 1;
        b
    }

    /// Copy the next `buf.len()` bytes of the read without consuming them,
    /// for peripherals that clock out a whole buffer. Pair with
    /// [`mark_sent`](Self::mark_sent).
    pub fn peek(&self, buf: &mut [u8]) {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.tx.byte_at(self.tx.sent + i);
        }
    }

    pub fn mark_sent(&mut self, n: usize) {
        self.tx.sent += n;
    }

    /// Completes a read. Returns true if an audio batch was consumed.
    /// A one-shot reply hands the window back to audio while `recording`.
    pub fn stop_transmit(&mut self, ring: &mut AudioRing, recording: bool) -> bool {
        match self.target {
            TxTarget::Audio => {
                let consumed = self.tx.batch_valid && self.tx.sent >= TX_WINDOW_SIZE;
                if consumed {
                    ring.consume(self.tx.served);
                }
                self.tx.batch_valid = false;
                consumed
            }
            TxTarget::Reply | TxTarget::State => {
                self.target = if recording {
                    TxTarget::Audio
                } else {
                    TxTarget::State
                };
                false
            }
        }
    }
}

impl Default for BusEngine {
    fn default() -> Self {
        Self::new()
    }
}
