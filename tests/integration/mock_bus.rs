//! Scripted I2C bus for integration tests.
//!
//! Records every block write and block read so tests can assert on the
//! exact wire traffic, and answers reads from a queue of canned frames.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use hatbus::proto::codec::Frame;
use hatbus::proto::command::Command;
use hatbus::sim::SimError;

// ── Bus call record ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum BusCall {
    Write { address: u8, bytes: Vec<u8> },
    Read { address: u8, trigger: u8, len: usize },
}

#[derive(Default)]
struct Script {
    calls: Vec<BusCall>,
    replies: VecDeque<Vec<u8>>,
    fail_writes: usize,
}

// ── MockBus ───────────────────────────────────────────────────

/// Clones share one script, so a test keeps a handle after moving the
/// bus into a `Bus`.
#[derive(Clone, Default)]
pub struct MockBus {
    script: Arc<Mutex<Script>>,
}

#[allow(dead_code)]
impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response for the next block read.
    pub fn reply_raw(&self, raw: Vec<u8>) {
        self.script.lock().unwrap().replies.push_back(raw);
    }

    /// Queue a well-formed response frame.
    pub fn reply(&self, id: u8, command: Command, payload: &[u8]) {
        let raw = Frame::new(id, command, payload).unwrap().encode().to_vec();
        self.reply_raw(raw);
    }

    /// NACK the next `n` request writes.
    pub fn fail_writes(&self, n: usize) {
        self.script.lock().unwrap().fail_writes = n;
    }

    pub fn calls(&self) -> Vec<BusCall> {
        self.script.lock().unwrap().calls.clone()
    }

    /// Number of request frames written (failed ones included).
    pub fn writes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BusCall::Write { .. }))
            .count()
    }

    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BusCall::Write { bytes, .. } => Some(bytes),
                BusCall::Read { .. } => None,
            })
            .collect()
    }
}

impl ErrorType for MockBus {
    type Error = SimError;
}

impl I2c for MockBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), SimError> {
        let mut script = self.script.lock().unwrap();
        let mut trigger = None;
        for op in operations {
            match op {
                Operation::Write(bytes) if bytes.len() == 1 => trigger = Some(bytes[0]),
                Operation::Write(bytes) => {
                    script.calls.push(BusCall::Write {
                        address,
                        bytes: bytes.to_vec(),
                    });
                    if script.fail_writes > 0 {
                        script.fail_writes -= 1;
                        return Err(SimError(ErrorKind::NoAcknowledge(
                            NoAcknowledgeSource::Data,
                        )));
                    }
                }
                Operation::Read(buf) => {
                    script.calls.push(BusCall::Read {
                        address,
                        trigger: trigger.take().unwrap_or(0),
                        len: buf.len(),
                    });
                    buf.fill(0xFF);
                    if let Some(reply) = script.replies.pop_front() {
                        let n = buf.len().min(reply.len());
                        buf[..n].copy_from_slice(&reply[..n]);
                    }
                }
            }
        }
        Ok(())
    }
}
