//! Simulated I2C-HAT peripherals.
//!
//! [`SimBus`] implements the `embedded-hal` I2C trait over any number of
//! [`SimDevice`]s. Each device decodes request frames, keeps its register
//! state and answers the next block read with a valid response frame, the
//! way board firmware does. Unknown addresses are NACKed.
//!
//! Devices are cheap handles onto shared state, so a test keeps a clone to
//! inject faults and inspect registers after moving the bus into a
//! [`Bus`](crate::proto::transport::Bus).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use log::trace;

use crate::board::BoardModel;
use crate::proto::codec::{Frame, HEADER_SIZE, CRC_SIZE};
use crate::proto::command::{Command, Edge};
use crate::proto::registers::BOARD_NAME_LEN;

/// Channels backed by the 32-bit state registers.
const CHANNELS: usize = 32;

/// What an idle bus reads back.
const IDLE_BYTE: u8 = 0xFF;

/// I/O error raised by the simulated bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError(pub ErrorKind);

impl embedded_hal::i2c::Error for SimError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

// ── Device state ─────────────────────────────────────────────

#[derive(Debug)]
struct DeviceState {
    address: u8,
    name: String,
    firmware: [u8; 3],
    status_word: u32,
    inputs: u32,
    outputs: u32,
    power_on_value: u32,
    safety_value: u32,
    cwdt_period_ms: u32,
    cwdt_state: u32,
    /// `[falling, rising]` per input channel.
    counters: [[u32; 2]; CHANNELS],
    pending: Option<Vec<u8>>,

    fail_writes: usize,
    corrupt_crcs: usize,
    wrong_ids: usize,
    scripted_payload: Option<Vec<u8>>,

    request_writes: usize,
    feeds: usize,
    resets: usize,
}

impl DeviceState {
    fn handle_write(&mut self, bytes: &[u8]) -> Result<(), SimError> {
        if bytes.len() < HEADER_SIZE + CRC_SIZE {
            // Block-read trigger byte; firmware ignores it.
            return Ok(());
        }
        self.request_writes += 1;
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(SimError(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)));
        }

        self.pending = match Frame::parse(bytes) {
            Ok(request) => self.respond(&request),
            Err(e) => {
                trace!("Sim[{:#04x}]: dropped request: {}", self.address, e);
                None
            }
        };
        Ok(())
    }

    fn handle_read(&mut self, buf: &mut [u8]) {
        buf.fill(IDLE_BYTE);
        if let Some(response) = self.pending.take() {
            let n = buf.len().min(response.len());
            buf[..n].copy_from_slice(&response[..n]);
        }
    }

    /// Build the raw response to `request`, or `None` when the firmware
    /// would stay silent.
    fn respond(&mut self, request: &Frame) -> Option<Vec<u8>> {
        let command = request.command();
        let mut payload = self.execute(command, request.payload())?;

        if let Some(scripted) = self.scripted_payload.take() {
            payload = scripted;
        }
        let mut id = request.id();
        if self.wrong_ids > 0 {
            self.wrong_ids -= 1;
            id = id.wrapping_add(1);
        }

        let mut raw = Frame::new(id, command, &payload).ok()?.encode().to_vec();
        if self.corrupt_crcs > 0 {
            self.corrupt_crcs -= 1;
            if let Some(last) = raw.last_mut() {
                *last ^= 0xFF;
            }
        }
        Some(raw)
    }

    fn execute(&mut self, command: Command, data: &[u8]) -> Option<Vec<u8>> {
        match command {
            Command::GetBoardName => {
                let mut name = self.name.as_bytes().to_vec();
                name.resize(BOARD_NAME_LEN, 0);
                Some(name)
            }
            Command::GetFirmwareVersion => Some(self.firmware.to_vec()),
            Command::GetStatusWord => Some(self.status_word.to_le_bytes().to_vec()),
            Command::Reset => {
                self.resets += 1;
                self.outputs = self.power_on_value;
                None
            }
            Command::CwdtSetPeriod => store(&mut self.cwdt_period_ms, data),
            Command::CwdtGetPeriod => {
                self.feeds += 1;
                Some(self.cwdt_period_ms.to_le_bytes().to_vec())
            }
            Command::CwdtSetState => store(&mut self.cwdt_state, data),
            Command::DiGetAllChannelStates => Some(self.inputs.to_le_bytes().to_vec()),
            Command::DiGetChannelState => channel_bit(self.inputs, data),
            Command::DiGetCounter => {
                let &[index, edge] = data else { return None };
                let value = self.counters.get(index as usize)?.get(edge as usize)?;
                let mut reply = vec![index, edge];
                reply.extend_from_slice(&value.to_le_bytes());
                Some(reply)
            }
            Command::DiResetCounter => {
                let &[index, edge] = data else { return None };
                *self.counters.get_mut(index as usize)?.get_mut(edge as usize)? = 0;
                Some(data.to_vec())
            }
            Command::DiResetAllCounters => {
                self.counters = [[0; 2]; CHANNELS];
                Some(Vec::new())
            }
            Command::DqSetPowerOnValue => store(&mut self.power_on_value, data),
            Command::DqGetPowerOnValue => Some(self.power_on_value.to_le_bytes().to_vec()),
            Command::DqSetSafetyValue => store(&mut self.safety_value, data),
            Command::DqGetSafetyValue => Some(self.safety_value.to_le_bytes().to_vec()),
            Command::DqSetAllChannelStates => store(&mut self.outputs, data),
            Command::DqGetAllChannelStates => Some(self.outputs.to_le_bytes().to_vec()),
            Command::DqSetChannelState => {
                let &[index, value] = data else { return None };
                let mask = 1u32.checked_shl(index as u32)?;
                if value > 0 {
                    self.outputs |= mask;
                } else {
                    self.outputs &= !mask;
                }
                Some(data.to_vec())
            }
            Command::DqGetChannelState => channel_bit(self.outputs, data),
        }
    }
}

/// Store a little-endian u32 and echo it.
fn store(register: &mut u32, data: &[u8]) -> Option<Vec<u8>> {
    let bytes: [u8; 4] = data.try_into().ok()?;
    *register = u32::from_le_bytes(bytes);
    Some(data.to_vec())
}

fn channel_bit(register: u32, data: &[u8]) -> Option<Vec<u8>> {
    let &[index] = data else { return None };
    let mask = 1u32.checked_shl(index as u32)?;
    Some(vec![index, u8::from(register & mask != 0)])
}

// ── Device handle ────────────────────────────────────────────

/// Handle onto one simulated board. Clones share the same state.
#[derive(Debug, Clone)]
pub struct SimDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl SimDevice {
    pub fn new(address: u8, name: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                address,
                name: name.to_owned(),
                firmware: [1, 0, 0],
                status_word: 0,
                inputs: 0,
                outputs: 0,
                power_on_value: 0,
                safety_value: 0,
                cwdt_period_ms: 0,
                cwdt_state: 0,
                counters: [[0; 2]; CHANNELS],
                pending: None,
                fail_writes: 0,
                corrupt_crcs: 0,
                wrong_ids: 0,
                scripted_payload: None,
                request_writes: 0,
                feeds: 0,
                resets: 0,
            })),
        }
    }

    /// A device that reports `model`'s board name.
    pub fn for_model(address: u8, model: BoardModel) -> Self {
        Self::new(address, model.name())
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn address(&self) -> u8 {
        self.lock().address
    }

    pub fn set_firmware_version(&self, version: [u8; 3]) {
        self.lock().firmware = version;
    }

    pub fn set_status_word(&self, value: u32) {
        self.lock().status_word = value;
    }

    pub fn set_inputs(&self, value: u32) {
        self.lock().inputs = value;
    }

    pub fn outputs(&self) -> u32 {
        self.lock().outputs
    }

    pub fn set_counter(&self, index: usize, edge: Edge, value: u32) {
        if let Some(slot) = self.lock().counters.get_mut(index) {
            slot[edge.byte() as usize] = value;
        }
    }

    pub fn counter(&self, index: usize, edge: Edge) -> Option<u32> {
        self.lock()
            .counters
            .get(index)
            .map(|slot| slot[edge.byte() as usize])
    }

    pub fn cwdt_period_ms(&self) -> u32 {
        self.lock().cwdt_period_ms
    }

    pub fn cwdt_state(&self) -> u32 {
        self.lock().cwdt_state
    }

    // ── Fault injection ──

    /// NACK the next `n` request writes.
    pub fn fail_next_writes(&self, n: usize) {
        self.lock().fail_writes = n;
    }

    /// Flip the CRC of the next `n` responses.
    pub fn corrupt_next_responses(&self, n: usize) {
        self.lock().corrupt_crcs = n;
    }

    /// Answer the next `n` requests with the wrong frame id.
    pub fn wrong_id_next_responses(&self, n: usize) {
        self.lock().wrong_ids = n;
    }

    /// Replace the payload of the next response, keeping id, command and
    /// a valid CRC.
    pub fn script_next_payload(&self, payload: &[u8]) {
        self.lock().scripted_payload = Some(payload.to_vec());
    }

    // ── Counters for assertions ──

    /// Request frames written to this device, failed ones included.
    pub fn request_writes(&self) -> usize {
        self.lock().request_writes
    }

    /// Period reads, each of which re-arms the watchdog.
    pub fn feeds(&self) -> usize {
        self.lock().feeds
    }

    pub fn resets(&self) -> usize {
        self.lock().resets
    }
}

// ── Bus ──────────────────────────────────────────────────────

/// Simulated I2C bus with any number of attached devices.
#[derive(Debug, Default)]
pub struct SimBus {
    devices: Vec<SimDevice>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, device: SimDevice) -> Self {
        self.attach(device);
        self
    }

    pub fn attach(&mut self, device: SimDevice) {
        self.devices.push(device);
    }

    fn device(&self, address: u8) -> Option<&SimDevice> {
        self.devices.iter().find(|d| d.address() == address)
    }
}

impl ErrorType for SimBus {
    type Error = SimError;
}

impl I2c for SimBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), SimError> {
        let device = self
            .device(address)
            .ok_or(SimError(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)))?;
        let mut state = device.lock();
        for op in operations {
            match op {
                Operation::Write(bytes) => state.handle_write(bytes)?,
                Operation::Read(buf) => state.handle_read(buf),
            }
        }
        Ok(())
    }
}
