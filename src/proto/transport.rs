//! Bus ownership and the retrying request/response exchange.
//!
//! Every board on one physical I2C bus shares a single [`Bus`]. The bus
//! mutex is held for the whole write + read exchange, retries included,
//! because the half-duplex bus cannot interleave two transactions.
//!
//! The register protocol is generic over [`Exchange`], so anything that
//! can turn a request frame into a validated response frame (the real
//! [`Transport`], a scripted test double) can drive it.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use embedded_hal::i2c::{Error as _, I2c};
use log::{error, trace, warn};

use super::codec::{Frame, MAX_FRAME_SIZE, MAX_PAYLOAD, frame_len};
use super::command::Command;
use crate::config::TransportConfig;
use crate::error::{Error, FrameError, Result, TransferFault};

/// Highest 7-bit I2C address.
pub const MAX_ADDRESS: u8 = 0x7F;

/// Number of addresses in a board family, starting at its base.
pub const FAMILY_SPAN: u8 = 0x10;

// ── Shared bus ───────────────────────────────────────────────

/// One physical I2C bus and the lock serialising all traffic on it.
///
/// A bus without a handle models a host where no I2C port was found:
/// every transfer fails immediately with [`Error::BusUnavailable`].
pub struct Bus<I> {
    handle: Mutex<Option<I>>,
}

impl<I: I2c> Bus<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            handle: Mutex::new(Some(i2c)),
        }
    }

    /// A bus with no physical port behind it.
    pub fn unavailable() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    pub fn is_available(&self) -> bool {
        self.lock().is_some()
    }

    /// Give back the underlying handle.
    pub fn into_inner(self) -> Option<I> {
        self.handle
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // A panic mid-transfer leaves the handle usable; the next exchange
    // starts with a fresh write anyway.
    fn lock(&self) -> MutexGuard<'_, Option<I>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Exchange seam ────────────────────────────────────────────

/// Request/response contract consumed by the register protocol.
pub trait Exchange {
    /// Fresh id for the next outbound request.
    fn next_frame_id(&self) -> u8;

    /// Send `request` and return the response carrying `response_len`
    /// payload bytes.
    fn transfer(&self, request: &Frame, response_len: usize) -> Result<Frame>;

    /// Send `request` without waiting for a response.
    fn send(&self, request: &Frame) -> Result<()>;

    /// Build a request frame with a freshly generated id.
    fn request(&self, command: Command, payload: &[u8]) -> Result<Frame> {
        Ok(Frame::new(self.next_frame_id(), command, payload)?)
    }
}

impl<T: Exchange + ?Sized> Exchange for &T {
    fn next_frame_id(&self) -> u8 {
        (**self).next_frame_id()
    }

    fn transfer(&self, request: &Frame, response_len: usize) -> Result<Frame> {
        (**self).transfer(request, response_len)
    }

    fn send(&self, request: &Frame) -> Result<()> {
        (**self).send(request)
    }
}

// ── Address validation ───────────────────────────────────────

/// Check a peripheral address against the 7-bit range and, when a family
/// base is given, against `[base, base + 15]`.
pub fn validate_address(address: u8, base: Option<u8>) -> Result<()> {
    let in_family = match base {
        None => true,
        Some(base) => address >= base && address - base < FAMILY_SPAN,
    };
    if address <= MAX_ADDRESS && in_family {
        Ok(())
    } else {
        Err(Error::InvalidAddress { address, base })
    }
}

// ── Per-peripheral transport ─────────────────────────────────

/// Transport session for one peripheral on a shared bus.
pub struct Transport<I> {
    bus: Arc<Bus<I>>,
    address: u8,
    frame_id: AtomicU8,
    last_transfer: Mutex<Option<SystemTime>>,
    config: TransportConfig,
}

impl<I: I2c> Transport<I> {
    pub fn new(bus: Arc<Bus<I>>, address: u8, config: TransportConfig) -> Result<Self> {
        config.validate()?;
        validate_address(address, None)?;
        Ok(Self {
            bus,
            address,
            frame_id: AtomicU8::new(config.first_frame_id.wrapping_sub(1)),
            last_transfer: Mutex::new(None),
            config,
        })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Wall-clock time of the last successful transfer.
    pub fn last_transfer(&self) -> Option<SystemTime> {
        *self
            .last_transfer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one request/response exchange with up to `max_attempts` tries.
    ///
    /// With `response_len == None` only the request is written. Returns
    /// [`Error::Response`] with the last failure once every attempt failed.
    pub fn transfer_with(
        &self,
        request: &Frame,
        response_len: Option<usize>,
        max_attempts: u8,
    ) -> Result<Option<Frame>> {
        if let Some(len) = response_len.filter(|&len| len > MAX_PAYLOAD) {
            return Err(FrameError::PayloadTooLong(len).into());
        }

        let mut guard = self.bus.lock();
        let Some(i2c) = guard.as_mut() else {
            return Err(Error::BusUnavailable);
        };

        let raw = request.encode();
        trace!("I2C[{:#04x}] -> {:02x?}", self.address, raw.as_slice());

        let attempts = max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(i2c, &raw, request, response_len) {
                Ok(response) => {
                    *self
                        .last_transfer
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(SystemTime::now());
                    return Ok(response);
                }
                Err(fault) if attempt < attempts => {
                    warn!(
                        "I2C[{:#04x}] {:?} attempt {}/{} failed: {}",
                        self.address,
                        request.command(),
                        attempt,
                        attempts,
                        fault
                    );
                    if self.config.retry_backoff_ms > 0 {
                        std::thread::sleep(Duration::from_millis(
                            self.config.retry_backoff_ms as u64,
                        ));
                    }
                    attempt += 1;
                }
                Err(fault) => {
                    error!(
                        "I2C[{:#04x}] {:?} gave up after {} attempt(s): {}",
                        self.address,
                        request.command(),
                        attempts,
                        fault
                    );
                    return Err(Error::Response {
                        attempts,
                        cause: fault,
                    });
                }
            }
        }
    }

    fn attempt(
        &self,
        i2c: &mut I,
        raw: &[u8],
        request: &Frame,
        response_len: Option<usize>,
    ) -> core::result::Result<Option<Frame>, TransferFault> {
        // Block write: the first byte travels as the SMBus command byte,
        // which on the wire is simply the first byte of the write.
        i2c.write(self.address, raw)
            .map_err(|e| TransferFault::Io(e.kind()))?;

        let Some(len) = response_len else {
            return Ok(None);
        };

        // Block read: the trigger byte is written first and ignored by
        // the board, then the response is clocked out.
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let buf = &mut buf[..frame_len(len)];
        i2c.write_read(self.address, &[self.config.read_trigger], buf)
            .map_err(|e| TransferFault::Io(e.kind()))?;
        trace!("I2C[{:#04x}] <- {:02x?}", self.address, buf);

        let mut response = Frame::response_to(request);
        response.decode(buf).map_err(TransferFault::Decode)?;
        Ok(Some(response))
    }
}

impl<I: I2c> Exchange for Transport<I> {
    fn next_frame_id(&self) -> u8 {
        self.frame_id
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
    }

    fn transfer(&self, request: &Frame, response_len: usize) -> Result<Frame> {
        self.transfer_with(request, Some(response_len), self.config.max_attempts)?
            .ok_or(Error::UnexpectedFormat(request.command()))
    }

    fn send(&self, request: &Frame) -> Result<()> {
        self.transfer_with(request, None, self.config.max_attempts)
            .map(|_| ())
    }
}
