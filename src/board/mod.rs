//! Board handles and the built-in board model table.
//!
//! A [`Board`] is one addressed I2C-HAT on a shared [`Bus`]. Its
//! capabilities come from a flat [`BoardConfig`] (family base address,
//! expected name, input and output label tables) rather than a type per
//! model, so a board with both inputs and outputs is just a config with
//! both tables filled in.

pub mod channels;
pub mod cwdt;
pub mod digital;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use embedded_hal::i2c::I2c;
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::{FeederConfig, TransportConfig};
use crate::error::{Error, Result};
use crate::proto::codec::Frame;
use crate::proto::command::Command;
use crate::proto::registers::{BoardName, FirmwareVersion, Registers};
use crate::proto::transport::{Bus, Exchange, Transport, validate_address};
use crate::watchdog::WatchdogFeeder;
use crate::watchdog::channels::FeederChannels;

use self::channels::ChannelMap;
use self::cwdt::Cwdt;
use self::digital::{DigitalInputs, DigitalOutputs};

// ── Board configuration ──────────────────────────────────────

/// Everything that distinguishes one board model from another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Expected board name; the name read at open must contain it.
    /// Empty skips the identity check.
    #[serde(default)]
    pub name: String,
    /// Family base address; the board must sit in `[base, base + 15]`.
    #[serde(default)]
    pub base_address: Option<u8>,
    #[serde(default)]
    pub di_labels: Vec<String>,
    #[serde(default)]
    pub dq_labels: Vec<String>,
}

impl BoardConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|_| Error::Config("board config JSON"))
    }
}

/// Known I2C-HAT models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardModel {
    Di16,
    Rly10,
    Di6Rly6,
    DI16ac,
    DQ16oc,
    DQ10rly,
    DQ8rly,
    DI6acDQ6rly,
    DI6acDQ6ssr,
    DI6dwDQ6ssr,
}

impl BoardModel {
    pub const ALL: [BoardModel; 10] = [
        Self::Di16,
        Self::Rly10,
        Self::Di6Rly6,
        Self::DI16ac,
        Self::DQ16oc,
        Self::DQ10rly,
        Self::DQ8rly,
        Self::DI6acDQ6rly,
        Self::DI6acDQ6ssr,
        Self::DI6dwDQ6ssr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Di16 => "Di16 I2C-HAT",
            Self::Rly10 => "Rly10 I2C-HAT",
            Self::Di6Rly6 => "Di6Rly6 I2C-HAT",
            Self::DI16ac => "DI16ac I2C-HAT",
            Self::DQ16oc => "DQ16oc I2C-HAT",
            Self::DQ10rly => "DQ10rly I2C-HAT",
            Self::DQ8rly => "DQ8rly I2C-HAT",
            Self::DI6acDQ6rly => "DI6acDQ6rly I2C-HAT",
            Self::DI6acDQ6ssr => "DI6acDQ6ssr I2C-HAT",
            Self::DI6dwDQ6ssr => "DI6dwDQ6ssr I2C-HAT",
        }
    }

    pub fn base_address(self) -> u8 {
        match self {
            Self::Di16 | Self::DI16ac => 0x40,
            Self::Rly10 | Self::DQ16oc | Self::DQ10rly | Self::DQ8rly => 0x50,
            Self::Di6Rly6 | Self::DI6acDQ6rly => 0x60,
            Self::DI6acDQ6ssr => 0x70,
            // Outside the 7-bit range; opening with the family check fails.
            Self::DI6dwDQ6ssr => 0x80,
        }
    }

    pub fn config(self) -> BoardConfig {
        let (di, dq) = match self {
            Self::Di16 => (
                (1..=4)
                    .flat_map(|block| (1..=4).map(move |ch| format!("Di{block}.{ch}")))
                    .collect(),
                Vec::new(),
            ),
            Self::Rly10 => (Vec::new(), numbered("Rly", 1..=10)),
            Self::Di6Rly6 => (
                (1..=6).map(|ch| format!("Di1.{ch}")).collect(),
                numbered("Rly", 1..=6),
            ),
            Self::DI16ac => (numbered("I", 0..=15), Vec::new()),
            Self::DQ16oc => (Vec::new(), numbered("Q", 0..=15)),
            Self::DQ10rly => (Vec::new(), numbered("Q", 0..=9)),
            Self::DQ8rly => (Vec::new(), numbered("Q", 0..=7)),
            Self::DI6acDQ6rly | Self::DI6acDQ6ssr | Self::DI6dwDQ6ssr => {
                (numbered("I", 0..=5), numbered("Q", 0..=5))
            }
        };
        BoardConfig {
            name: self.name().to_owned(),
            base_address: Some(self.base_address()),
            di_labels: di,
            dq_labels: dq,
        }
    }
}

fn numbered(prefix: &str, range: core::ops::RangeInclusive<u32>) -> Vec<String> {
    range.map(|n| format!("{prefix}{n}")).collect()
}

/// `None` for a board without this channel group.
fn label_map(labels: &[String]) -> Option<ChannelMap> {
    (!labels.is_empty()).then(|| ChannelMap::new(labels))
}

// ── Board handle ─────────────────────────────────────────────

/// One I2C-HAT on a shared bus.
pub struct Board<I> {
    transport: Transport<I>,
    config: BoardConfig,
    inputs: Option<ChannelMap>,
    outputs: Option<ChannelMap>,
    /// Control channels of the feeder started through this board.
    feeder: Mutex<Option<Arc<FeederChannels>>>,
}

impl<I: I2c> Board<I> {
    /// Open a known model with default transport settings.
    pub fn open(bus: Arc<Bus<I>>, address: u8, model: BoardModel) -> Result<Self> {
        Self::with_config(bus, address, model.config(), TransportConfig::default())
    }

    /// Open a board described by `config`.
    ///
    /// Validates the address against the family range, then, if the
    /// config names the board, reads its name and checks it.
    pub fn with_config(
        bus: Arc<Bus<I>>,
        address: u8,
        config: BoardConfig,
        transport: TransportConfig,
    ) -> Result<Self> {
        validate_address(address, config.base_address)?;
        let transport = Transport::new(bus, address, transport)?;

        let board = Self {
            transport,
            inputs: label_map(&config.di_labels),
            outputs: label_map(&config.dq_labels),
            feeder: Mutex::new(None),
            config,
        };

        if !board.config.name.is_empty() {
            let found = board.name()?;
            if !found.contains(board.config.name.as_str()) {
                return Err(Error::UnexpectedBoardIdentity {
                    expected: board.config.name.clone(),
                    found,
                });
            }
        }

        info!("Board {:#04x}: opened '{}'", address, board.config.name);
        Ok(board)
    }

    pub fn address(&self) -> u8 {
        self.transport.address()
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn transport(&self) -> &Transport<I> {
        &self.transport
    }

    /// Time of the last successful transfer with this board.
    pub fn last_transfer(&self) -> Option<SystemTime> {
        self.transport.last_transfer()
    }

    pub fn name(&self) -> Result<BoardName> {
        self.transport.board_name()
    }

    pub fn firmware_version(&self) -> Result<FirmwareVersion> {
        self.transport.firmware_version()
    }

    pub fn status_word(&self) -> Result<u32> {
        self.transport.get_u32(Command::GetStatusWord)
    }

    /// Reboot the board. Fire-and-forget.
    pub fn reset(&self) -> Result<()> {
        self.transport.reset_board()
    }

    pub fn digital_inputs(&self) -> Result<DigitalInputs<'_, Transport<I>>> {
        self.inputs
            .as_ref()
            .map(|map| DigitalInputs::new(&self.transport, map))
            .ok_or(Error::UnsupportedCapability("digital inputs"))
    }

    pub fn digital_outputs(&self) -> Result<DigitalOutputs<'_, Transport<I>>> {
        self.outputs
            .as_ref()
            .map(|map| DigitalOutputs::new(&self.transport, map))
            .ok_or(Error::UnsupportedCapability("digital outputs"))
    }

    /// Watchdog registers. Period changes reach a feeder started with
    /// [`Board::start_watchdog_feeder`].
    pub fn cwdt(&self) -> Cwdt<'_, Transport<I>> {
        Cwdt::new(&self.transport).with_feeder(self.feeder_channels().clone())
    }

    /// Disable the watchdog, then stop `feeder`.
    ///
    /// The feeder is stopped even when the period write fails.
    pub fn stop_watchdog_feeder(&self, feeder: &mut WatchdogFeeder) -> Result<()> {
        let disabled = self.transport.set_u32(Command::CwdtSetPeriod, 0);
        feeder.stop();
        let mut registered = self.feeder_channels();
        if registered
            .as_ref()
            .is_some_and(|channels| Arc::ptr_eq(channels, feeder.channels()))
        {
            *registered = None;
        }
        info!("Board {:#04x}: watchdog feeder stopped", self.address());
        disabled
    }

    fn feeder_channels(&self) -> MutexGuard<'_, Option<Arc<FeederChannels>>> {
        self.feeder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<I: I2c + Send + 'static> Board<I> {
    /// Arm the watchdog with `period` seconds and start a background
    /// feeder that keeps it armed.
    ///
    /// `period` must be positive; use [`Board::stop_watchdog_feeder`] to
    /// disable the watchdog.
    pub fn start_watchdog_feeder(
        self: &Arc<Self>,
        period: f32,
        config: FeederConfig,
    ) -> Result<WatchdogFeeder> {
        if !period.is_finite() || period <= 0.0 {
            return Err(Error::InvalidPeriod);
        }
        let mut feeder = WatchdogFeeder::new(Arc::clone(self), config)?;
        self.cwdt().set_period(period)?;
        feeder.start()?;
        *self.feeder_channels() = Some(Arc::clone(feeder.channels()));
        info!("Board {:#04x}: watchdog armed, period={}s", self.address(), period);
        Ok(feeder)
    }
}

impl<I: I2c> Exchange for Board<I> {
    fn next_frame_id(&self) -> u8 {
        self.transport.next_frame_id()
    }

    fn transfer(&self, request: &Frame, response_len: usize) -> Result<Frame> {
        self.transport.transfer(request, response_len)
    }

    fn send(&self, request: &Frame) -> Result<()> {
        self.transport.send(request)
    }
}

impl<I: I2c> core::fmt::Display for Board<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} adr: {:#04x}", self.config.name, self.address())
    }
}
