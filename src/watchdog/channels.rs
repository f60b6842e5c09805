//! Feeder control and fault channels.
//!
//! Bounded `embassy-sync` channels connect the caller's thread with the
//! feeder thread. Both ends only use the non-blocking `try_*` methods.
//!
//! ```text
//! ┌──────────────┐  ControlMsg  ┌───────────────┐
//! │  caller      │────────────▶│ feeder thread │
//! │              │◀────────────│               │
//! └──────────────┘    Error     └───────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use crate::error::Error;

/// Command from the owner to a running feeder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMsg {
    /// Terminate the loop.
    Stop,
    /// Feed now and re-read the watchdog period.
    Update,
}

/// Channel depth for control messages.
const CONTROL_DEPTH: usize = 4;

/// A feeder stops after its first fault, so one slot is enough.
const FAULT_DEPTH: usize = 1;

pub type ControlChannel = Channel<CriticalSectionRawMutex, ControlMsg, CONTROL_DEPTH>;
pub type FaultChannel = Channel<CriticalSectionRawMutex, Error, FAULT_DEPTH>;

/// The channel pair owned by one feeder.
pub struct FeederChannels {
    pub control: ControlChannel,
    pub faults: FaultChannel,
}

impl FeederChannels {
    pub const fn new() -> Self {
        Self {
            control: Channel::new(),
            faults: Channel::new(),
        }
    }

    /// Discard control messages left over from a previous run.
    pub fn drain_control(&self) {
        while self.control.try_receive().is_ok() {}
    }

    /// Store `fault`, replacing an older one nobody has taken yet.
    pub fn publish_fault(&self, fault: Error) {
        if let Err(TrySendError::Full(fault)) = self.faults.try_send(fault) {
            let _ = self.faults.try_receive();
            let _ = self.faults.try_send(fault);
        }
    }
}

impl Default for FeederChannels {
    fn default() -> Self {
        Self::new()
    }
}
