//! hatbus: host-side driver for I2C-HAT expansion boards.
//!
//! Talks to the boards' framed register protocol over any
//! `embedded-hal` 1.0 I2C bus, with a retrying transport shared between
//! boards, typed register access per board model, and a background
//! feeder that keeps each board's communication watchdog armed.

#![deny(unused_must_use)]

pub mod board;
pub mod config;
pub mod error;
pub mod proto;
pub mod sim;
pub mod watchdog;

pub use board::channels::ChannelRef;
pub use board::{Board, BoardConfig, BoardModel};
pub use config::{FeederConfig, TransportConfig};
pub use error::{Error, Result};
pub use proto::command::{Command, Edge};
pub use proto::transport::{Bus, Exchange, Transport};
pub use watchdog::{FeederState, WatchdogFeeder};
