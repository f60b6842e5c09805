//! hatbus demo: drive a simulated DI6acDQ6rly board end to end.
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌──────────────────────┐
//! │  Board   │───▶│ Transport │───▶│ SimBus / SimDevice   │
//! │  facade  │    │ (retries) │    │ (register emulation) │
//! └──────────┘    └───────────┘    └──────────────────────┘
//!       ▲
//!       └── WatchdogFeeder (background thread)
//! ```
//!
//! Run with `RUST_LOG=debug` to see every feed and retry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use hatbus::board::{Board, BoardModel};
use hatbus::config::FeederConfig;
use hatbus::proto::command::Edge;
use hatbus::proto::transport::Bus;
use hatbus::sim::{SimBus, SimDevice};

const ADDRESS: u8 = 0x60;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("hatbus demo v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Simulated hardware ─────────────────────────────────
    let device = SimDevice::for_model(ADDRESS, BoardModel::DI6acDQ6rly);
    device.set_firmware_version([1, 2, 0]);
    device.set_inputs(0b10_0101);
    device.set_counter(2, Edge::Rising, 7);
    let bus = Arc::new(Bus::new(SimBus::new().with_device(device.clone())));

    // ── 2. Identity ───────────────────────────────────────────
    let board = Arc::new(
        Board::open(Arc::clone(&bus), ADDRESS, BoardModel::DI6acDQ6rly)
            .context("opening board")?,
    );
    info!("{} firmware {}", board, board.firmware_version()?);
    info!("status word {:#010x}", board.status_word()?);

    // ── 3. Outputs ────────────────────────────────────────────
    let outputs = board.digital_outputs()?;
    outputs.set_channel("q3", true)?;
    info!("Q3 -> {} (outputs={:#06b})", outputs.channel(3u8)?, outputs.value()?);
    outputs.set_safety_value(0)?;

    // ── 4. Inputs ─────────────────────────────────────────────
    let inputs = board.digital_inputs()?;
    for (index, label) in inputs.labels().iter().enumerate() {
        info!("{} = {}", label, inputs.channel(index as u8)?);
    }
    info!("I2 rising edges: {}", inputs.counter("I2", Edge::Rising)?);
    inputs.reset_counter("I2", Edge::Rising, 0)?;

    // ── 5. Communication watchdog ─────────────────────────────
    let mut feeder = board.start_watchdog_feeder(0.2, FeederConfig::default())?;
    std::thread::sleep(Duration::from_millis(300));
    board.cwdt().set_period(0.1)?;
    std::thread::sleep(Duration::from_millis(300));
    board.stop_watchdog_feeder(&mut feeder)?;
    if let Some(fault) = feeder.take_fault() {
        warn!("feeder fault: {}", fault);
    }
    info!("watchdog fed {} times", device.feeds());
    Ok(())
}
