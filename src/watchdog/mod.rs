//! Background feeder for a board's communication watchdog.
//!
//! Once started, the feeder reads the watchdog period whenever more than
//! half of the last known period has passed since the previous feed. The
//! read itself re-arms the board's watchdog. Between feeds it polls its
//! control channel every `poll_interval_ms`.
//!
//! Any communication failure is terminal: the loop publishes the error on
//! the fault channel and exits, leaving the feeder `Stopped`. The owner
//! picks the fault up with [`WatchdogFeeder::take_fault`] and decides
//! whether to restart.

pub mod channels;

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::config::FeederConfig;
use crate::error::{Error, Result};
use crate::proto::command::Command;
use crate::proto::registers::Registers;
use crate::proto::transport::Exchange;

use self::channels::{ControlMsg, FeederChannels};

/// Feeder thread name.
const THREAD_NAME: &str = "cwdt-feeder";

/// Lifecycle: `Stopped → Running → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeederState {
    Stopped,
    Running,
}

type SharedExchange = Arc<dyn Exchange + Send + Sync>;

/// Owns the feeder thread for one board.
///
/// Dropping the feeder stops the thread.
pub struct WatchdogFeeder {
    exchange: SharedExchange,
    channels: Arc<FeederChannels>,
    config: FeederConfig,
    handle: Option<JoinHandle<()>>,
}

impl WatchdogFeeder {
    pub fn new<E>(exchange: Arc<E>, config: FeederConfig) -> Result<Self>
    where
        E: Exchange + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self {
            exchange,
            channels: Arc::new(FeederChannels::new()),
            config,
            handle: None,
        })
    }

    pub fn state(&self) -> FeederState {
        match &self.handle {
            Some(handle) if !handle.is_finished() => FeederState::Running,
            _ => FeederState::Stopped,
        }
    }

    /// Spawn the feeder thread. No-op while already running.
    pub fn start(&mut self) -> Result<()> {
        if self.state() == FeederState::Running {
            return Ok(());
        }
        // Reap a thread that exited on its own after a fault.
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.channels.drain_control();

        let exchange = Arc::clone(&self.exchange);
        let channels = Arc::clone(&self.channels);
        let poll = Duration::from_millis(self.config.poll_interval_ms as u64);

        let handle = std::thread::Builder::new()
            .name(THREAD_NAME.into())
            .stack_size(self.config.stack_kb * 1024)
            .spawn(move || feed_loop(exchange.as_ref(), &channels, poll))
            .map_err(|e| {
                error!("Feeder: spawn failed: {}", e);
                Error::Spawn
            })?;

        info!(
            "Feeder: started (poll={}ms, stack={}KB)",
            self.config.poll_interval_ms, self.config.stack_kb
        );
        self.handle = Some(handle);
        Ok(())
    }

    /// Ask the loop to terminate and wait for it.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        while !handle.is_finished() {
            if self.channels.control.try_send(ControlMsg::Stop).is_ok() {
                break;
            }
            std::thread::yield_now();
        }
        if handle.join().is_err() {
            warn!("Feeder: thread panicked");
        }
        info!("Feeder: stopped");
    }

    /// Force an immediate feed and period re-read, e.g. after the period
    /// was changed. Ignored while stopped.
    pub fn update(&self) {
        if self.state() == FeederState::Running {
            // A full queue already holds an update or a stop.
            let _ = self.channels.control.try_send(ControlMsg::Update);
        }
    }

    /// The communication error that stopped the loop, if any.
    pub fn take_fault(&self) -> Option<Error> {
        self.channels.faults.try_receive().ok()
    }

    pub(crate) fn channels(&self) -> &Arc<FeederChannels> {
        &self.channels
    }
}

impl Drop for WatchdogFeeder {
    fn drop(&mut self) {
        self.stop();
    }
}

fn feed_loop(exchange: &dyn Exchange, channels: &FeederChannels, poll: Duration) {
    let mut last_feed: Option<Instant> = None;
    let mut half_period = Duration::ZERO;

    loop {
        if last_feed.is_none_or(|at| at.elapsed() > half_period) {
            match exchange.get_u32(Command::CwdtGetPeriod) {
                Ok(period_ms) => {
                    last_feed = Some(Instant::now());
                    half_period = Duration::from_millis(period_ms as u64) / 2;
                    debug!("Feeder: fed, period={}ms", period_ms);
                }
                Err(e) => {
                    error!("Feeder: communication lost: {}", e);
                    channels.publish_fault(e);
                    return;
                }
            }
        }

        match channels.control.try_receive() {
            Ok(ControlMsg::Stop) => return,
            Ok(ControlMsg::Update) => last_feed = None,
            Err(_) => std::thread::sleep(poll),
        }
    }
}
