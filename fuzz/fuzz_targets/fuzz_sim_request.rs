//! Fuzz target: simulated peripheral request handling
//!
//! Writes arbitrary bytes to a simulated board and reads back a frame of
//! arbitrary length. The simulator must never panic, whatever the
//! request looks like.
//!
//! cargo fuzz run fuzz_sim_request

#![no_main]

use embedded_hal::i2c::I2c;
use hatbus::board::BoardModel;
use hatbus::sim::{SimBus, SimDevice};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&read_len, request)) = data.split_first() else {
        return;
    };
    let mut bus = SimBus::new().with_device(SimDevice::for_model(0x60, BoardModel::DI6acDQ6rly));
    let _ = bus.write(0x60, request);
    let mut buf = vec![0u8; read_len as usize % 40];
    let _ = bus.write_read(0x60, &[0xFF], &mut buf);
});
