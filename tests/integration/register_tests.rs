//! Register protocol through the board facade.

use std::sync::Arc;

use hatbus::board::{Board, BoardConfig, BoardModel};
use hatbus::config::TransportConfig;
use hatbus::error::Error;
use hatbus::proto::codec::Frame;
use hatbus::proto::command::{Command, Edge};
use hatbus::proto::transport::Bus;
use hatbus::sim::{SimBus, SimDevice};

use crate::mock_bus::MockBus;

fn fast() -> TransportConfig {
    TransportConfig {
        retry_backoff_ms: 0,
        ..TransportConfig::default()
    }
}

fn sim_board(address: u8, model: BoardModel) -> (Board<SimBus>, SimDevice) {
    let dev = SimDevice::for_model(address, model);
    let bus = Arc::new(Bus::new(SimBus::new().with_device(dev.clone())));
    let board = Board::with_config(bus, address, model.config(), fast()).unwrap();
    (board, dev)
}

/// A board with no identity check, so construction puts nothing on the wire.
fn mock_board(mock: &MockBus, transport: TransportConfig) -> Board<MockBus> {
    let config = BoardConfig {
        name: String::new(),
        base_address: Some(0x40),
        di_labels: vec!["In0".into(), "In1".into(), "In2".into(), "In3".into()],
        dq_labels: vec!["Out0".into()],
    };
    Board::with_config(Arc::new(Bus::new(mock.clone())), 0x40, config, transport).unwrap()
}

// ── Wire-level scenarios ──────────────────────────────────────

#[test]
fn channel_state_request_and_response_bytes() {
    let mock = MockBus::new();
    mock.reply(0x1E, Command::DiGetChannelState, &[0x03, 0x01]);
    let board = mock_board(
        &mock,
        TransportConfig {
            first_frame_id: 0x1E,
            ..fast()
        },
    );

    assert!(board.digital_inputs().unwrap().channel(3u8).unwrap());

    let expected = Frame::new(0x1E, Command::DiGetChannelState, &[0x03])
        .unwrap()
        .encode();
    assert_eq!(mock.written_frames(), vec![expected.to_vec()]);
}

#[test]
fn non_zero_counter_reset_produces_no_traffic() {
    let mock = MockBus::new();
    let board = mock_board(&mock, fast());

    assert_eq!(
        board
            .digital_inputs()
            .unwrap()
            .reset_counter("in1", Edge::Rising, 5),
        Err(Error::InvalidCounterResetValue(5))
    );
    assert!(mock.calls().is_empty());
}

#[test]
fn bad_channel_references_never_reach_the_bus() {
    let mock = MockBus::new();
    let board = mock_board(&mock, fast());
    let inputs = board.digital_inputs().unwrap();

    assert_eq!(
        inputs.channel(4u8),
        Err(Error::IndexOutOfRange { index: 4, count: 4 })
    );
    assert_eq!(
        inputs.counter("Rly1", Edge::Falling),
        Err(Error::UnknownLabel("Rly1".into()))
    );
    assert!(mock.calls().is_empty());
}

#[test]
fn wrong_echo_is_unexpected_format_and_not_retried() {
    let mock = MockBus::new();
    mock.reply(0x1F, Command::DqSetAllChannelStates, &[1, 0, 0, 0]);
    let board = mock_board(&mock, fast());

    assert_eq!(
        board.digital_outputs().unwrap().set_value(0),
        Err(Error::UnexpectedFormat(Command::DqSetAllChannelStates))
    );
    assert_eq!(mock.writes(), 1);
}

#[test]
fn output_values_beyond_channel_count_never_reach_the_bus() {
    let mock = MockBus::new();
    let board = mock_board(&mock, fast());
    let outputs = board.digital_outputs().unwrap();
    let rejected = Err(Error::InvalidValue {
        value: 2,
        channels: 1,
    });

    assert_eq!(outputs.set_value(2), rejected);
    assert_eq!(outputs.set_power_on_value(2), rejected);
    assert_eq!(outputs.set_safety_value(2), rejected);
    assert!(mock.calls().is_empty());
}

// ── Against the simulator ─────────────────────────────────────

#[test]
fn set_channel_then_read_back() {
    let (board, dev) = sim_board(0x50, BoardModel::Rly10);
    let outputs = board.digital_outputs().unwrap();

    outputs.set_channel(4u8, true).unwrap();
    assert!(outputs.channel(4u8).unwrap());
    assert!(outputs.channel("rly5").unwrap());
    assert_eq!(dev.outputs(), 1 << 4);

    outputs.set_channel("Rly5", false).unwrap();
    assert!(!outputs.channel(4u8).unwrap());
}

#[test]
fn all_outputs_value() {
    let (board, dev) = sim_board(0x50, BoardModel::DQ8rly);
    let outputs = board.digital_outputs().unwrap();
    outputs.set_value(0xA5).unwrap();
    assert_eq!(outputs.value().unwrap(), 0xA5);
    assert_eq!(dev.outputs(), 0xA5);
}

#[test]
fn power_on_and_safety_values() {
    let (board, _dev) = sim_board(0x60, BoardModel::DI6acDQ6rly);
    let outputs = board.digital_outputs().unwrap();

    outputs.set_power_on_value(0b11).unwrap();
    outputs.set_safety_value(0b101).unwrap();
    assert_eq!(outputs.power_on_value().unwrap(), 0b11);
    assert_eq!(outputs.safety_value().unwrap(), 0b101);

    // Six outputs: bit 5 is the highest valid one.
    outputs.set_safety_value(0b10_0000).unwrap();
    assert_eq!(
        outputs.set_safety_value(0b100_0000),
        Err(Error::InvalidValue {
            value: 0b100_0000,
            channels: 6
        })
    );
    assert_eq!(outputs.safety_value().unwrap(), 0b10_0000);
}

#[test]
fn input_states_and_counters() {
    let (board, dev) = sim_board(0x40, BoardModel::DI16ac);
    dev.set_inputs(0b1001);
    dev.set_counter(3, Edge::Falling, 11);
    dev.set_counter(3, Edge::Rising, 12);

    let inputs = board.digital_inputs().unwrap();
    assert_eq!(inputs.value().unwrap(), 0b1001);
    assert!(inputs.channel("I0").unwrap());
    assert!(!inputs.channel("I1").unwrap());
    assert_eq!(inputs.counter("I3", Edge::Falling).unwrap(), 11);
    assert_eq!(inputs.counter("I3", Edge::Rising).unwrap(), 12);

    inputs.reset_counter("I3", Edge::Rising, 0).unwrap();
    assert_eq!(dev.counter(3, Edge::Rising), Some(0));
    assert_eq!(dev.counter(3, Edge::Falling), Some(11));

    inputs.reset_counters().unwrap();
    assert_eq!(dev.counter(3, Edge::Falling), Some(0));
}

#[test]
fn cwdt_period_in_seconds() {
    let (board, dev) = sim_board(0x50, BoardModel::DQ10rly);
    let cwdt = board.cwdt();

    cwdt.set_period(1.5).unwrap();
    assert_eq!(dev.cwdt_period_ms(), 1500);
    assert_eq!(cwdt.period().unwrap(), 1.5);
    assert_eq!(cwdt.period_duration().unwrap().as_millis(), 1500);

    cwdt.set_state(1).unwrap();
    assert_eq!(dev.cwdt_state(), 1);
}

#[test]
fn cwdt_rejects_bad_periods_before_the_bus() {
    let (board, dev) = sim_board(0x50, BoardModel::DQ10rly);
    let before = dev.request_writes();

    assert_eq!(board.cwdt().set_period(-0.5), Err(Error::InvalidPeriod));
    assert_eq!(board.cwdt().set_period(f32::NAN), Err(Error::InvalidPeriod));
    assert_eq!(board.cwdt().set_period(f32::INFINITY), Err(Error::InvalidPeriod));
    assert_eq!(dev.request_writes(), before);
}

#[test]
fn scripted_short_payload_is_unexpected_format() {
    let (board, dev) = sim_board(0x50, BoardModel::Rly10);
    // Same length as the expected echo, wrong content.
    dev.script_next_payload(&[7, 7]);
    assert_eq!(
        board.digital_outputs().unwrap().set_channel(0u8, true),
        Err(Error::UnexpectedFormat(Command::DqSetChannelState))
    );
}
