//! Board construction, identity and capability checks.

use std::sync::Arc;

use hatbus::board::{Board, BoardConfig, BoardModel};
use hatbus::config::TransportConfig;
use hatbus::error::Error;
use hatbus::proto::transport::Bus;
use hatbus::sim::{SimBus, SimDevice};

fn sim_bus(devices: &[SimDevice]) -> Arc<Bus<SimBus>> {
    let mut bus = SimBus::new();
    for dev in devices {
        bus.attach(dev.clone());
    }
    Arc::new(Bus::new(bus))
}

// ── Addressing ────────────────────────────────────────────────

#[test]
fn address_inside_family_opens() {
    let dev = SimDevice::for_model(0x41, BoardModel::Di16);
    let board = Board::open(sim_bus(&[dev]), 0x41, BoardModel::Di16).unwrap();
    assert_eq!(board.address(), 0x41);
}

#[test]
fn address_outside_family_is_rejected_without_traffic() {
    let dev = SimDevice::for_model(0x51, BoardModel::Di16);
    let err = Board::open(sim_bus(&[dev.clone()]), 0x51, BoardModel::Di16).err();
    assert_eq!(
        err,
        Some(Error::InvalidAddress {
            address: 0x51,
            base: Some(0x40)
        })
    );
    assert_eq!(dev.request_writes(), 0);
}

#[test]
fn address_above_seven_bits_is_rejected() {
    let config = BoardConfig {
        base_address: None,
        ..BoardModel::Rly10.config()
    };
    let err = Board::with_config(sim_bus(&[]), 0x80, config, TransportConfig::default()).err();
    assert_eq!(
        err,
        Some(Error::InvalidAddress {
            address: 0x80,
            base: None
        })
    );
}

#[test]
fn model_with_out_of_range_base_cannot_open() {
    for address in [0x00, 0x70, 0x7F] {
        assert!(matches!(
            Board::open(sim_bus(&[]), address, BoardModel::DI6dwDQ6ssr),
            Err(Error::InvalidAddress { .. })
        ));
    }
}

// ── Identity ──────────────────────────────────────────────────

#[test]
fn wrong_board_name_is_rejected() {
    let dev = SimDevice::for_model(0x50, BoardModel::Rly10);
    let err = Board::open(sim_bus(&[dev]), 0x50, BoardModel::DQ16oc).err();
    match err {
        Some(Error::UnexpectedBoardIdentity { expected, found }) => {
            assert_eq!(expected, "DQ16oc I2C-HAT");
            assert_eq!(found.as_str(), "Rly10 I2C-HAT");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn reported_name_may_extend_the_expected_one() {
    let dev = SimDevice::new(0x40, "Di16 I2C-HAT rev2");
    assert!(Board::open(sim_bus(&[dev]), 0x40, BoardModel::Di16).is_ok());
}

#[test]
fn empty_expected_name_skips_identity_read() {
    let dev = SimDevice::new(0x20, "anything");
    let config = BoardConfig {
        name: String::new(),
        base_address: None,
        di_labels: vec!["A".into()],
        dq_labels: Vec::new(),
    };
    Board::with_config(sim_bus(&[dev.clone()]), 0x20, config, TransportConfig::default())
        .unwrap();
    assert_eq!(dev.request_writes(), 0);
}

// ── Facade ────────────────────────────────────────────────────

#[test]
fn identity_and_status() {
    let dev = SimDevice::for_model(0x60, BoardModel::Di6Rly6);
    dev.set_firmware_version([2, 1, 14]);
    dev.set_status_word(0x8000_0001);
    let board = Board::open(sim_bus(&[dev.clone()]), 0x60, BoardModel::Di6Rly6).unwrap();

    assert_eq!(board.name().unwrap().as_str(), "Di6Rly6 I2C-HAT");
    assert_eq!(board.firmware_version().unwrap().as_str(), "v2.1.14");
    assert_eq!(board.status_word().unwrap(), 0x8000_0001);
    assert_eq!(board.to_string(), "Di6Rly6 I2C-HAT adr: 0x60");
    assert!(board.last_transfer().is_some());

    board.reset().unwrap();
    assert_eq!(dev.resets(), 1);
}

#[test]
fn missing_capabilities() {
    let di = SimDevice::for_model(0x40, BoardModel::Di16);
    let dq = SimDevice::for_model(0x50, BoardModel::Rly10);
    let bus = sim_bus(&[di, dq]);

    let inputs_only = Board::open(Arc::clone(&bus), 0x40, BoardModel::Di16).unwrap();
    assert!(matches!(
        inputs_only.digital_outputs(),
        Err(Error::UnsupportedCapability(_))
    ));
    assert_eq!(inputs_only.digital_inputs().unwrap().labels().len(), 16);

    let outputs_only = Board::open(bus, 0x50, BoardModel::Rly10).unwrap();
    assert!(matches!(
        outputs_only.digital_inputs(),
        Err(Error::UnsupportedCapability(_))
    ));
}

#[test]
fn blocked_labels_resolve_case_insensitively() {
    let dev = SimDevice::for_model(0x40, BoardModel::Di16);
    dev.set_inputs(1 << 4);
    let board = Board::open(sim_bus(&[dev]), 0x40, BoardModel::Di16).unwrap();
    let inputs = board.digital_inputs().unwrap();

    assert!(inputs.channel("di2.1").unwrap());
    assert!(!inputs.channel("Di1.4").unwrap());
}

#[test]
fn custom_board_from_json() {
    let config = BoardConfig::from_json(
        r#"{ "name": "Custom", "base_address": 32, "dq_labels": ["pump", "valve"] }"#,
    )
    .unwrap();
    let dev = SimDevice::new(0x23, "Custom board");
    let board = Board::with_config(
        sim_bus(&[dev.clone()]),
        0x23,
        config,
        TransportConfig::default(),
    )
    .unwrap();

    board.digital_outputs().unwrap().set_channel("VALVE", true).unwrap();
    assert_eq!(dev.outputs(), 0b10);
}
