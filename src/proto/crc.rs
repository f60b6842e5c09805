//! CRC-16/Modbus.
//!
//! Init 0xFFFF, reflected input and output, polynomial 0x8005
//! (0xA001 reflected), no final XOR. Transmitted low byte first.

/// Reflected form of the Modbus polynomial 0x8005.
const POLY_REFLECTED: u16 = 0xA001;

const INIT: u16 = 0xFFFF;

/// Compute the Modbus CRC over `data`.
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc = INIT;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLY_REFLECTED;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}
