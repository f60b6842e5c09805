//! I2C-HAT request/response protocol.
//!
//! ```text
//! ┌────────────┐  Frame   ┌─────────────┐  raw bytes  ┌──────────┐
//! │ registers  │────────▶│  transport  │───────────▶│ I2C bus  │
//! │ (typed ops)│◀────────│ (retry/lock)│◀───────────│ (hal)    │
//! └────────────┘          └─────────────┘             └──────────┘
//!                               │ codec + crc
//! ```
//!
//! Every request carries a fresh frame id; a valid response echoes the
//! id and the command byte and carries a CRC-16/Modbus trailer.

pub mod codec;
pub mod command;
pub mod crc;
pub mod registers;
pub mod transport;
