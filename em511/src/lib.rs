//! Typed register mapping for the Carlo Gavazzi EM511 energy meter over Modbus RTU,
//! on top of [tokio-modbus](https://github.com/slowtec/tokio-modbus).

//! ## Register map
//!
//! Every attribute of the meter is described by a [`register::RegisterDescriptor`] in the
//! constant [`table::REGISTERS`] table: its register class, start address, word count,
//! decoding rule and, for settings, whether it is writable and guarded by the password.
//!
//! ## Meter handle
//!
//! [`Em511`] reads and writes attributes by name ([`Em511::read`], [`Em511::write`])
//! or through typed accessors generated from the same table ([`Em511::voltage`],
//! [`Em511::set_device_id`], ...). Values are exact [`Decimal`]s.
//! Each call is one blocking transaction on a caller-owned [`transport::Transport`];
//! with the `rtu-sync` or `tcp-sync` feature it is implemented for
//! `tokio_modbus::client::sync::Context`.
//!
//! ```no_run
//! # #[cfg(feature = "serial")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use em511::{codec::WordOrder, Config, Em511};
//! use tokio_modbus::Slave;
//!
//! let builder = tokio_serial::new("/dev/ttyUSB0", 9600);
//! let mut ctx = tokio_modbus::client::sync::rtu::connect_slave(&builder, Slave(1))?;
//! let config = Config::default().with_word_order(WordOrder::LittleEndian);
//! let mut meter = Em511::with_config(1, &mut ctx, config)?;
//! println!("{} V, {} kWh", meter.voltage()?, meter.total_energy()?);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```
//!
//! Registers are composed big-endian unless [`Config::with_word_order`] says otherwise;
//! a physical EM511 sends the least significant register first.
//!
//! Settings are guarded: write the correct password first ([`Em511::unlock`]).

/// Utilities for encoding from and decoding to Modbus registers
pub mod codec;
pub mod command;
pub mod config;
pub mod decimal;
pub mod error;
pub mod identification;
pub mod meter;
/// Register descriptors and their decoding rules
pub mod register;
pub mod settings;
pub mod table;
/// The Modbus client the meter is driven through
pub mod transport;

/// In-memory EM511 to test against and to serve over Modbus (based on tokio-modbus [servers examples](https://github.com/slowtec/tokio-modbus/tree/main/examples))
#[cfg(feature = "simulator")]
pub mod simulator;

pub use command::Command;
pub use config::Config;
pub use decimal::Decimal;
pub use error::{Error, Result};
pub use meter::{Em511, LockState};
pub use transport::{Transport, TransportError};
