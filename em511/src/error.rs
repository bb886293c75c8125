//! Error types.

use thiserror::Error;

use crate::{codec::Address, decimal::Decimal, transport::TransportError};

/// Errors surfaced by meter operations.
///
/// None of them is retried or logged by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The attribute name is not in the register table.
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("attribute '{0}' is read-only")]
    NotWritable(&'static str),

    /// A guarded attribute was written while the meter is locked.
    #[error("writing '{0}' requires the meter to be unlocked")]
    AccessDenied(&'static str),

    #[error("invalid value for '{name}': {value}")]
    ValueOutOfRange { name: &'static str, value: Decimal },

    /// The meter reports an out-of-scale input (its display shows "EEE").
    #[error("input overflow (EEE) for '{name}' at address {address:#06x}")]
    Overflow { name: &'static str, address: Address },

    #[error("unexpected register count for address {address:#06x}: expected {expected}, got {actual}")]
    UnexpectedRegisterCount {
        address: Address,
        expected: u16,
        actual: usize,
    },

    /// The meter answered with a value outside the register's documented range.
    #[error("invalid reading for '{name}': {value}")]
    InvalidReading { name: &'static str, value: i64 },

    #[error("invalid device address {0}, must be within 1..=247")]
    InvalidDeviceAddress(u8),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
