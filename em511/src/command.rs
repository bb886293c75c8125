use std::fmt;

use crate::codec::{Address, Word};

/// Value written to a control register to trigger its action.
pub const RESET_SENTINEL: Word = 0x000A;

/// Parameterless control actions of the meter.
///
/// Each is a single write of a fixed sentinel to a fixed control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Reset total energy meters and the run-hour counter.
    ResetTotal,
    /// Reset partial energy meters and the partial hour counter.
    ResetPartial,
    /// Reset demand and demand peak values.
    ResetDemand,
    /// Restore factory settings.
    FactoryReset,
}

impl Command {
    pub const ALL: [Command; 4] = [
        Command::ResetTotal,
        Command::ResetPartial,
        Command::ResetDemand,
        Command::FactoryReset,
    ];

    pub const fn address(&self) -> Address {
        match self {
            Command::ResetTotal => 0x4001,
            Command::ResetPartial => 0x4002,
            Command::ResetDemand => 0x4003,
            Command::FactoryReset => 0x4004,
        }
    }

    pub const fn sentinel(&self) -> Word {
        RESET_SENTINEL
    }

    /// The command controlling `address`, if any.
    pub fn from_address(address: Address) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.address() == address)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::ResetTotal => "reset total",
            Command::ResetPartial => "reset partial",
            Command::ResetDemand => "reset demand",
            Command::FactoryReset => "factory reset",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_registers_are_distinct() {
        for command in Command::ALL {
            assert_eq!(Command::from_address(command.address()), Some(command));
            assert_eq!(command.sentinel(), RESET_SENTINEL);
        }
        assert_eq!(Command::from_address(0x1000), None);
    }
}
