//! Typed values of the enumerated settings registers.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no {setting} is encoded as {value}")]
pub struct InvalidSetting {
    pub setting: &'static str,
    pub value: u16,
}

macro_rules! setting {
    (
        $(#[$doc:meta])*
        $name:ident ($label:literal) {
            $($(#[$variant_doc:meta])* $variant:ident = $value:literal,)*
        }
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$variant_doc])* $variant,)*
        }

        impl From<$name> for u16 {
            fn from(value: $name) -> u16 {
                match value {
                    $($name::$variant => $value,)*
                }
            }
        }

        impl TryFrom<u16> for $name {
            type Error = InvalidSetting;

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok($name::$variant),)*
                    _ => Err(InvalidSetting {
                        setting: $label,
                        value,
                    }),
                }
            }
        }
    };
}

setting! {
    /// Which energy flows the meter accumulates.
    MeasurementMode ("measurement mode") {
        /// Imported energy only; the current direction is ignored.
        A = 0,
        /// Imported and exported energy in separate meters.
        B = 1,
        /// Imported energy, exported energy subtracted.
        C = 2,
    }
}

setting! {
    AlarmMode ("alarm mode") {
        Disabled = 0,
        /// Alarm when the variable rises above the set point.
        Up = 1,
        /// Alarm when the variable falls below the set point.
        Down = 2,
    }
}

setting! {
    BaudRate ("baud rate") {
        B9600 = 1,
        B19200 = 2,
        B38400 = 3,
        B57600 = 4,
        B115200 = 5,
    }
}

setting! {
    Parity ("parity") {
        None = 1,
        Even = 2,
    }
}

setting! {
    StopBits ("stop bits") {
        One = 0,
        Two = 1,
    }
}

impl BaudRate {
    pub const fn bits_per_second(&self) -> u32 {
        match self {
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19_200,
            BaudRate::B38400 => 38_400,
            BaudRate::B57600 => 57_600,
            BaudRate::B115200 => 115_200,
        }
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bps", self.bits_per_second())
    }
}

/// Raw alarm status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlarmStatus(u16);

impl AlarmStatus {
    /// Set while the alarm output is active.
    pub const ACTIVE: u16 = 0x0001;

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub const fn contains(&self, mask: u16) -> bool {
        self.0 & mask == mask
    }

    pub const fn is_active(&self) -> bool {
        self.contains(Self::ACTIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_convert_both_ways() {
        assert_eq!(BaudRate::try_from(5), Ok(BaudRate::B115200));
        assert_eq!(u16::from(Parity::Even), 2);
        assert_eq!(StopBits::try_from(0), Ok(StopBits::One));
        assert_eq!(
            Parity::try_from(3),
            Err(InvalidSetting {
                setting: "parity",
                value: 3
            })
        );
        assert!(BaudRate::try_from(0).is_err());
        assert_eq!(MeasurementMode::try_from(2), Ok(MeasurementMode::C));
    }

    #[test]
    fn alarm_status_bits() {
        assert!(AlarmStatus::from_bits(0x0001).is_active());
        assert!(!AlarmStatus::from_bits(0x0002).is_active());
        assert!(AlarmStatus::from_bits(0x0003).contains(0x0002));
    }
}
