//! The EM511 register map.
//!
//! Addresses follow the EM500 series Modbus protocol: measurements are input
//! registers, settings are holding registers.

use crate::{
    error::{Error, Result},
    register::{
        Decoding::{self, Bitfield, Scaled, Unsigned},
        Guard::Unlocked,
        RegisterDescriptor as R,
    },
};

pub const VOLTAGE: &str = "V";
pub const CURRENT: &str = "A";
pub const ACTIVE_POWER: &str = "W";
pub const APPARENT_POWER: &str = "VA";
pub const REACTIVE_POWER: &str = "var";
pub const DEMAND_POWER: &str = "W_dmd";
pub const DEMAND_APPARENT_POWER: &str = "VA_dmd";
pub const POWER_FACTOR: &str = "PF";
pub const FREQUENCY: &str = "Hz";
pub const TOTAL_ENERGY: &str = "kWh_tot";
pub const TOTAL_REACTIVE_ENERGY: &str = "kvarh_tot";
pub const DEMAND_POWER_PEAK: &str = "W_dmd_peak";
pub const PARTIAL_ENERGY: &str = "kWh_partial";
pub const PARTIAL_REACTIVE_ENERGY: &str = "kvarh_partial";
pub const DEMAND_CURRENT: &str = "A_dmd";
pub const DEMAND_CURRENT_PEAK: &str = "A_dmd_peak";
pub const TOTAL_EXPORTED_ENERGY: &str = "kWh_neg_tot";
pub const TOTAL_EXPORTED_REACTIVE_ENERGY: &str = "kvarh_neg_tot";
pub const HOUR_COUNTER: &str = "hour_counter";
pub const PARTIAL_HOUR_COUNTER: &str = "hour_counter_partial";
pub const LIFETIME_COUNTER: &str = "lifetime_counter";
pub const ALARM_STATUS: &str = "alarm_status";

pub const IDENTIFICATION_CODE: &str = "identification_code";
pub const PASSWORD: &str = "password";
pub const DEMAND_INTEGRATION_TIME: &str = "demand_integration_time";
pub const MEASUREMENT_MODE: &str = "measurement_mode";
pub const ALARM_MODE: &str = "alarm_mode";
pub const ALARM_SET_POINT: &str = "alarm_set_point";
pub const ALARM_DELAY: &str = "alarm_delay";
pub const DEVICE_ID: &str = "device_id";
pub const BAUD_RATE: &str = "baud_rate";
pub const PARITY: &str = "parity";
pub const STOP_BIT: &str = "stop_bit";
pub const REPLY_DELAY: &str = "reply_delay";

const fn scaled(decimals: u32) -> Decoding {
    Scaled {
        decimals,
        signed: true,
    }
}

const fn counter(decimals: u32) -> Decoding {
    Scaled {
        decimals,
        signed: false,
    }
}

/// Every attribute of the meter.
pub const REGISTERS: &[R] = &[
    // Instantaneous values
    R::input(VOLTAGE, 0x0000, 2, scaled(1)),
    R::input(CURRENT, 0x0002, 2, scaled(3)),
    R::input(ACTIVE_POWER, 0x0004, 2, scaled(1)),
    R::input(APPARENT_POWER, 0x0006, 2, scaled(1)),
    R::input(REACTIVE_POWER, 0x0008, 2, scaled(1)),
    R::input(DEMAND_POWER, 0x000A, 2, scaled(1)),
    R::input(DEMAND_APPARENT_POWER, 0x000C, 2, scaled(1)),
    R::input(POWER_FACTOR, 0x000E, 1, scaled(3)),
    R::input(FREQUENCY, 0x000F, 1, counter(1)),
    // Energy meters
    R::input(TOTAL_ENERGY, 0x0010, 2, counter(1)),
    R::input(TOTAL_REACTIVE_ENERGY, 0x0012, 2, counter(1)),
    R::input(DEMAND_POWER_PEAK, 0x0014, 2, scaled(1)),
    R::input(PARTIAL_ENERGY, 0x0016, 2, counter(1)),
    R::input(PARTIAL_REACTIVE_ENERGY, 0x0018, 2, counter(1)),
    R::input(DEMAND_CURRENT, 0x001A, 2, scaled(3)),
    R::input(DEMAND_CURRENT_PEAK, 0x001C, 2, scaled(3)),
    R::input(TOTAL_EXPORTED_ENERGY, 0x0020, 2, counter(1)),
    R::input(TOTAL_EXPORTED_REACTIVE_ENERGY, 0x0022, 2, counter(1)),
    // Counters
    R::input(HOUR_COUNTER, 0x0028, 2, counter(2)),
    R::input(PARTIAL_HOUR_COUNTER, 0x002A, 2, counter(2)),
    R::input(LIFETIME_COUNTER, 0x002C, 2, counter(2)),
    R::input(ALARM_STATUS, 0x0032, 1, Bitfield),
    // Identification and settings
    R::holding(IDENTIFICATION_CODE, 0x000B, 1, Unsigned),
    R::holding(PASSWORD, 0x1000, 1, Unsigned)
        .writable()
        .range(0, 9999),
    R::holding(DEMAND_INTEGRATION_TIME, 0x1010, 1, Unsigned)
        .guarded(Unlocked)
        .range(1, 30),
    R::holding(MEASUREMENT_MODE, 0x1103, 1, Unsigned)
        .guarded(Unlocked)
        .range(0, 2),
    R::holding(ALARM_MODE, 0x1105, 1, Unsigned)
        .guarded(Unlocked)
        .range(0, 2),
    R::holding(ALARM_SET_POINT, 0x1106, 2, scaled(1)).guarded(Unlocked),
    R::holding(ALARM_DELAY, 0x1108, 1, Unsigned)
        .guarded(Unlocked)
        .range(0, 3600),
    R::holding(DEVICE_ID, 0x2000, 1, Unsigned)
        .guarded(Unlocked)
        .range(1, 247),
    R::holding(BAUD_RATE, 0x2001, 1, Unsigned)
        .guarded(Unlocked)
        .range(1, 5),
    R::holding(PARITY, 0x2002, 1, Unsigned)
        .guarded(Unlocked)
        .range(1, 2),
    R::holding(STOP_BIT, 0x2003, 1, Unsigned)
        .guarded(Unlocked)
        .range(0, 1),
    R::holding(REPLY_DELAY, 0x2004, 1, Unsigned)
        .guarded(Unlocked)
        .range(0, 1000),
];

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

const fn is_well_formed(registers: &[R]) -> bool {
    let mut i = 0;
    while i < registers.len() {
        let count = registers[i].word_count;
        if count != 1 && count != 2 {
            return false;
        }
        let mut j = i + 1;
        while j < registers.len() {
            if str_eq(registers[i].name, registers[j].name) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(
    is_well_formed(REGISTERS),
    "register names must be unique and span one or two words"
);

/// Find the descriptor of `name` (case-sensitive).
pub fn lookup(name: &str) -> Result<&'static R> {
    REGISTERS
        .iter()
        .find(|register| register.name == name)
        .ok_or_else(|| Error::UnknownAttribute(name.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::RegisterClass;

    #[test]
    fn lookup_is_exact() {
        let register = lookup("V").unwrap();
        assert_eq!(register.address, 0x0000);
        assert_eq!(register.word_count, 2);
        assert_eq!(register.class, RegisterClass::Input);
        assert!(matches!(lookup("v"), Err(Error::UnknownAttribute(name)) if name == "v"));
        assert!(matches!(lookup("nonexistent"), Err(Error::UnknownAttribute(_))));
    }

    #[test]
    fn configuration_registers() {
        let password = lookup(PASSWORD).unwrap();
        assert_eq!(password.address, 0x1000);
        assert!(password.writable);
        assert_eq!(password.guard, None);
        for (name, address) in [
            (DEVICE_ID, 0x2000),
            (BAUD_RATE, 0x2001),
            (PARITY, 0x2002),
            (STOP_BIT, 0x2003),
        ] {
            let register = lookup(name).unwrap();
            assert_eq!(register.address, address);
            assert_eq!(register.class, RegisterClass::Holding);
            assert!(register.guard.is_some());
        }
    }

    #[test]
    fn measurements_are_read_only() {
        for register in REGISTERS.iter().filter(|r| r.class == RegisterClass::Input) {
            assert!(!register.writable, "{} must be read-only", register.name);
        }
    }

    #[test]
    fn guarded_registers_are_writable() {
        for register in REGISTERS.iter().filter(|r| r.guard.is_some()) {
            assert!(register.writable, "{}", register.name);
        }
    }

    #[test]
    fn registers_do_not_overlap() {
        for (i, a) in REGISTERS.iter().enumerate() {
            for b in &REGISTERS[i + 1..] {
                if a.class != b.class {
                    continue;
                }
                let disjoint = a.address + a.word_count <= b.address
                    || b.address + b.word_count <= a.address;
                assert!(disjoint, "{} overlaps {}", a.name, b.name);
            }
        }
    }
}
