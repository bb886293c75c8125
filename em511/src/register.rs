use crate::{
    codec::{Address, Decode, Encode, Quantity, Word, WordOrder},
    decimal::Decimal,
    error::{Error, Result},
};

/// Modbus register class, selecting the function code used to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterClass {
    /// Read with function code 0x04.
    Input,
    /// Read with 0x03, written with 0x06 or 0x10.
    Holding,
}

/// How raw register words become a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoding {
    Unsigned,
    Signed,
    /// Raw integer divided by `10^decimals`.
    Scaled { decimals: u32, signed: bool },
    /// Raw bits, each flagging a condition.
    Bitfield,
}

impl Decoding {
    pub const fn decimals(&self) -> u32 {
        match self {
            Decoding::Scaled { decimals, .. } => *decimals,
            _ => 0,
        }
    }

    pub const fn is_signed(&self) -> bool {
        matches!(
            self,
            Decoding::Signed | Decoding::Scaled { signed: true, .. }
        )
    }
}

/// Precondition of a guarded write.
///
/// Every setting except the password carries [`Guard::Unlocked`], including the
/// serial line settings (device id, baud rate, parity, stop bit, reply delay).
/// Drivers that write those without a prior password get `AccessDenied` here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// The meter must have been unlocked with the correct password.
    Unlocked,
}

/// Inclusive bounds on the raw register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub min: i64,
    pub max: i64,
}

impl Range {
    pub const fn contains(&self, raw: i64) -> bool {
        self.min <= raw && raw <= self.max
    }
}

/// Wire-level access plan of one named attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDescriptor {
    pub name: &'static str,
    pub class: RegisterClass,
    pub address: Address,
    pub word_count: Quantity,
    pub decoding: Decoding,
    pub writable: bool,
    pub guard: Option<Guard>,
    pub range: Option<Range>,
}

impl RegisterDescriptor {
    pub const fn input(
        name: &'static str,
        address: Address,
        word_count: Quantity,
        decoding: Decoding,
    ) -> Self {
        Self {
            name,
            class: RegisterClass::Input,
            address,
            word_count,
            decoding,
            writable: false,
            guard: None,
            range: None,
        }
    }

    pub const fn holding(
        name: &'static str,
        address: Address,
        word_count: Quantity,
        decoding: Decoding,
    ) -> Self {
        Self {
            class: RegisterClass::Holding,
            ..Self::input(name, address, word_count, decoding)
        }
    }

    pub const fn writable(self) -> Self {
        Self {
            writable: true,
            ..self
        }
    }

    pub const fn guarded(self, guard: Guard) -> Self {
        Self {
            guard: Some(guard),
            ..self.writable()
        }
    }

    pub const fn range(self, min: i64, max: i64) -> Self {
        Self {
            range: Some(Range { min, max }),
            ..self
        }
    }

    /// Raw value the meter reports for an out-of-scale input ("EEE").
    pub const fn overflow_marker(&self) -> u32 {
        if self.word_count == 1 {
            0x7FFF
        } else {
            0x7FFF_FFFF
        }
    }

    /// Compose `words` into the raw register integer, honouring signedness.
    pub fn raw_value(&self, words: &[Word], order: WordOrder) -> Result<i64> {
        let count_error = |actual: usize| Error::UnexpectedRegisterCount {
            address: self.address,
            expected: self.word_count,
            actual,
        };
        if words.len() != usize::from(self.word_count) {
            return Err(count_error(words.len()));
        }
        let bits = if self.word_count == 1 {
            u32::from(u16::from_words(words, order).map_err(|e| count_error(e.actual))?)
        } else {
            u32::from_words(words, order).map_err(|e| count_error(e.actual))?
        };
        if self.decoding != Decoding::Bitfield && bits == self.overflow_marker() {
            return Err(Error::Overflow {
                name: self.name,
                address: self.address,
            });
        }
        let raw = match (self.decoding.is_signed(), self.word_count) {
            (true, 1) => i64::from(bits as u16 as i16),
            (true, _) => i64::from(bits as i32),
            (false, _) => i64::from(bits),
        };
        if let Some(range) = self.range {
            if !range.contains(raw) {
                return Err(Error::InvalidReading {
                    name: self.name,
                    value: raw,
                });
            }
        }
        Ok(raw)
    }

    /// Decode the words of one read transaction into the attribute value.
    pub fn decode(&self, words: &[Word], order: WordOrder) -> Result<Decimal> {
        let raw = self.raw_value(words, order)?;
        Ok(Decimal::new(raw, self.decoding.decimals()))
    }

    /// Encode `value` into the words of one write transaction.
    ///
    /// The value is rounded to the register's decimals first; it must then fit
    /// the register width and signedness, and its declared range.
    pub fn encode(&self, value: Decimal, order: WordOrder) -> Result<Vec<Word>> {
        let out_of_range = || Error::ValueOutOfRange {
            name: self.name,
            value,
        };
        let raw = value
            .rescale(self.decoding.decimals())
            .ok_or_else(out_of_range)?
            .mantissa();
        if let Some(range) = self.range {
            if !range.contains(raw) {
                return Err(out_of_range());
            }
        }
        let words = match (self.decoding.is_signed(), self.word_count) {
            (true, 1) => i16::try_from(raw).map_err(|_| out_of_range())?.to_words(order),
            (true, _) => i32::try_from(raw).map_err(|_| out_of_range())?.to_words(order),
            (false, 1) => u16::try_from(raw).map_err(|_| out_of_range())?.to_words(order),
            (false, _) => u32::try_from(raw).map_err(|_| out_of_range())?.to_words(order),
        };
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOLTAGE: RegisterDescriptor = RegisterDescriptor::input(
        "V",
        0x0000,
        2,
        Decoding::Scaled {
            decimals: 1,
            signed: true,
        },
    );
    const POWER_FACTOR: RegisterDescriptor = RegisterDescriptor::input(
        "PF",
        0x000E,
        1,
        Decoding::Scaled {
            decimals: 3,
            signed: true,
        },
    );
    const PASSWORD: RegisterDescriptor =
        RegisterDescriptor::holding("password", 0x1000, 1, Decoding::Unsigned)
            .writable()
            .range(0, 9999);

    #[test]
    fn builders_set_access() {
        assert_eq!(VOLTAGE.class, RegisterClass::Input);
        assert!(!VOLTAGE.writable);
        assert_eq!(PASSWORD.class, RegisterClass::Holding);
        assert!(PASSWORD.writable);
        assert_eq!(PASSWORD.guard, None);
        let guarded = PASSWORD.guarded(Guard::Unlocked);
        assert!(guarded.writable);
        assert_eq!(guarded.guard, Some(Guard::Unlocked));
    }

    #[test]
    fn decode_scaled_decimal_is_exact() {
        let register = RegisterDescriptor::input(
            "x",
            0,
            2,
            Decoding::Scaled {
                decimals: 2,
                signed: false,
            },
        );
        let value = register
            .decode(&[0x0001, 0x0002], WordOrder::BigEndian)
            .unwrap();
        assert_eq!(value.to_string(), "655.38");
    }

    #[test]
    fn decode_honours_word_order() {
        let value = VOLTAGE
            .decode(&[0x9A28, 0x0001], WordOrder::LittleEndian)
            .unwrap();
        assert_eq!(value.to_string(), "10500.0");
        let value = VOLTAGE
            .decode(&[0x0000, 0x08FC], WordOrder::BigEndian)
            .unwrap();
        assert_eq!(value.to_string(), "230.0");
    }

    #[test]
    fn decode_signed_values() {
        let value = POWER_FACTOR.decode(&[0xFC18], WordOrder::BigEndian).unwrap();
        assert_eq!(value.to_string(), "-1.000");
        let value = VOLTAGE
            .decode(&[0xFFFF, 0xFFF6], WordOrder::BigEndian)
            .unwrap();
        assert_eq!(value.to_string(), "-1.0");
    }

    #[test]
    fn decode_reports_eee_overflow() {
        let err = VOLTAGE
            .decode(&[0x7FFF, 0xFFFF], WordOrder::BigEndian)
            .unwrap_err();
        assert!(matches!(err, Error::Overflow { name: "V", .. }));
        let err = POWER_FACTOR
            .decode(&[0x7FFF], WordOrder::BigEndian)
            .unwrap_err();
        assert!(matches!(err, Error::Overflow { address: 0x000E, .. }));
    }

    #[test]
    fn bitfield_has_no_overflow_marker() {
        let register = RegisterDescriptor::input("alarm", 0x0032, 1, Decoding::Bitfield);
        let value = register.decode(&[0x7FFF], WordOrder::BigEndian).unwrap();
        assert_eq!(value, Decimal::from(0x7FFF));
    }

    #[test]
    fn decode_rejects_wrong_register_count() {
        let err = VOLTAGE
            .decode(&[0x1860, 0x0023, 0x4244], WordOrder::BigEndian)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedRegisterCount {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn decode_checks_range() {
        assert_eq!(
            PASSWORD.decode(&[1234], WordOrder::BigEndian).unwrap(),
            Decimal::from(1234)
        );
        let err = PASSWORD.decode(&[10_000], WordOrder::BigEndian).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidReading {
                name: "password",
                value: 10_000
            }
        ));
    }

    #[test]
    fn encode_rounds_to_register_scale() {
        let value: Decimal = "229.96".parse().unwrap();
        assert_eq!(
            VOLTAGE.encode(value, WordOrder::BigEndian).unwrap(),
            vec![0x0000, 2300]
        );
        assert_eq!(
            VOLTAGE.encode(value, WordOrder::LittleEndian).unwrap(),
            vec![2300, 0x0000]
        );
    }

    #[test]
    fn encode_rejects_values_that_do_not_fit() {
        assert!(matches!(
            PASSWORD.encode(Decimal::from(12_345), WordOrder::BigEndian),
            Err(Error::ValueOutOfRange {
                name: "password",
                ..
            })
        ));
        assert!(PASSWORD.encode(Decimal::from(-1), WordOrder::BigEndian).is_err());
        let unsigned = RegisterDescriptor::holding("u", 0, 1, Decoding::Unsigned).writable();
        assert!(unsigned.encode(Decimal::from(-1), WordOrder::BigEndian).is_err());
        assert!(unsigned
            .encode(Decimal::from(0x1_0000), WordOrder::BigEndian)
            .is_err());
        assert_eq!(
            unsigned.encode(Decimal::from(0xFFFF), WordOrder::BigEndian).unwrap(),
            vec![0xFFFF]
        );
        assert!(POWER_FACTOR
            .encode("32.768".parse().unwrap(), WordOrder::BigEndian)
            .is_err());
        assert_eq!(
            POWER_FACTOR
                .encode("-0.5".parse().unwrap(), WordOrder::BigEndian)
                .unwrap(),
            vec![0xFE0C]
        );
    }
}
