use std::{cmp::Ordering, fmt, str::FromStr};

use thiserror::Error;

/// Largest supported number of fractional digits.
pub const MAX_SCALE: u32 = 18;

/// Exact fixed-point decimal: `mantissa / 10^scale`.
///
/// Meter readings are scaled integers, so they are kept as such instead of
/// being converted to binary floating point. Equality and ordering compare the
/// numeric value, so `230.0 == 230`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decimal {
    mantissa: i64,
    scale: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDecimalError {
    #[error("empty decimal string")]
    Empty,
    #[error("invalid digit in decimal string {0:?}")]
    InvalidDigit(String),
    #[error("decimal {0:?} does not fit into 64 bits")]
    Overflow(String),
}

const fn pow10(exp: u32) -> i128 {
    10i128.pow(exp)
}

impl Decimal {
    pub const ZERO: Decimal = Decimal::new(0, 0);

    /// Create `mantissa / 10^scale`.
    ///
    /// # Panics
    ///
    /// If `scale` exceeds [`MAX_SCALE`].
    pub const fn new(mantissa: i64, scale: u32) -> Self {
        assert!(scale <= MAX_SCALE, "decimal scale out of range");
        Self { mantissa, scale }
    }

    pub const fn mantissa(&self) -> i64 {
        self.mantissa
    }

    pub const fn scale(&self) -> u32 {
        self.scale
    }

    pub const fn is_negative(&self) -> bool {
        self.mantissa < 0
    }

    /// Return the same value expressed with exactly `scale` fractional digits.
    ///
    /// Dropped digits are rounded half to even. Returns `None` when the result
    /// does not fit the mantissa or `scale` exceeds [`MAX_SCALE`].
    pub fn rescale(&self, scale: u32) -> Option<Self> {
        if scale > MAX_SCALE {
            return None;
        }
        let mantissa = i128::from(self.mantissa);
        let rescaled = match scale.cmp(&self.scale) {
            Ordering::Equal => mantissa,
            Ordering::Greater => mantissa.checked_mul(pow10(scale - self.scale))?,
            Ordering::Less => {
                let divisor = pow10(self.scale - scale);
                let quotient = mantissa / divisor;
                let remainder = (mantissa % divisor).abs();
                let round_up = match (2 * remainder).cmp(&divisor) {
                    Ordering::Greater => true,
                    Ordering::Equal => quotient % 2 != 0,
                    Ordering::Less => false,
                };
                if round_up {
                    quotient + mantissa.signum()
                } else {
                    quotient
                }
            }
        };
        Some(Self {
            mantissa: i64::try_from(rescaled).ok()?,
            scale,
        })
    }

    /// The integral value, if there is no fractional part.
    pub fn to_integer(&self) -> Option<i64> {
        let divisor = pow10(self.scale);
        let mantissa = i128::from(self.mantissa);
        if mantissa % divisor == 0 {
            i64::try_from(mantissa / divisor).ok()
        } else {
            None
        }
    }

    fn aligned(&self, other: &Self) -> (i128, i128) {
        let scale = self.scale.max(other.scale);
        (
            i128::from(self.mantissa) * pow10(scale - self.scale),
            i128::from(other.mantissa) * pow10(scale - other.scale),
        )
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        let (lhs, rhs) = self.aligned(other);
        lhs == rhs
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lhs, rhs) = self.aligned(other);
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = u128::from(self.mantissa.unsigned_abs());
        let divisor = pow10(self.scale).unsigned_abs();
        write!(
            f,
            "{sign}{}.{:0width$}",
            abs / divisor,
            abs % divisor,
            width = self.scale as usize
        )
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (integral, fractional) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if integral.is_empty() && fractional.is_empty() {
            return Err(ParseDecimalError::Empty);
        }
        if !integral
            .chars()
            .chain(fractional.chars())
            .all(|c| c.is_ascii_digit())
        {
            return Err(ParseDecimalError::InvalidDigit(s.to_owned()));
        }
        let scale = u32::try_from(fractional.len())
            .ok()
            .filter(|scale| *scale <= MAX_SCALE)
            .ok_or_else(|| ParseDecimalError::Overflow(s.to_owned()))?;
        let mantissa = integral
            .chars()
            .chain(fractional.chars())
            .try_fold(0i64, |acc, c| {
                let digit = i64::from(c.to_digit(10).unwrap_or(0));
                acc.checked_mul(10)?.checked_add(digit)
            })
            .ok_or_else(|| ParseDecimalError::Overflow(s.to_owned()))?;
        Ok(Self {
            mantissa: if negative { -mantissa } else { mantissa },
            scale,
        })
    }
}

macro_rules! impl_from_integer {
    ($($int:ty),*) => {
        $(
            impl From<$int> for Decimal {
                fn from(value: $int) -> Self {
                    Self::new(i64::from(value), 0)
                }
            }
        )*
    };
}

impl_from_integer!(u8, u16, u32, i8, i16, i32, i64);
