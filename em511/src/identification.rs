use std::fmt;

use crate::{
    codec::{Address, Quantity, Word},
    error::{Error, Result},
};

/// First of the two holding registers carrying identification code and firmware revision.
pub const IDENTIFICATION_ADDRESS: Address = 0x0302;
pub const IDENTIFICATION_WORD_COUNT: Quantity = 2;

/// Model identification and firmware revision, as shown on the meter display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub code: String,
    pub firmware: String,
}

/// Bytes 0..=9 are digits, printable ASCII stands for itself.
fn decode_char(byte: u8) -> Result<char> {
    match byte {
        0..=9 => Ok(char::from(b'0' + byte)),
        b' '..=b'~' => Ok(char::from(byte)),
        _ => Err(Error::InvalidReading {
            name: "identification",
            value: i64::from(byte),
        }),
    }
}

fn decode_word(word: Word) -> Result<String> {
    word.to_be_bytes().into_iter().map(decode_char).collect()
}

impl Identification {
    pub fn decode(words: &[Word]) -> Result<Self> {
        match *words {
            [code, firmware] => Ok(Self {
                code: decode_word(code)?,
                firmware: decode_word(firmware)?,
            }),
            _ => Err(Error::UnexpectedRegisterCount {
                address: IDENTIFICATION_ADDRESS,
                expected: IDENTIFICATION_WORD_COUNT,
                actual: words.len(),
            }),
        }
    }
}

impl fmt::Display for Identification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.code, self.firmware)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_digits_and_letters() {
        let identification = Identification::decode(&[0x0501, 0x4103]).unwrap();
        assert_eq!(identification.code, "51");
        assert_eq!(identification.firmware, "A3");
        assert_eq!(identification.to_string(), "51-A3");
    }

    #[test]
    fn decode_rejects_unprintable_bytes() {
        let err = Identification::decode(&[0x0501, 0x1203]).unwrap_err();
        assert!(matches!(err, Error::InvalidReading { value: 0x12, .. }));
    }

    #[test]
    fn decode_requires_two_words() {
        assert!(matches!(
            Identification::decode(&[0x0501]),
            Err(Error::UnexpectedRegisterCount { actual: 1, .. })
        ));
    }
}
