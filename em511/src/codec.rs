use std::mem::size_of;

use thiserror::Error;

pub use tokio_modbus::{Address, Quantity};

/// 16-bit value stored in Modbus register.
pub type Word = u16;

/// Order of the registers composing a multi-register value.
///
/// Bytes inside a single register are always big-endian, as Modbus mandates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordOrder {
    /// The first register holds the most significant word.
    #[default]
    BigEndian,
    /// The first register holds the least significant word.
    /// This is the order the EM511 firmware uses for its 32-bit registers.
    LittleEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expected {expected} words, got {actual}")]
pub struct WordsCountError {
    pub expected: usize,
    pub actual: usize,
}

/// Decode a value from Big or Little Endian-ordered `Word`s.
pub trait Decode: Sized {
    fn from_be_words(words: &[Word]) -> Result<Self, WordsCountError>;
    fn from_le_words(words: &[Word]) -> Result<Self, WordsCountError>;

    fn from_words(words: &[Word], order: WordOrder) -> Result<Self, WordsCountError> {
        match order {
            WordOrder::BigEndian => Self::from_be_words(words),
            WordOrder::LittleEndian => Self::from_le_words(words),
        }
    }
}

macro_rules! impl_decode {
    ($num_type:ty) => {
        impl Decode for $num_type {
            fn from_be_words(words: &[Word]) -> Result<Self, WordsCountError> {
                let count_error = WordsCountError {
                    expected: size_of::<$num_type>() / 2,
                    actual: words.len(),
                };
                let bytes = words
                    .iter()
                    .copied()
                    .flat_map(u16::to_be_bytes)
                    .collect::<Vec<u8>>();
                let array = bytes.try_into().or(Err(count_error))?;
                Ok(<$num_type>::from_be_bytes(array))
            }
            fn from_le_words(words: &[Word]) -> Result<Self, WordsCountError> {
                let reversed = words.iter().rev().copied().collect::<Vec<Word>>();
                Self::from_be_words(&reversed)
            }
        }
    };
}

impl_decode!(i16);
impl_decode!(i32);
impl_decode!(u16);
impl_decode!(u32);

/// Encode a value into Big or Little Endian-ordered `Word`s.
pub trait Encode: Sized {
    fn to_be_words(self) -> Vec<Word>;

    fn to_le_words(self) -> Vec<Word> {
        let mut words = self.to_be_words();
        words.reverse();
        words
    }

    fn to_words(self, order: WordOrder) -> Vec<Word> {
        match order {
            WordOrder::BigEndian => self.to_be_words(),
            WordOrder::LittleEndian => self.to_le_words(),
        }
    }
}

macro_rules! impl_encode {
    ($num_type:ty) => {
        impl Encode for $num_type {
            fn to_be_words(self) -> Vec<Word> {
                self.to_be_bytes()
                    .chunks_exact(2)
                    .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                    .collect()
            }
        }
    };
}

impl_encode!(i16);
impl_encode!(i32);
impl_encode!(u16);
impl_encode!(u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_big_endian_puts_first_register_high() {
        assert_eq!(u32::from_be_words(&[0x0001, 0x0002]), Ok(0x0001_0002));
        assert_eq!(i32::from_be_words(&[0xFFFF, 0xFFFE]), Ok(-2));
        assert_eq!(u16::from_be_words(&[0x08FC]), Ok(2300));
    }

    #[test]
    fn decode_little_endian_puts_first_register_low() {
        assert_eq!(u32::from_le_words(&[0x9A28, 0x0001]), Ok(105_000));
        assert_eq!(
            u32::from_words(&[0x1860, 0x0023], WordOrder::LittleEndian),
            Ok(2_300_000)
        );
    }

    #[test]
    fn decode_rejects_wrong_word_count() {
        assert_eq!(
            u32::from_be_words(&[0x1860, 0x0023, 0x4244]),
            Err(WordsCountError {
                expected: 2,
                actual: 3
            })
        );
        assert!(i16::from_be_words(&[]).is_err());
    }

    #[test]
    fn encode_respects_word_order() {
        assert_eq!(65_538u32.to_be_words(), vec![0x0001, 0x0002]);
        assert_eq!(65_538u32.to_le_words(), vec![0x0002, 0x0001]);
        assert_eq!((-2i32).to_words(WordOrder::BigEndian), vec![0xFFFF, 0xFFFE]);
        assert_eq!(1236u16.to_words(WordOrder::LittleEndian), vec![1236]);
    }
}
