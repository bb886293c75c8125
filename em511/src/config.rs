use crate::codec::WordOrder;

/// Password the EM511 ships with.
pub const DEFAULT_PASSWORD: u16 = 0;

/// Per-handle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Value of the `password` attribute that unlocks guarded writes.
    pub password: u16,
    /// Register order of 32-bit values.
    pub word_order: WordOrder,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            password: DEFAULT_PASSWORD,
            word_order: WordOrder::default(),
        }
    }
}

impl Config {
    pub fn with_password(mut self, password: u16) -> Self {
        self.password = password;
        self
    }

    pub fn with_word_order(mut self, word_order: WordOrder) -> Self {
        self.word_order = word_order;
        self
    }
}
