use std::collections::HashMap;

use em511::{
    codec::{Address, Quantity, Word},
    Transport, TransportError,
};
use tokio_modbus::SlaveId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ReadInput {
        unit: SlaveId,
        address: Address,
        count: Quantity,
    },
    ReadHolding {
        unit: SlaveId,
        address: Address,
        count: Quantity,
    },
    WriteRegister {
        unit: SlaveId,
        address: Address,
        value: Word,
    },
    WriteRegisters {
        unit: SlaveId,
        address: Address,
        values: Vec<Word>,
    },
}

/// Register-backed transport recording every transaction.
///
/// Unset registers read as zero. `reply` overrides the words of the next read,
/// `failure` makes every call fail with an I/O error of that kind.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub input: HashMap<Address, Word>,
    pub holding: HashMap<Address, Word>,
    pub calls: Vec<Call>,
    pub reply: Option<Vec<Word>>,
    pub failure: Option<std::io::ErrorKind>,
}

impl MockTransport {
    pub fn with_input(mut self, address: Address, words: &[Word]) -> Self {
        for (i, word) in words.iter().enumerate() {
            self.input.insert(address + i as Address, *word);
        }
        self
    }

    pub fn with_holding(mut self, address: Address, words: &[Word]) -> Self {
        for (i, word) in words.iter().enumerate() {
            self.holding.insert(address + i as Address, *word);
        }
        self
    }

    fn check(&self) -> Result<(), TransportError> {
        match self.failure {
            Some(kind) => Err(std::io::Error::new(kind, "simulated failure").into()),
            None => Ok(()),
        }
    }

    fn read(
        &mut self,
        holding: bool,
        address: Address,
        count: Quantity,
    ) -> Result<Vec<Word>, TransportError> {
        self.check()?;
        if let Some(reply) = self.reply.take() {
            return Ok(reply);
        }
        let bank = if holding { &self.holding } else { &self.input };
        Ok((0..count)
            .map(|i| bank.get(&(address + i)).copied().unwrap_or_default())
            .collect())
    }
}

impl Transport for MockTransport {
    fn read_input_registers(
        &mut self,
        unit: SlaveId,
        address: Address,
        count: Quantity,
    ) -> Result<Vec<Word>, TransportError> {
        self.calls.push(Call::ReadInput {
            unit,
            address,
            count,
        });
        self.read(false, address, count)
    }

    fn read_holding_registers(
        &mut self,
        unit: SlaveId,
        address: Address,
        count: Quantity,
    ) -> Result<Vec<Word>, TransportError> {
        self.calls.push(Call::ReadHolding {
            unit,
            address,
            count,
        });
        self.read(true, address, count)
    }

    fn write_register(
        &mut self,
        unit: SlaveId,
        address: Address,
        value: Word,
    ) -> Result<(), TransportError> {
        self.calls.push(Call::WriteRegister {
            unit,
            address,
            value,
        });
        self.check()?;
        self.holding.insert(address, value);
        Ok(())
    }

    fn write_registers(
        &mut self,
        unit: SlaveId,
        address: Address,
        values: &[Word],
    ) -> Result<(), TransportError> {
        self.calls.push(Call::WriteRegisters {
            unit,
            address,
            values: values.to_vec(),
        });
        self.check()?;
        for (i, value) in values.iter().enumerate() {
            self.holding.insert(address + i as Address, *value);
        }
        Ok(())
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
