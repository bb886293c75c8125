//! The Modbus client interface the meter is driven through.

use std::{cell::RefCell, rc::Rc};

use thiserror::Error;
use tokio_modbus::{Exception, SlaveId};

use crate::codec::{Address, Quantity, Word};

/// Failure reported by the underlying Modbus client.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The device answered with a Modbus exception response.
    #[error("modbus exception: {0}")]
    Exception(Exception),

    /// Protocol or transport failure inside tokio-modbus (timeout, CRC, mismatched reply).
    #[error(transparent)]
    Modbus(tokio_modbus::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A blocking Modbus client that addresses a unit per call.
///
/// Framing, CRC, timeouts and retries are the implementor's business.
pub trait Transport {
    fn read_input_registers(
        &mut self,
        unit_id: SlaveId,
        address: Address,
        count: Quantity,
    ) -> Result<Vec<Word>, TransportError>;

    fn read_holding_registers(
        &mut self,
        unit_id: SlaveId,
        address: Address,
        count: Quantity,
    ) -> Result<Vec<Word>, TransportError>;

    /// Write single register (function code 0x06).
    fn write_register(
        &mut self,
        unit_id: SlaveId,
        address: Address,
        value: Word,
    ) -> Result<(), TransportError>;

    /// Write multiple registers (function code 0x10).
    fn write_registers(
        &mut self,
        unit_id: SlaveId,
        address: Address,
        values: &[Word],
    ) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_input_registers(
        &mut self,
        unit_id: SlaveId,
        address: Address,
        count: Quantity,
    ) -> Result<Vec<Word>, TransportError> {
        (**self).read_input_registers(unit_id, address, count)
    }

    fn read_holding_registers(
        &mut self,
        unit_id: SlaveId,
        address: Address,
        count: Quantity,
    ) -> Result<Vec<Word>, TransportError> {
        (**self).read_holding_registers(unit_id, address, count)
    }

    fn write_register(
        &mut self,
        unit_id: SlaveId,
        address: Address,
        value: Word,
    ) -> Result<(), TransportError> {
        (**self).write_register(unit_id, address, value)
    }

    fn write_registers(
        &mut self,
        unit_id: SlaveId,
        address: Address,
        values: &[Word],
    ) -> Result<(), TransportError> {
        (**self).write_registers(unit_id, address, values)
    }
}

/// Several meters on one RS-485 bus share the client through `Rc<RefCell<_>>`.
///
/// Each call borrows the client for the duration of a single transaction.
impl<T: Transport + ?Sized> Transport for Rc<RefCell<T>> {
    fn read_input_registers(
        &mut self,
        unit_id: SlaveId,
        address: Address,
        count: Quantity,
    ) -> Result<Vec<Word>, TransportError> {
        self.borrow_mut()
            .read_input_registers(unit_id, address, count)
    }

    fn read_holding_registers(
        &mut self,
        unit_id: SlaveId,
        address: Address,
        count: Quantity,
    ) -> Result<Vec<Word>, TransportError> {
        self.borrow_mut()
            .read_holding_registers(unit_id, address, count)
    }

    fn write_register(
        &mut self,
        unit_id: SlaveId,
        address: Address,
        value: Word,
    ) -> Result<(), TransportError> {
        self.borrow_mut().write_register(unit_id, address, value)
    }

    fn write_registers(
        &mut self,
        unit_id: SlaveId,
        address: Address,
        values: &[Word],
    ) -> Result<(), TransportError> {
        self.borrow_mut().write_registers(unit_id, address, values)
    }
}

#[cfg(any(feature = "rtu-sync", feature = "tcp-sync"))]
mod sync {
    use tokio_modbus::{
        client::sync::Context,
        prelude::{SlaveContext, SyncReader, SyncWriter},
        Slave, SlaveId,
    };

    use super::{Transport, TransportError};
    use crate::codec::{Address, Quantity, Word};

    fn map_tokio_result<T>(result: tokio_modbus::Result<T>) -> Result<T, TransportError> {
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(exception)) => Err(TransportError::Exception(exception)),
            Err(err) => Err(TransportError::Modbus(err)),
        }
    }

    /// Synchronous tokio-modbus client, RTU or TCP.
    impl Transport for Context {
        fn read_input_registers(
            &mut self,
            unit_id: SlaveId,
            address: Address,
            count: Quantity,
        ) -> Result<Vec<Word>, TransportError> {
            self.set_slave(Slave(unit_id));
            map_tokio_result(SyncReader::read_input_registers(self, address, count))
        }

        fn read_holding_registers(
            &mut self,
            unit_id: SlaveId,
            address: Address,
            count: Quantity,
        ) -> Result<Vec<Word>, TransportError> {
            self.set_slave(Slave(unit_id));
            map_tokio_result(SyncReader::read_holding_registers(self, address, count))
        }

        fn write_register(
            &mut self,
            unit_id: SlaveId,
            address: Address,
            value: Word,
        ) -> Result<(), TransportError> {
            self.set_slave(Slave(unit_id));
            map_tokio_result(SyncWriter::write_single_register(self, address, value))
        }

        fn write_registers(
            &mut self,
            unit_id: SlaveId,
            address: Address,
            values: &[Word],
        ) -> Result<(), TransportError> {
            self.set_slave(Slave(unit_id));
            map_tokio_result(SyncWriter::write_multiple_registers(self, address, values))
        }
    }
}
