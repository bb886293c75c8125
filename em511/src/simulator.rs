use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use futures::future;
use log::warn;
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_modbus::{server, Exception, Request, Response, SlaveId};

use crate::{
    codec::{Address, Quantity, Word, WordOrder},
    command::Command,
    decimal::Decimal,
    error::Result,
    identification::IDENTIFICATION_ADDRESS,
    register::RegisterClass,
    table::{self, REGISTERS},
    transport::{Transport, TransportError},
};

#[derive(Debug, Clone, Default)]
/// A raw Modbus input or holding register bank
pub struct Registers(HashMap<Address, Word>);

impl Registers {
    /// Insert new consecutive registers with `words` values starting at `addr` address.
    pub fn insert(&mut self, addr: Address, words: &[Word]) {
        for (i, value) in words.iter().enumerate() {
            self.0.insert(addr + i as Address, *value);
        }
    }

    /// Read `cnt` consecutive registers starting at `addr`.
    pub fn read(&self, addr: Address, cnt: Quantity) -> Result<Vec<Word>, Exception> {
        (0..cnt)
            .map(|i| {
                let reg_addr = addr.wrapping_add(i);
                self.0.get(&reg_addr).copied().ok_or_else(|| {
                    warn!("SIMULATOR: no register at address {reg_addr:#06x}");
                    Exception::IllegalDataAddress
                })
            })
            .collect()
    }

    /// Write `words` into existing consecutive registers starting at `addr`.
    ///
    /// Nothing is written unless every target register exists.
    pub fn write(&mut self, addr: Address, words: &[Word]) -> Result<(), Exception> {
        let cnt = Quantity::try_from(words.len()).map_err(|_| Exception::IllegalDataValue)?;
        self.read(addr, cnt)?;
        self.insert(addr, words);
        Ok(())
    }
}

/// Simulated EM511 register banks.
///
/// It answers reads and writes like the meter, runs the command registers and
/// rejects unmapped addresses with `IllegalDataAddress`. It does not check
/// passwords; that gate lives in the client handle.
#[derive(Debug, Clone)]
pub struct Em511Device {
    pub input_registers: Registers,
    pub holding_registers: Registers,
    word_order: WordOrder,
}

impl Default for Em511Device {
    fn default() -> Self {
        Self::new(WordOrder::default())
    }
}

/// Settings after a factory reset.
const FACTORY_SETTINGS: &[(&str, i64)] = &[
    (table::IDENTIFICATION_CODE, 0x0078),
    (table::PASSWORD, 0),
    (table::DEMAND_INTEGRATION_TIME, 15),
    (table::MEASUREMENT_MODE, 0),
    (table::ALARM_MODE, 0),
    (table::ALARM_SET_POINT, 0),
    (table::ALARM_DELAY, 0),
    (table::DEVICE_ID, 1),
    (table::BAUD_RATE, 1),
    (table::PARITY, 1),
    (table::STOP_BIT, 0),
    (table::REPLY_DELAY, 0),
];

/// Firmware identification words: code "51", revision "A3".
const IDENTIFICATION: [Word; 2] = [0x0501, 0x4103];

impl Em511Device {
    pub fn new(word_order: WordOrder) -> Self {
        let mut device = Self {
            input_registers: Registers::default(),
            holding_registers: Registers::default(),
            word_order,
        };
        for register in REGISTERS {
            let zeros = vec![0; usize::from(register.word_count)];
            device.bank_mut(register.class).insert(register.address, &zeros);
        }
        device
            .holding_registers
            .insert(IDENTIFICATION_ADDRESS, &IDENTIFICATION);
        for command in Command::ALL {
            device.holding_registers.insert(command.address(), &[0]);
        }
        device.restore_factory_settings();
        device
    }

    pub fn word_order(&self) -> WordOrder {
        self.word_order
    }

    fn bank(&self, class: RegisterClass) -> &Registers {
        match class {
            RegisterClass::Input => &self.input_registers,
            RegisterClass::Holding => &self.holding_registers,
        }
    }

    fn bank_mut(&mut self, class: RegisterClass) -> &mut Registers {
        match class {
            RegisterClass::Input => &mut self.input_registers,
            RegisterClass::Holding => &mut self.holding_registers,
        }
    }

    /// Store `value` into the named attribute, writable or not.
    pub fn set(&mut self, name: &str, value: impl Into<Decimal>) -> Result<()> {
        let register = table::lookup(name)?;
        let words = register.encode(value.into(), self.word_order)?;
        self.bank_mut(register.class).insert(register.address, &words);
        Ok(())
    }

    /// Current value of the named attribute.
    pub fn get(&self, name: &str) -> Result<Decimal> {
        let register = table::lookup(name)?;
        let words = self
            .bank(register.class)
            .read(register.address, register.word_count)
            .map_err(TransportError::Exception)?;
        register.decode(&words, self.word_order)
    }

    fn zero(&mut self, names: &[&str]) {
        for name in names {
            if let Ok(register) = table::lookup(name) {
                let zeros = vec![0; usize::from(register.word_count)];
                self.bank_mut(register.class).insert(register.address, &zeros);
            }
        }
    }

    fn restore_factory_settings(&mut self) {
        for (name, value) in FACTORY_SETTINGS {
            if let Err(err) = self.set(name, *value) {
                warn!("SIMULATOR: cannot restore {name}: {err}");
            }
        }
    }

    /// Run the action of `command`, as the meter does when its control register is written.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::ResetTotal => self.zero(&[
                table::TOTAL_ENERGY,
                table::TOTAL_REACTIVE_ENERGY,
                table::TOTAL_EXPORTED_ENERGY,
                table::TOTAL_EXPORTED_REACTIVE_ENERGY,
                table::HOUR_COUNTER,
            ]),
            Command::ResetPartial => self.zero(&[
                table::PARTIAL_ENERGY,
                table::PARTIAL_REACTIVE_ENERGY,
                table::PARTIAL_HOUR_COUNTER,
            ]),
            Command::ResetDemand => self.zero(&[
                table::DEMAND_POWER,
                table::DEMAND_APPARENT_POWER,
                table::DEMAND_POWER_PEAK,
                table::DEMAND_CURRENT,
                table::DEMAND_CURRENT_PEAK,
            ]),
            Command::FactoryReset => self.restore_factory_settings(),
        }
    }

    fn write_holding(&mut self, addr: Address, words: &[Word]) -> Result<(), Exception> {
        self.holding_registers.write(addr, words)?;
        if let (Some(command), [value]) = (Command::from_address(addr), words) {
            if *value == command.sentinel() {
                self.apply(command);
            }
        }
        Ok(())
    }

    /// Serve one Modbus request.
    pub fn call(&mut self, req: Request<'_>) -> Result<Response, Exception> {
        match req {
            Request::ReadInputRegisters(addr, cnt) => self
                .input_registers
                .read(addr, cnt)
                .map(Response::ReadInputRegisters),
            Request::ReadHoldingRegisters(addr, cnt) => self
                .holding_registers
                .read(addr, cnt)
                .map(Response::ReadHoldingRegisters),
            Request::WriteSingleRegister(addr, value) => {
                self.write_holding(addr, &[value])?;
                Ok(Response::WriteSingleRegister(addr, value))
            }
            Request::WriteMultipleRegisters(addr, values) => {
                self.write_holding(addr, &values)?;
                Ok(Response::WriteMultipleRegisters(addr, values.len() as Quantity))
            }
            _ => {
                warn!("SIMULATOR: Exception::IllegalFunction - Unimplemented function code in request: {req:?}");
                Err(Exception::IllegalFunction)
            }
        }
    }
}

/// Loopback client, every unit id addresses this device.
impl Transport for Em511Device {
    fn read_input_registers(
        &mut self,
        _unit_id: SlaveId,
        address: Address,
        count: Quantity,
    ) -> Result<Vec<Word>, TransportError> {
        self.input_registers
            .read(address, count)
            .map_err(TransportError::Exception)
    }

    fn read_holding_registers(
        &mut self,
        _unit_id: SlaveId,
        address: Address,
        count: Quantity,
    ) -> Result<Vec<Word>, TransportError> {
        self.holding_registers
            .read(address, count)
            .map_err(TransportError::Exception)
    }

    fn write_register(
        &mut self,
        _unit_id: SlaveId,
        address: Address,
        value: Word,
    ) -> Result<(), TransportError> {
        self.write_holding(address, &[value])
            .map_err(TransportError::Exception)
    }

    fn write_registers(
        &mut self,
        _unit_id: SlaveId,
        address: Address,
        values: &[Word],
    ) -> Result<(), TransportError> {
        self.write_holding(address, values)
            .map_err(TransportError::Exception)
    }
}

#[derive(Debug, Clone, Default)]
/// Wrapper around [Em511Device] needed because of [tokio_modbus::server::Service](https://docs.rs/tokio-modbus/latest/tokio_modbus/server/trait.Service.html).
pub struct Simulator(pub Arc<Mutex<Em511Device>>);

impl Simulator {
    pub fn new(device: Em511Device) -> Self {
        Self(Arc::new(Mutex::new(device)))
    }
}

impl tokio_modbus::server::Service for Simulator {
    type Request = Request<'static>;
    type Response = Response;
    type Error = std::io::Error;
    type Future = future::Ready<Result<Self::Response, Self::Error>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        let response = match self.0.lock() {
            Ok(mut device) => device.call(req).map_err(|exc| {
                // TODO: Return a Modbus Exception response once the server supports it https://github.com/slowtec/tokio-modbus/issues/165
                std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, exc.to_string())
            }),
            Err(_) => Err(std::io::Error::other("simulator state poisoned")),
        };
        future::ready(response)
    }
}

async fn run_tcp_server_context(
    socket_addr: SocketAddr,
    simulator: Simulator,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(socket_addr).await?;
    let server = server::tcp::Server::new(listener);
    let new_service = |_socket_addr| Ok(Some(simulator.clone()));
    let on_connected = |stream, socket_addr| async move {
        server::tcp::accept_tcp_connection(stream, socket_addr, new_service)
    };
    let on_process_error = |err| {
        warn!("SIMULATOR: {err}");
    };
    server.serve(&on_connected, on_process_error).await
}

/// Spawn a Modbus TCP server for `simulator` and run it forever.
pub fn spawn_tcp_simulator(socket_addr: SocketAddr, simulator: Simulator) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = run_tcp_server_context(socket_addr, simulator).await {
            warn!("SIMULATOR: {err}");
        }
    })
}

/// Spawn a Modbus RTU server for `simulator` on the serial port at `path` and run it forever.
#[cfg(feature = "serial")]
pub fn spawn_rtu_simulator(
    path: &str,
    baud_rate: u32,
    simulator: Simulator,
) -> Result<JoinHandle<()>, std::io::Error> {
    let builder = tokio_serial::new(path, baud_rate);
    let serial_stream = tokio_serial::SerialStream::open(&builder)?;
    let server = server::rtu::Server::new(serial_stream);

    Ok(tokio::spawn(async move {
        if let Err(err) = server.serve_forever(simulator).await {
            warn!("SIMULATOR: {err}");
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Em511;

    #[test]
    fn registers_reject_unmapped_addresses() {
        let mut registers = Registers::default();
        registers.insert(0x10, &[1, 2]);
        assert_eq!(registers.read(0x10, 2), Ok(vec![1, 2]));
        assert_eq!(registers.read(0x11, 2), Err(Exception::IllegalDataAddress));
        assert_eq!(
            registers.write(0x11, &[7, 8]),
            Err(Exception::IllegalDataAddress)
        );
        assert_eq!(registers.read(0x10, 2), Ok(vec![1, 2]));
    }

    #[test]
    fn device_starts_with_factory_settings() {
        let device = Em511Device::default();
        assert_eq!(device.get(table::DEVICE_ID).unwrap(), Decimal::from(1));
        assert_eq!(
            device.get(table::DEMAND_INTEGRATION_TIME).unwrap(),
            Decimal::from(15)
        );
        assert_eq!(device.get(table::VOLTAGE).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn reset_commands_clear_their_counters() {
        let mut device = Em511Device::default();
        device.set(table::TOTAL_ENERGY, Decimal::new(12_345, 1)).unwrap();
        device.set(table::PARTIAL_ENERGY, Decimal::new(42, 0)).unwrap();
        device.set(table::DEMAND_POWER_PEAK, Decimal::new(30_000, 1)).unwrap();

        let mut meter = Em511::new(1, &mut device).unwrap();
        meter.reset_partial().unwrap();
        assert_eq!(meter.partial_energy().unwrap(), Decimal::ZERO);
        assert_eq!(meter.total_energy().unwrap().to_string(), "1234.5");
        meter.reset_demand().unwrap();
        assert_eq!(meter.demand_power_peak().unwrap(), Decimal::ZERO);
        meter.reset_total().unwrap();
        assert_eq!(meter.total_energy().unwrap(), Decimal::ZERO);
    }

    #[test]
    fn factory_reset_restores_settings() {
        let mut device = Em511Device::default();
        let mut meter = Em511::new(1, &mut device).unwrap();
        assert!(meter.unlock(0).unwrap());
        meter.set_device_id(42).unwrap();
        meter.set_reply_delay(500).unwrap();
        meter.factory_reset().unwrap();
        assert_eq!(meter.device_id().unwrap(), 1);
        assert_eq!(meter.reply_delay().unwrap(), 0);
    }

    #[test]
    fn serves_modbus_requests() {
        let mut device = Em511Device::default();
        device.set(table::VOLTAGE, Decimal::new(2300, 1)).unwrap();
        assert_eq!(
            device.call(Request::ReadInputRegisters(0x0000, 2)),
            Ok(Response::ReadInputRegisters(vec![0x0000, 2300]))
        );
        assert_eq!(
            device.call(Request::WriteSingleRegister(0x2004, 250)),
            Ok(Response::WriteSingleRegister(0x2004, 250))
        );
        assert_eq!(device.get(table::REPLY_DELAY).unwrap(), Decimal::from(250));
        assert_eq!(
            device.call(Request::ReadCoils(0, 1)),
            Err(Exception::IllegalFunction)
        );
    }
}
