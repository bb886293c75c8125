use log::debug;
use tokio_modbus::{Slave, SlaveId};

use crate::{
    codec::{Address, Quantity, Word},
    command::Command,
    config::Config,
    decimal::Decimal,
    error::{Error, Result},
    identification::{Identification, IDENTIFICATION_ADDRESS, IDENTIFICATION_WORD_COUNT},
    register::{Guard, RegisterClass},
    settings::{AlarmMode, AlarmStatus, BaudRate, MeasurementMode, Parity, StopBits},
    table,
    transport::Transport,
};

/// Session state of the password gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Locked,
    Unlocked,
}

/// One EM511 meter on a Modbus bus.
///
/// Every call performs exactly one live transaction on `client`; nothing is
/// cached. The handle never opens or closes the client.
#[derive(Debug)]
pub struct Em511<T> {
    device_address: SlaveId,
    client: T,
    config: Config,
    lock: LockState,
}

impl<T: Transport> Em511<T> {
    /// Attach to the meter at `device_address` (1..=247) through an already connected client.
    pub fn new(device_address: SlaveId, client: T) -> Result<Self> {
        Self::with_config(device_address, client, Config::default())
    }

    pub fn with_config(device_address: SlaveId, client: T, config: Config) -> Result<Self> {
        if !Slave(device_address).is_single_device() {
            return Err(Error::InvalidDeviceAddress(device_address));
        }
        Ok(Self {
            device_address,
            client,
            config,
            lock: LockState::Locked,
        })
    }

    pub fn device_address(&self) -> SlaveId {
        self.device_address
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn lock_state(&self) -> LockState {
        self.lock
    }

    pub fn is_unlocked(&self) -> bool {
        self.lock == LockState::Unlocked
    }

    pub fn client(&self) -> &T {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut T {
        &mut self.client
    }

    /// Give the client back to the caller.
    pub fn into_inner(self) -> T {
        self.client
    }

    /// Read the named attribute.
    pub fn read(&mut self, name: &str) -> Result<Decimal> {
        let register = table::lookup(name)?;
        let words = self.read_words(register.class, register.address, register.word_count)?;
        register.decode(&words, self.config.word_order)
    }

    /// Write the named attribute.
    ///
    /// The value is rounded to the register's decimals. Nothing is sent when
    /// the attribute is read-only, guarded while locked, or the value does not
    /// fit the register.
    pub fn write(&mut self, name: &str, value: impl Into<Decimal>) -> Result<()> {
        let value = value.into();
        let register = table::lookup(name)?;
        if !register.writable {
            return Err(Error::NotWritable(register.name));
        }
        if register.guard == Some(Guard::Unlocked) && !self.is_unlocked() {
            return Err(Error::AccessDenied(register.name));
        }
        let words = register.encode(value, self.config.word_order)?;
        self.write_words(register.address, &words)?;
        if register.name == table::PASSWORD {
            self.update_lock(&words);
        }
        Ok(())
    }

    /// Write `password` to the meter; returns whether it unlocked guarded writes.
    pub fn unlock(&mut self, password: u16) -> Result<bool> {
        self.write(table::PASSWORD, password)?;
        Ok(self.is_unlocked())
    }

    /// Forget a previous unlock. No transaction is issued.
    pub fn lock(&mut self) {
        self.set_lock(LockState::Locked);
    }

    pub fn execute(&mut self, command: Command) -> Result<()> {
        debug!(
            "{command}: unit={} addr={:#06x} value={:#06x}",
            self.device_address,
            command.address(),
            command.sentinel()
        );
        self.client
            .write_register(self.device_address, command.address(), command.sentinel())?;
        Ok(())
    }

    /// Reset total energy meters and the run-hour counter.
    pub fn reset_total(&mut self) -> Result<()> {
        self.execute(Command::ResetTotal)
    }

    /// Reset partial energy meters and the partial hour counter.
    pub fn reset_partial(&mut self) -> Result<()> {
        self.execute(Command::ResetPartial)
    }

    /// Reset demand and demand peak.
    pub fn reset_demand(&mut self) -> Result<()> {
        self.execute(Command::ResetDemand)
    }

    pub fn factory_reset(&mut self) -> Result<()> {
        self.execute(Command::FactoryReset)
    }

    /// Identification code and firmware revision.
    pub fn identification(&mut self) -> Result<Identification> {
        let words = self.read_words(
            RegisterClass::Holding,
            IDENTIFICATION_ADDRESS,
            IDENTIFICATION_WORD_COUNT,
        )?;
        Identification::decode(&words)
    }

    pub fn alarm_status(&mut self) -> Result<AlarmStatus> {
        self.read_integer(table::ALARM_STATUS)
            .map(AlarmStatus::from_bits)
    }

    pub fn alarm_set_point(&mut self) -> Result<Decimal> {
        self.read(table::ALARM_SET_POINT)
    }

    pub fn set_alarm_set_point(&mut self, value: impl Into<Decimal>) -> Result<()> {
        self.write(table::ALARM_SET_POINT, value)
    }

    fn read_words(
        &mut self,
        class: RegisterClass,
        address: Address,
        count: Quantity,
    ) -> Result<Vec<Word>> {
        debug!(
            "read {class:?}: unit={} addr={address:#06x} cnt={count}",
            self.device_address
        );
        let words = match class {
            RegisterClass::Input => {
                self.client
                    .read_input_registers(self.device_address, address, count)?
            }
            RegisterClass::Holding => {
                self.client
                    .read_holding_registers(self.device_address, address, count)?
            }
        };
        Ok(words)
    }

    fn write_words(&mut self, address: Address, words: &[Word]) -> Result<()> {
        debug!(
            "write: unit={} addr={address:#06x} words={words:04x?}",
            self.device_address
        );
        match words {
            [word] => self
                .client
                .write_register(self.device_address, address, *word)?,
            _ => self
                .client
                .write_registers(self.device_address, address, words)?,
        }
        Ok(())
    }

    fn read_integer(&mut self, name: &'static str) -> Result<u16> {
        let value = self.read(name)?;
        value
            .to_integer()
            .and_then(|raw| u16::try_from(raw).ok())
            .ok_or(Error::InvalidReading {
                name,
                value: value.mantissa(),
            })
    }

    fn read_setting<S: TryFrom<u16>>(&mut self, name: &'static str) -> Result<S> {
        let raw = self.read_integer(name)?;
        S::try_from(raw).map_err(|_| Error::InvalidReading {
            name,
            value: i64::from(raw),
        })
    }

    fn update_lock(&mut self, password: &[Word]) {
        let state = if password == [self.config.password] {
            LockState::Unlocked
        } else {
            LockState::Locked
        };
        self.set_lock(state);
    }

    fn set_lock(&mut self, state: LockState) {
        if self.lock != state {
            debug!("unit {}: {:?} -> {state:?}", self.device_address, self.lock);
        }
        self.lock = state;
    }
}

macro_rules! measurements {
    ($($(#[$doc:meta])* $fn_name:ident => $attr:expr;)*) => {
        impl<T: Transport> Em511<T> {
            $(
                $(#[$doc])*
                pub fn $fn_name(&mut self) -> Result<Decimal> {
                    self.read($attr)
                }
            )*
        }
    };
}

measurements! {
    /// Voltage in V.
    voltage => table::VOLTAGE;
    /// Current in A.
    current => table::CURRENT;
    /// Active power in W.
    active_power => table::ACTIVE_POWER;
    /// Apparent power in VA.
    apparent_power => table::APPARENT_POWER;
    /// Reactive power in var.
    reactive_power => table::REACTIVE_POWER;
    /// Active power demand in W.
    demand_power => table::DEMAND_POWER;
    demand_apparent_power => table::DEMAND_APPARENT_POWER;
    /// Peak active power demand in W.
    demand_power_peak => table::DEMAND_POWER_PEAK;
    /// Current demand in A.
    demand_current => table::DEMAND_CURRENT;
    demand_current_peak => table::DEMAND_CURRENT_PEAK;
    power_factor => table::POWER_FACTOR;
    /// Frequency in Hz.
    frequency => table::FREQUENCY;
    /// Imported active energy in kWh.
    total_energy => table::TOTAL_ENERGY;
    total_reactive_energy => table::TOTAL_REACTIVE_ENERGY;
    partial_energy => table::PARTIAL_ENERGY;
    partial_reactive_energy => table::PARTIAL_REACTIVE_ENERGY;
    /// Exported active energy in kWh.
    total_exported_energy => table::TOTAL_EXPORTED_ENERGY;
    total_exported_reactive_energy => table::TOTAL_EXPORTED_REACTIVE_ENERGY;
    /// Run hours.
    hour_counter => table::HOUR_COUNTER;
    partial_hour_counter => table::PARTIAL_HOUR_COUNTER;
    /// Hours since the meter was first powered.
    lifetime_counter => table::LIFETIME_COUNTER;
}

macro_rules! integer_settings {
    ($($(#[$doc:meta])* $getter:ident, $setter:ident => $attr:expr;)*) => {
        impl<T: Transport> Em511<T> {
            $(
                $(#[$doc])*
                pub fn $getter(&mut self) -> Result<u16> {
                    self.read_integer($attr)
                }

                pub fn $setter(&mut self, value: u16) -> Result<()> {
                    self.write($attr, value)
                }
            )*
        }
    };
}

integer_settings! {
    password, set_password => table::PASSWORD;
    /// Demand integration time in minutes.
    demand_integration_time, set_demand_integration_time => table::DEMAND_INTEGRATION_TIME;
    /// Alarm delay in seconds.
    alarm_delay, set_alarm_delay => table::ALARM_DELAY;
    /// Reply delay in milliseconds.
    reply_delay, set_reply_delay => table::REPLY_DELAY;
}

macro_rules! enum_settings {
    ($($getter:ident, $setter:ident: $ty:ty => $attr:expr;)*) => {
        impl<T: Transport> Em511<T> {
            $(
                pub fn $getter(&mut self) -> Result<$ty> {
                    self.read_setting($attr)
                }

                pub fn $setter(&mut self, value: $ty) -> Result<()> {
                    self.write($attr, u16::from(value))
                }
            )*
        }
    };
}

enum_settings! {
    measurement_mode, set_measurement_mode: MeasurementMode => table::MEASUREMENT_MODE;
    alarm_mode, set_alarm_mode: AlarmMode => table::ALARM_MODE;
    baud_rate, set_baud_rate: BaudRate => table::BAUD_RATE;
    parity, set_parity: Parity => table::PARITY;
    stop_bits, set_stop_bits: StopBits => table::STOP_BIT;
}

impl<T: Transport> Em511<T> {
    /// Modbus address the meter answers to.
    pub fn device_id(&mut self) -> Result<u16> {
        self.read_integer(table::DEVICE_ID)
    }

    /// Move the meter to another Modbus address.
    ///
    /// This handle keeps addressing the old `device_address`; build a new one
    /// for the new address afterwards.
    pub fn set_device_id(&mut self, value: u16) -> Result<()> {
        self.write(table::DEVICE_ID, value)
    }

    pub fn identification_code(&mut self) -> Result<u16> {
        self.read_integer(table::IDENTIFICATION_CODE)
    }
}
