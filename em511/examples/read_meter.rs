/// Read measurements from an EM511 on a serial line
use em511::{codec::WordOrder, Config, Em511};
use tokio_modbus::{client::sync::rtu::connect_slave, Slave};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_owned());
    let device_address = 1;
    let builder = tokio_serial::new(path, 9600);
    let mut ctx = connect_slave(&builder, Slave(device_address))?;
    ctx.set_timeout(Some(std::time::Duration::from_secs(1)));

    // The meter sends the least significant register first.
    let config = Config::default().with_word_order(WordOrder::LittleEndian);
    let mut meter = Em511::with_config(device_address, &mut ctx, config)?;
    println!("identification: {}", meter.identification()?);

    loop {
        println!(
            "{} V, {} A, {} W, {} Hz, {} kWh",
            meter.voltage()?,
            meter.current()?,
            meter.active_power()?,
            meter.frequency()?,
            meter.total_energy()?,
        );
        std::thread::sleep(std::time::Duration::from_millis(500));
    }
}
