/// Serve a simulated EM511 over Modbus TCP and read it back with a blocking client
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use em511::{
    simulator::{spawn_tcp_simulator, Em511Device, Simulator},
    table, Em511,
};
use tokio_modbus::{client::sync::tcp::connect_slave, Slave};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 5502);

    let mut device = Em511Device::default();
    device.set(table::VOLTAGE, "230.1".parse::<em511::Decimal>()?)?;
    device.set(table::CURRENT, "1.204".parse::<em511::Decimal>()?)?;
    device.set(table::FREQUENCY, "50.0".parse::<em511::Decimal>()?)?;
    let simulator = Simulator::new(device);

    let runtime = tokio::runtime::Runtime::new()?;
    std::thread::spawn(move || {
        runtime.block_on(async move {
            let _ = spawn_tcp_simulator(socket_addr, simulator).await;
        })
    });
    std::thread::sleep(std::time::Duration::from_millis(200));

    let mut ctx = connect_slave(socket_addr, Slave(1))?;
    let mut meter = Em511::new(1, &mut ctx)?;

    println!("identification: {}", meter.identification()?);
    println!("{} V, {} A, {} Hz", meter.voltage()?, meter.current()?, meter.frequency()?);

    meter.unlock(0)?;
    meter.set_demand_integration_time(5)?;
    println!("demand integration time: {} min", meter.demand_integration_time()?);
    meter.reset_partial()?;

    Ok(())
}
