//! Demo: open a SIM76xx modem, register, open a data session and report telemetry.

use cellmodem::{
	BatteryTelemetry as _, Modem as _, PowerManageable as _, Registrable as _,
	SessionCapable as _, Sim76xx, TemperatureTelemetry as _,
};
use simple_logger::SimpleLogger;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Enable logging
	SimpleLogger::new().init().unwrap();

	// Open the modem and prepare it for use.
	let mut modem = Sim76xx::open_serial("/dev/ttyUSB2")?;
	if !modem.init(None)? {
		return Err("the modem could not be initialized".into());
	}
	println!("{} (SIM {})", modem.modem_name()?, modem.sim_ccid()?);

	// Wait for the modem to register on a network.
	for _ in 0..30 {
		if modem.is_network_connected()? {
			break;
		}
		std::thread::sleep(Duration::from_secs(2));
	}
	println!("registration: {:?}", modem.registration_status()?);

	// Open a data session and report where it landed.
	if modem.connect("internet", None)? {
		println!("address: {:?}", modem.local_ip()?);
		modem.disconnect()?;
	}

	println!(
		"battery: {} mV, temperature: {} C",
		modem.battery_voltage()?,
		modem.temperature()?
	);
	modem.radio_off()?;
	Ok(())
}
