//! The SIMCom SIM76xx family of LTE modems.

use super::{
	acknowledged, BatteryStats, BatteryTelemetry, Credentials, DeviceSetup, Modem,
	PowerController, PowerManageable, Registrable, RegistrationMonitor, RegistrationState,
	SessionCapable, SessionController, SimStatus, TelemetryQueries, TemperatureTelemetry,
	VendorQuirks,
};
use crate::{
	backend::{Backend, Serial},
	channel::Channel,
	clock::{Clock, SystemClock},
	error::{ModemError, UnsupportedOperationError},
};
use std::net::Ipv4Addr;

/// A SIMCom SIM7600/SIM7670 series modem.
///
/// The modem owns its [`Channel`]. Operations are grouped into components
/// ([`registration`](Sim76xx::registration), [`session`](Sim76xx::session),
/// [`power`](Sim76xx::power), [`telemetry`](Sim76xx::telemetry) and
/// [`device`](Sim76xx::device)) which are also reachable through the
/// capability traits the modem implements.
///
/// ## Example
///
/// ```rust,no_run
/// # use cellmodem::{Channel, Sim76xx, Modem, Registrable};
/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
/// let mut modem = Sim76xx::new(Channel::open_serial("/dev/ttyUSB2")?);
/// if modem.init(Some("1234"))? && modem.is_network_connected()? {
///     println!("{} is online", modem.modem_name()?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Sim76xx<B, C = SystemClock> {
	channel: Channel<B, C>,
	quirks: VendorQuirks,
}

impl<B: Backend, C> std::fmt::Debug for Sim76xx<B, C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Sim76xx")
			.field("channel", &self.channel)
			.field("quirks", &self.quirks)
			.finish()
	}
}

impl Sim76xx<Serial> {
	/// Open the modem attached to the serial port at `path` with the default options.
	pub fn open_serial(path: &str) -> Result<Self, ModemError> {
		Ok(Sim76xx::new(Channel::open_serial(path)?))
	}
}

impl<B: Backend, C: Clock> Sim76xx<B, C> {
	/// Drive the modem on the other end of `channel`.
	pub fn new(channel: Channel<B, C>) -> Self {
		Sim76xx::with_quirks(channel, VendorQuirks::SIM76XX)
	}

	/// Drive the modem on the other end of `channel` with customized quirks,
	/// such as longer timeouts.
	pub fn with_quirks(channel: Channel<B, C>, quirks: VendorQuirks) -> Self {
		Sim76xx { channel, quirks }
	}

	/// The quirks in use.
	pub fn quirks(&self) -> &VendorQuirks {
		&self.quirks
	}

	/// Get a reference to the underlying channel.
	pub fn channel(&self) -> &Channel<B, C> {
		&self.channel
	}

	/// Get a mutable reference to the underlying channel, for commands this
	/// type does not cover.
	pub fn channel_mut(&mut self) -> &mut Channel<B, C> {
		&mut self.channel
	}

	/// Consume the modem and return the underlying channel.
	pub fn into_channel(self) -> Channel<B, C> {
		self.channel
	}

	/// Probing, initialization and SIM card operations.
	pub fn device(&mut self) -> DeviceSetup<'_, B, C> {
		DeviceSetup::new(&mut self.channel, &self.quirks)
	}

	/// Network registration and network mode operations.
	pub fn registration(&mut self) -> RegistrationMonitor<'_, B, C> {
		RegistrationMonitor::new(&mut self.channel, &self.quirks)
	}

	/// Packet data session operations.
	pub fn session(&mut self) -> SessionController<'_, B, C> {
		SessionController::new(&mut self.channel, &self.quirks)
	}

	/// Power state operations.
	pub fn power(&mut self) -> PowerController<'_, B, C> {
		PowerController::new(&mut self.channel, &self.quirks)
	}

	/// Sensor readings.
	pub fn telemetry(&mut self) -> TelemetryQueries<'_, B, C> {
		TelemetryQueries::new(&mut self.channel)
	}

	/// Hang up any active voice call.
	pub fn hang_up(&mut self) -> Result<bool, ModemError> {
		let timeout = self.channel.default_timeout();
		acknowledged(self.channel.command("+CHUP", timeout))
	}
}

impl<B: Backend, C: Clock> Modem for Sim76xx<B, C> {
	fn probe(&mut self) -> Result<bool, ModemError> {
		self.device().probe()
	}
	fn init(&mut self, pin: Option<&str>) -> Result<bool, ModemError> {
		self.device().init(pin)
	}
	fn modem_name(&mut self) -> Result<String, ModemError> {
		self.device().modem_name()
	}
	fn sim_ccid(&mut self) -> Result<String, ModemError> {
		self.device().sim_ccid()
	}
	fn sim_status(&mut self) -> Result<SimStatus, ModemError> {
		self.device().sim_status()
	}
	fn sim_unlock(&mut self, pin: &str) -> Result<bool, ModemError> {
		self.device().sim_unlock(pin)
	}
	fn factory_default(&mut self) -> Result<bool, ModemError> {
		Err(UnsupportedOperationError::new("factory default").into())
	}
}

impl<B: Backend, C: Clock> Registrable for Sim76xx<B, C> {
	fn registration_status(&mut self) -> Result<RegistrationState, ModemError> {
		self.registration().status()
	}
}

impl<B: Backend, C: Clock> SessionCapable for Sim76xx<B, C> {
	fn connect(&mut self, apn: &str, credentials: Option<Credentials<'_>>) -> Result<bool, ModemError> {
		self.session().connect(apn, credentials)
	}
	fn disconnect(&mut self) -> Result<bool, ModemError> {
		self.session().disconnect()
	}
	fn is_connected(&mut self) -> Result<bool, ModemError> {
		self.session().is_connected()
	}
	fn local_ip(&mut self) -> Result<Option<Ipv4Addr>, ModemError> {
		self.session().local_ip()
	}
}

impl<B: Backend, C: Clock> PowerManageable for Sim76xx<B, C> {
	fn restart(&mut self, pin: Option<&str>) -> Result<bool, ModemError> {
		self.power().restart(pin)
	}
	fn power_off(&mut self) -> Result<bool, ModemError> {
		self.power().power_off()
	}
	fn radio_off(&mut self) -> Result<bool, ModemError> {
		self.power().radio_off()
	}
	fn sleep_enable(&mut self, enable: bool) -> Result<bool, ModemError> {
		self.power().sleep_enable(enable)
	}
	fn set_phone_functionality(&mut self, level: u8, reset: bool) -> Result<bool, ModemError> {
		self.power().set_phone_functionality(level, reset)
	}
}

impl<B: Backend, C: Clock> BatteryTelemetry for Sim76xx<B, C> {
	fn battery_voltage(&mut self) -> Result<u16, ModemError> {
		self.telemetry().battery_voltage()
	}
	fn battery_percent(&mut self) -> Result<u8, ModemError> {
		Err(UnsupportedOperationError::new("battery percent").into())
	}
	fn battery_charge_state(&mut self) -> Result<u8, ModemError> {
		Err(UnsupportedOperationError::new("battery charge state").into())
	}
	fn battery_stats(&mut self) -> Result<BatteryStats, ModemError> {
		self.telemetry().battery_stats()
	}
}

impl<B: Backend, C: Clock> TemperatureTelemetry for Sim76xx<B, C> {
	fn temperature(&mut self) -> Result<i16, ModemError> {
		self.telemetry().temperature()
	}
}

#[cfg(test)]
mod test;
