//! Modem-level operations built on top of a [`Channel`].
//!
//! Each group of related operations is a small component that borrows the
//! channel exclusively for the duration of one operation:
//!
//! * [`DeviceSetup`]: liveness probe, initialization and SIM card queries.
//! * [`RegistrationMonitor`]: network registration and network mode.
//! * [`SessionController`]: the packet data (GPRS) session.
//! * [`PowerController`]: restart, power off, sleep and radio state.
//! * [`TelemetryQueries`]: battery voltage and temperature.
//!
//! A concrete modem, such as the [`Sim76xx`], owns the channel and exposes the
//! components through the capability traits defined here ([`Modem`],
//! [`Registrable`], [`SessionCapable`], [`PowerManageable`],
//! [`BatteryTelemetry`] and [`TemperatureTelemetry`]).
//!
//! Operations collapse the outcome of an exchange the same way throughout:
//! a modem that does not answer in time, or answers with an error terminator,
//! produces `false` or a documented "unavailable" value. Only failures of the
//! transport itself are returned as errors.

mod device;
mod field;
mod power;
mod registration;
mod session;
mod sim76xx;
mod telemetry;

use crate::error::ModemError;
pub use device::*;
pub use power::*;
pub use registration::*;
pub use session::*;
pub use sim76xx::*;
pub use telemetry::*;
use std::{net::Ipv4Addr, time::Duration};

/// The timeout classes used by long-running modem operations.
///
/// Simple acknowledgement commands and queries use the channel's
/// [`default_timeout`](crate::Channel::default_timeout) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeouts {
	/// The total budget for the liveness probe.
	pub probe: Duration,
	/// The total budget for polling the SIM card status.
	pub sim_status: Duration,
	/// Waiting for the boot-completion banner after a reset.
	pub boot: Duration,
	/// Changing the phone functionality (`AT+CFUN`) and time zone settings.
	pub phone_functionality: Duration,
	/// Activating a packet data context.
	pub pdp_activate: Duration,
	/// Deactivating a packet data context.
	pub pdp_deactivate: Duration,
	/// The pause after the radio has been switched off.
	pub radio_settle: Duration,
}

impl Timeouts {
	/// The timeouts used by the SIMCom SIM76xx family.
	pub const SIM76XX: Timeouts = Timeouts {
		probe: Duration::from_secs(10),
		sim_status: Duration::from_secs(10),
		boot: Duration::from_secs(40),
		phone_functionality: Duration::from_secs(10),
		pdp_activate: Duration::from_secs(60),
		pdp_deactivate: Duration::from_secs(40),
		radio_settle: Duration::from_secs(3),
	};
}

impl Default for Timeouts {
	fn default() -> Self {
		Timeouts::SIM76XX
	}
}

/// The details that differ between modem variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VendorQuirks {
	/// The registration query command, without the `+` and `?`, e.g. `CGREG`.
	pub registration_command: &'static str,
	/// The line the modem prints once it has finished booting.
	pub boot_banner: &'static str,
	/// The model name reported when the modem does not provide one.
	pub default_name: &'static str,
	/// The timeout classes.
	pub timeouts: Timeouts,
}

impl VendorQuirks {
	/// The quirks of the SIMCom SIM76xx family.
	pub const SIM76XX: VendorQuirks = VendorQuirks {
		registration_command: "CGREG",
		boot_banner: "\r\nPB DONE",
		default_name: "SIMCom SIM76xx",
		timeouts: Timeouts::SIM76XX,
	};
}

impl Default for VendorQuirks {
	fn default() -> Self {
		VendorQuirks::SIM76XX
	}
}

/// The network registration state reported by the modem.
///
/// The state is read fresh on every query and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationState {
	/// The modem did not report a registration state.
	NoResult,
	/// Not registered and not searching for an operator.
	Unregistered,
	/// Not registered, but searching for an operator.
	Searching,
	/// Registration was denied.
	Denied,
	/// Registered on the home network.
	RegisteredHome,
	/// Registered on a roaming network.
	RegisteredRoaming,
	/// The modem reported an unknown or unexpected state.
	Unknown,
}

impl RegistrationState {
	/// Map a numeric registration status code to a state.
	///
	/// `-1` is used for "no result". Codes outside the standard table map to
	/// [`Unknown`](RegistrationState::Unknown).
	pub const fn from_code(code: i32) -> Self {
		match code {
			-1 => RegistrationState::NoResult,
			0 => RegistrationState::Unregistered,
			1 => RegistrationState::RegisteredHome,
			2 => RegistrationState::Searching,
			3 => RegistrationState::Denied,
			5 => RegistrationState::RegisteredRoaming,
			_ => RegistrationState::Unknown,
		}
	}

	/// Whether the modem is registered, on either the home or a roaming network.
	pub const fn is_connected(self) -> bool {
		matches!(
			self,
			RegistrationState::RegisteredHome | RegistrationState::RegisteredRoaming
		)
	}
}

/// The state of the SIM card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimStatus {
	/// The SIM card is missing, not ready, or did not answer.
	Error,
	/// The SIM card is ready for use.
	Ready,
	/// The SIM card requires a PIN or PUK.
	Locked,
}

/// A battery reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BatteryStats {
	/// The charge state, or 0 if unavailable.
	pub charge_state: u8,
	/// The charge level in percent, or 0 if unavailable.
	pub percent: u8,
	/// The voltage in millivolts, or 0 if unavailable.
	pub millivolts: u16,
}

/// Basic device operations.
pub trait Modem {
	/// Check that the modem answers `AT`.
	fn probe(&mut self) -> Result<bool, ModemError>;

	/// Configure the modem for use, unlocking the SIM card with `pin` if necessary.
	fn init(&mut self, pin: Option<&str>) -> Result<bool, ModemError>;

	/// The modem's model name.
	fn modem_name(&mut self) -> Result<String, ModemError>;

	/// The SIM card's integrated circuit card identifier, or an empty string
	/// if unavailable.
	fn sim_ccid(&mut self) -> Result<String, ModemError>;

	/// The state of the SIM card.
	fn sim_status(&mut self) -> Result<SimStatus, ModemError>;

	/// Unlock the SIM card.
	fn sim_unlock(&mut self, pin: &str) -> Result<bool, ModemError>;

	/// Restore the modem's factory settings.
	fn factory_default(&mut self) -> Result<bool, ModemError>;
}

/// Network registration.
pub trait Registrable {
	/// Query the current registration state.
	fn registration_status(&mut self) -> Result<RegistrationState, ModemError>;

	/// Whether the modem is currently registered on a network.
	fn is_network_connected(&mut self) -> Result<bool, ModemError> {
		Ok(self.registration_status()?.is_connected())
	}
}

/// Credentials for a packet data session.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Credentials<'a> {
	/// The user name.
	pub user: &'a str,
	/// The password.
	pub password: &'a str,
}

impl std::fmt::Debug for Credentials<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Credentials")
			.field("user", &self.user)
			.finish_non_exhaustive()
	}
}

/// Packet data (GPRS) sessions.
pub trait SessionCapable {
	/// Open a session on the access point `apn`.
	fn connect(&mut self, apn: &str, credentials: Option<Credentials<'_>>) -> Result<bool, ModemError>;

	/// Close the session.
	fn disconnect(&mut self) -> Result<bool, ModemError>;

	/// Whether a session is open.
	fn is_connected(&mut self) -> Result<bool, ModemError>;

	/// The address assigned to the session, if any.
	fn local_ip(&mut self) -> Result<Option<Ipv4Addr>, ModemError>;
}

/// Power management.
pub trait PowerManageable {
	/// Reset the modem and initialize it again.
	fn restart(&mut self, pin: Option<&str>) -> Result<bool, ModemError>;

	/// Switch the modem off.
	fn power_off(&mut self) -> Result<bool, ModemError>;

	/// Switch the radio off.
	fn radio_off(&mut self) -> Result<bool, ModemError>;

	/// Allow or forbid the modem from entering sleep mode.
	fn sleep_enable(&mut self, enable: bool) -> Result<bool, ModemError>;

	/// Set the phone functionality level, optionally resetting the modem.
	fn set_phone_functionality(&mut self, level: u8, reset: bool) -> Result<bool, ModemError>;
}

/// Battery readings.
///
/// Readings of `0` mean "unavailable".
pub trait BatteryTelemetry {
	/// The battery voltage in millivolts.
	fn battery_voltage(&mut self) -> Result<u16, ModemError>;

	/// The battery charge level in percent.
	fn battery_percent(&mut self) -> Result<u8, ModemError>;

	/// The battery charge state.
	fn battery_charge_state(&mut self) -> Result<u8, ModemError>;

	/// All battery readings.
	fn battery_stats(&mut self) -> Result<BatteryStats, ModemError>;
}

/// Temperature readings.
pub trait TemperatureTelemetry {
	/// The modem's temperature in degrees Celsius, or `0` if unavailable.
	fn temperature(&mut self) -> Result<i16, ModemError>;
}

/// Collapse the result of an exchange into whether the modem acknowledged it.
///
/// Timeouts and explicit failures become `false`. Transport errors are kept.
pub(crate) fn acknowledged(result: Result<(), ModemError>) -> Result<bool, ModemError> {
	available(result).map(|value| value.is_some())
}

/// Collapse the result of an exchange into an optional value.
///
/// Timeouts and explicit failures become `None`. Transport errors are kept.
pub(crate) fn available<T>(result: Result<T, ModemError>) -> Result<Option<T>, ModemError> {
	match result {
		Ok(value) => Ok(Some(value)),
		Err(e @ (ModemError::Timeout(_) | ModemError::CommandFailure(_))) => {
			log::debug!("exchange failed: {e}");
			Ok(None)
		}
		Err(e) => Err(e),
	}
}
