//! Network registration and network mode selection.

use super::{acknowledged, available, field, RegistrationState, VendorQuirks};
use crate::{
	backend::Backend,
	channel::{Channel, ERROR},
	clock::Clock,
	error::ModemError,
	scanner::Outcome,
};

/// Queries the modem's network registration.
///
/// No state is kept between queries: every call asks the modem again, and a
/// single answer is authoritative for that instant. Callers that need to wait
/// for registration poll on their own schedule.
pub struct RegistrationMonitor<'a, B, C> {
	channel: &'a mut Channel<B, C>,
	quirks: &'a VendorQuirks,
}

impl<B: Backend, C> std::fmt::Debug for RegistrationMonitor<'_, B, C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RegistrationMonitor")
			.field("channel", &self.channel)
			.field("command", &self.quirks.registration_command)
			.finish_non_exhaustive()
	}
}

impl<'a, B: Backend, C: Clock> RegistrationMonitor<'a, B, C> {
	/// Borrow `channel` for registration queries.
	pub fn new(channel: &'a mut Channel<B, C>, quirks: &'a VendorQuirks) -> Self {
		RegistrationMonitor { channel, quirks }
	}

	/// Query the current registration state.
	///
	/// The reply to any of the `+CREG`, `+CGREG` and `+CEREG` queries is
	/// accepted. [`NoResult`](RegistrationState::NoResult) is returned if the
	/// modem does not answer, and [`Unknown`](RegistrationState::Unknown) if
	/// the status code cannot be read.
	pub fn status(&mut self) -> Result<RegistrationState, ModemError> {
		let timeout = self.channel.default_timeout();
		self.channel
			.send_command(&format!("+{}?", self.quirks.registration_command))?;
		let outcome = self
			.channel
			.wait_any(timeout, &["+CREG:", "+CGREG:", "+CEREG:", ERROR])?;
		if !matches!(outcome, Outcome::Matched(0..=2)) {
			return Ok(RegistrationState::NoResult);
		}
		// The reply is "<mode>,<status>[,...]".
		let code = self
			.channel
			.read_field(timeout)?
			.as_deref()
			.and_then(field::after_comma)
			.and_then(field::leading_int);
		self.channel.wait_response_default()?;

		let state = code.map_or(RegistrationState::Unknown, RegistrationState::from_code);
		log::debug!("registration status {code:?} => {state:?}");
		Ok(state)
	}

	/// Whether the modem is registered on its home network or roaming.
	pub fn is_connected(&mut self) -> Result<bool, ModemError> {
		Ok(self.status()?.is_connected())
	}

	/// The network modes the modem supports, as the raw list it reports.
	///
	/// An empty string is returned if it is unavailable.
	pub fn network_modes(&mut self) -> Result<String, ModemError> {
		let timeout = self.channel.default_timeout();
		Ok(available(self.channel.query("+CNMP=?", "+CNMP:", timeout))?.unwrap_or_default())
	}

	/// The preferred network mode, or `0` if it is unavailable.
	pub fn network_mode(&mut self) -> Result<i16, ModemError> {
		let timeout = self.channel.default_timeout();
		let mode = available(self.channel.query("+CNMP?", "+CNMP:", timeout))?
			.as_deref()
			.and_then(field::leading_int)
			.and_then(|mode| i16::try_from(mode).ok());
		Ok(mode.unwrap_or(0))
	}

	/// Set the preferred network mode, e.g. `2` for automatic, `13` for GSM
	/// only or `38` for LTE only.
	pub fn set_network_mode(&mut self, mode: u8) -> Result<bool, ModemError> {
		let timeout = self.channel.default_timeout();
		acknowledged(self.channel.command(&format!("+CNMP={mode}"), timeout))
	}
}
