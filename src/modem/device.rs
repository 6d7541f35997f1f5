//! Liveness, initialization and SIM card operations.

use super::{acknowledged, available, SimStatus, VendorQuirks};
use crate::{
	backend::{Backend, UNKNOWN_BACKEND_NAME},
	channel::Channel,
	clock::Clock,
	error::ModemError,
	scanner::Outcome,
};
use std::time::Duration;

/// The pause between SIM status queries.
const SIM_STATUS_PAUSE: Duration = Duration::from_secs(1);

/// Probes, initializes and queries the identity of a modem and its SIM card.
pub struct DeviceSetup<'a, B, C> {
	channel: &'a mut Channel<B, C>,
	quirks: &'a VendorQuirks,
}

impl<B: Backend, C> std::fmt::Debug for DeviceSetup<'_, B, C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DeviceSetup")
			.field("channel", &self.channel)
			.finish_non_exhaustive()
	}
}

impl<'a, B: Backend, C: Clock> DeviceSetup<'a, B, C> {
	/// Borrow `channel` for device operations.
	pub fn new(channel: &'a mut Channel<B, C>, quirks: &'a VendorQuirks) -> Self {
		DeviceSetup { channel, quirks }
	}

	/// Check that the modem answers `AT` within the probe budget.
	pub fn probe(&mut self) -> Result<bool, ModemError> {
		self.channel.probe(self.quirks.timeouts.probe)
	}

	/// Prepare the modem for use.
	///
	/// The modem is probed, command echo is turned off, error reporting is
	/// configured to match the channel, automatic time zone updates are
	/// enabled, and then the SIM card is checked. If the card is not ready and
	/// a non-empty `pin` is given, the card is unlocked and must then become
	/// ready. Otherwise initialization succeeds if the card is ready or locked.
	pub fn init(&mut self, pin: Option<&str>) -> Result<bool, ModemError> {
		let timeouts = self.quirks.timeouts;
		let timeout = self.channel.default_timeout();
		if !self.probe()? {
			return Ok(false);
		}
		if !acknowledged(self.channel.command("E0", timeout))? {
			return Ok(false);
		}
		let level = self.channel.error_reporting().level();
		// Older firmware rejects verbose reporting; carry on regardless.
		acknowledged(self.channel.command(&format!("+CMEE={level}"), timeout))?;

		let name = self.modem_name()?;
		log::info!("{} is a {name}", self.channel_name());

		if !acknowledged(self.channel.command("+CTZR=0", timeouts.phone_functionality))? {
			return Ok(false);
		}
		if !acknowledged(self.channel.command("+CTZU=1", timeouts.phone_functionality))? {
			return Ok(false);
		}

		let status = self.sim_status()?;
		match pin {
			Some(pin) if status != SimStatus::Ready && !pin.is_empty() => {
				self.sim_unlock(pin)?;
				Ok(self.sim_status()? == SimStatus::Ready)
			}
			_ => Ok(matches!(status, SimStatus::Ready | SimStatus::Locked)),
		}
	}

	/// The modem's model name, with underscores replaced by spaces.
	///
	/// The vendor default is returned if the modem does not answer.
	pub fn modem_name(&mut self) -> Result<String, ModemError> {
		let timeout = self.channel.default_timeout();
		let default_name = self.quirks.default_name;
		self.channel.send_command("+CGMM")?;
		if !self.channel.wait_response(timeout)?.is(0) {
			return Ok(default_name.to_string());
		}
		let name = self.channel.payload_text().trim().replace('_', " ");
		if name.is_empty() {
			Ok(default_name.to_string())
		} else {
			Ok(name)
		}
	}

	/// The SIM card's integrated circuit card identifier.
	///
	/// An empty string is returned if it is unavailable.
	pub fn sim_ccid(&mut self) -> Result<String, ModemError> {
		let timeout = self.channel.default_timeout();
		Ok(available(self.channel.query("+CICCID", "+ICCID:", timeout))?.unwrap_or_default())
	}

	/// Poll the SIM card status until the modem answers or the budget elapses.
	pub fn sim_status(&mut self) -> Result<SimStatus, ModemError> {
		let timeout = self.channel.default_timeout();
		let budget = self.quirks.timeouts.sim_status;
		let start = self.channel.clock().now();
		while self.channel.clock().now() - start < budget {
			self.channel.send_command("+CPIN?")?;
			if !self.channel.wait_response_for(timeout, "+CPIN:")?.is(0) {
				self.channel.clock().sleep(SIM_STATUS_PAUSE);
				continue;
			}
			let outcome = self.channel.wait_any(
				timeout,
				&["READY", "SIM PIN", "SIM PUK", "NOT INSERTED", "NOT READY"],
			)?;
			self.channel.wait_response(timeout)?;
			return Ok(match outcome {
				Outcome::Matched(0) => SimStatus::Ready,
				Outcome::Matched(1 | 2) => SimStatus::Locked,
				_ => SimStatus::Error,
			});
		}
		log::warn!("{} SIM card did not answer within {budget:?}", self.channel_name());
		Ok(SimStatus::Error)
	}

	/// Send the PIN to the SIM card.
	pub fn sim_unlock(&mut self, pin: &str) -> Result<bool, ModemError> {
		let timeout = self.channel.default_timeout();
		acknowledged(self.channel.command(&format!("+CPIN=\"{pin}\""), timeout))
	}

	fn channel_name(&self) -> String {
		self.channel
			.name()
			.unwrap_or_else(|| UNKNOWN_BACKEND_NAME.to_string())
	}
}
