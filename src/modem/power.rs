//! Restart, power off, sleep and radio state.

use super::{acknowledged, DeviceSetup, VendorQuirks};
use crate::{backend::Backend, channel::Channel, clock::Clock, error::ModemError};

/// The phone functionality level that switches the radio off.
pub const RADIO_OFF_FUNCTIONALITY: u8 = 4;

/// Changes the modem's power state.
///
/// The modem's actual state is not tracked: it is assumed to match the last
/// command it acknowledged.
pub struct PowerController<'a, B, C> {
	channel: &'a mut Channel<B, C>,
	quirks: &'a VendorQuirks,
}

impl<B: Backend, C> std::fmt::Debug for PowerController<'_, B, C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PowerController")
			.field("channel", &self.channel)
			.finish_non_exhaustive()
	}
}

impl<'a, B: Backend, C: Clock> PowerController<'a, B, C> {
	/// Borrow `channel` for power operations.
	pub fn new(channel: &'a mut Channel<B, C>, quirks: &'a VendorQuirks) -> Self {
		PowerController { channel, quirks }
	}

	/// Reset the modem, wait for it to boot and then initialize it again.
	///
	/// The modem must answer the liveness probe before it is reset. Booting
	/// can take tens of seconds, during which the modem prints a line for each
	/// subsystem it starts; the reset is complete once the boot banner
	/// appears. Any failing stage ends the restart.
	pub fn restart(&mut self, pin: Option<&str>) -> Result<bool, ModemError> {
		let quirks = self.quirks;
		if !DeviceSetup::new(self.channel, quirks).probe()? {
			return Ok(false);
		}
		self.channel.send_command("+CRESET")?;
		if !self
			.channel
			.wait_response_for(quirks.timeouts.boot, quirks.boot_banner)?
			.is(0)
		{
			log::warn!("no boot banner within {:?} of reset", quirks.timeouts.boot);
			return Ok(false);
		}
		DeviceSetup::new(self.channel, quirks).init(pin)
	}

	/// Switch the modem off.
	pub fn power_off(&mut self) -> Result<bool, ModemError> {
		let timeout = self.channel.default_timeout();
		acknowledged(self.channel.command("+CPOF", timeout))
	}

	/// Switch the radio off.
	///
	/// The modem acknowledges the command before the radio has finished
	/// shutting down, so this waits for the radio to settle afterwards.
	pub fn radio_off(&mut self) -> Result<bool, ModemError> {
		if !self.set_phone_functionality(RADIO_OFF_FUNCTIONALITY, false)? {
			return Ok(false);
		}
		self.channel.clock().sleep(self.quirks.timeouts.radio_settle);
		Ok(true)
	}

	/// Allow (`true`) or forbid (`false`) the modem from entering sleep mode.
	pub fn sleep_enable(&mut self, enable: bool) -> Result<bool, ModemError> {
		let timeout = self.channel.default_timeout();
		let command = format!("+CSCLK={}", u8::from(enable));
		acknowledged(self.channel.command(&command, timeout))
	}

	/// Set the phone functionality level (`AT+CFUN`), optionally resetting the
	/// modem before the change takes effect.
	pub fn set_phone_functionality(&mut self, level: u8, reset: bool) -> Result<bool, ModemError> {
		let command = format!("+CFUN={level}{}", if reset { ",1" } else { "" });
		acknowledged(
			self.channel
				.command(&command, self.quirks.timeouts.phone_functionality),
		)
	}
}
