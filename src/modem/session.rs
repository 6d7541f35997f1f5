//! The packet data (GPRS) session.

use super::{acknowledged, available, field, Credentials, RegistrationMonitor, VendorQuirks};
use crate::{backend::Backend, channel::Channel, clock::Clock, error::ModemError};
use std::net::Ipv4Addr;

/// The packet data context used for sessions.
const CONTEXT_ID: u8 = 1;

/// Opens, closes and checks the packet data session.
///
/// Each operation is a short script that stops at the first step the modem
/// does not acknowledge. Steps that already succeeded are not rolled back;
/// calling [`connect`](SessionController::connect) again is the way to
/// recover.
pub struct SessionController<'a, B, C> {
	channel: &'a mut Channel<B, C>,
	quirks: &'a VendorQuirks,
}

impl<B: Backend, C> std::fmt::Debug for SessionController<'_, B, C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionController")
			.field("channel", &self.channel)
			.finish_non_exhaustive()
	}
}

impl<'a, B: Backend, C: Clock> SessionController<'a, B, C> {
	/// Borrow `channel` for session operations.
	pub fn new(channel: &'a mut Channel<B, C>, quirks: &'a VendorQuirks) -> Self {
		SessionController { channel, quirks }
	}

	/// Open a session on the access point `apn`.
	///
	/// Credentials, if any, are only sent when the password is not empty.
	pub fn connect(
		&mut self,
		apn: &str,
		credentials: Option<Credentials<'_>>,
	) -> Result<bool, ModemError> {
		let timeouts = self.quirks.timeouts;
		let timeout = self.channel.default_timeout();
		if let Some(Credentials { user, password }) = credentials.filter(|c| !c.password.is_empty()) {
			let command = format!("+CGAUTH={CONTEXT_ID},0,\"{user}\",\"{password}\"");
			if !acknowledged(self.channel.command(&command, timeout))? {
				return Ok(false);
			}
		}
		let command = format!("+CGDCONT={CONTEXT_ID},\"IP\",\"{apn}\"");
		if !acknowledged(self.channel.command(&command, timeout))? {
			return Ok(false);
		}
		let command = format!("+CGACT=1,{CONTEXT_ID}");
		acknowledged(self.channel.command(&command, timeouts.pdp_activate))
	}

	/// Close the session.
	pub fn disconnect(&mut self) -> Result<bool, ModemError> {
		let timeout = self.quirks.timeouts.pdp_deactivate;
		acknowledged(
			self.channel
				.command(&format!("+CGACT=0,{CONTEXT_ID}"), timeout),
		)
	}

	/// Whether the modem is registered and attached to the packet domain.
	pub fn is_connected(&mut self) -> Result<bool, ModemError> {
		if !RegistrationMonitor::new(self.channel, self.quirks).is_connected()? {
			return Ok(false);
		}
		let timeout = self.channel.default_timeout();
		let attached = available(self.channel.query("+CGATT?", "+CGATT:", timeout))?
			.as_deref()
			.and_then(field::leading_int);
		Ok(attached == Some(1))
	}

	/// The IPv4 address assigned to the session's context.
	///
	/// `None` is returned if no address is assigned or it cannot be read.
	pub fn local_ip(&mut self) -> Result<Option<Ipv4Addr>, ModemError> {
		let timeout = self.channel.default_timeout();
		let reply = available(self.channel.query(
			&format!("+CGPADDR={CONTEXT_ID}"),
			"+CGPADDR:",
			timeout,
		))?;
		// The reply is "<cid>,<address>", with the address optionally quoted.
		Ok(reply
			.as_deref()
			.and_then(field::after_comma)
			.and_then(|address| address.trim().trim_matches('"').parse().ok()))
	}
}
