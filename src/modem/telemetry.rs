//! Battery and temperature readings.

use super::{available, field, BatteryStats};
use crate::{backend::Backend, channel::Channel, clock::Clock, error::ModemError};

/// Reads the modem's sensors.
///
/// Every reading is a query, a tagged reply line and a final `OK`. A reading
/// of `0` means the value is unavailable, because the modem did not answer,
/// rejected the query, or replied with something that is not a number.
pub struct TelemetryQueries<'a, B, C> {
	channel: &'a mut Channel<B, C>,
}

impl<B: Backend, C> std::fmt::Debug for TelemetryQueries<'_, B, C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TelemetryQueries")
			.field("channel", &self.channel)
			.finish_non_exhaustive()
	}
}

impl<'a, B: Backend, C: Clock> TelemetryQueries<'a, B, C> {
	/// Borrow `channel` for sensor readings.
	pub fn new(channel: &'a mut Channel<B, C>) -> Self {
		TelemetryQueries { channel }
	}

	/// The battery voltage in millivolts.
	///
	/// The modem reports volts (e.g. `+CBC: 4.05V`).
	pub fn battery_voltage(&mut self) -> Result<u16, ModemError> {
		let timeout = self.channel.default_timeout();
		let volts = available(self.channel.query("+CBC", "+CBC:", timeout))?
			.as_deref()
			.and_then(field::leading_float);
		Ok(volts.map_or(0, to_millivolts))
	}

	/// The battery readings this modem supports: only the voltage is reported.
	pub fn battery_stats(&mut self) -> Result<BatteryStats, ModemError> {
		Ok(BatteryStats {
			charge_state: 0,
			percent: 0,
			millivolts: self.battery_voltage()?,
		})
	}

	/// The temperature of the modem's power management unit in degrees Celsius.
	pub fn temperature(&mut self) -> Result<i16, ModemError> {
		let timeout = self.channel.default_timeout();
		let degrees = available(self.channel.query("+CPMUTEMP", "+CPMUTEMP:", timeout))?
			.as_deref()
			.and_then(field::leading_int)
			.and_then(|degrees| i16::try_from(degrees).ok());
		Ok(degrees.unwrap_or(0))
	}
}

/// Convert volts to whole millivolts, saturating at the bounds of `u16`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_millivolts(volts: f32) -> u16 {
	(volts * 1000.0).round().clamp(0.0, f32::from(u16::MAX)) as u16
}

#[cfg(test)]
mod test {
	use super::*;
	use std::time::Duration;

	#[test]
	fn battery_voltage_in_millivolts() {
		let mut channel = Channel::open_mock();
		channel.backend_mut().append_data(b"+CBC: 4.05\r\nOK\r\n");
		channel.backend_mut().append_data(b"\r\n+CBC: 3.712V\r\n\r\nOK\r\n");
		let mut telemetry = TelemetryQueries::new(&mut channel);
		assert_eq!(telemetry.battery_voltage().unwrap(), 4050);
		assert_eq!(telemetry.battery_voltage().unwrap(), 3712);
		assert_eq!(channel.backend().written_lines(), vec!["AT+CBC", "AT+CBC"]);
	}

	#[test]
	fn unavailable_readings_are_zero() {
		let mut channel = Channel::open_mock();
		// No reply at all.
		let mut telemetry = TelemetryQueries::new(&mut channel);
		assert_eq!(telemetry.battery_voltage().unwrap(), 0);
		assert_eq!(telemetry.temperature().unwrap(), 0);

		// Rejected.
		channel.backend_mut().append_data(b"\r\nERROR\r\n");
		let mut telemetry = TelemetryQueries::new(&mut channel);
		assert_eq!(telemetry.temperature().unwrap(), 0);

		// Not a number.
		channel.backend_mut().append_data(b"\r\n+CBC: n/a\r\n\r\nOK\r\n");
		let mut telemetry = TelemetryQueries::new(&mut channel);
		assert_eq!(telemetry.battery_voltage().unwrap(), 0);

		// The reading is discarded unless the final acknowledgement is OK.
		channel.backend_mut().append_data(b"\r\n+CBC: 4.05V\r\n\r\nERROR\r\n");
		let mut telemetry = TelemetryQueries::new(&mut channel);
		assert_eq!(telemetry.battery_voltage().unwrap(), 0);
	}

	#[test]
	fn transport_errors_are_not_collapsed() {
		let mut channel = Channel::open_mock();
		channel
			.backend_mut()
			.read_error(Some(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged")));
		let mut telemetry = TelemetryQueries::new(&mut channel);
		assert!(telemetry.battery_voltage().unwrap_err().is_io());
	}

	#[test]
	fn temperature() {
		let mut channel = Channel::open_mock();
		channel.backend_mut().append_data(b"\r\n+CPMUTEMP: 38\r\n\r\nOK\r\n");
		channel.backend_mut().append_data(b"\r\n+CPMUTEMP: -5\r\n\r\nOK\r\n");
		let mut telemetry = TelemetryQueries::new(&mut channel);
		assert_eq!(telemetry.temperature().unwrap(), 38);
		assert_eq!(telemetry.temperature().unwrap(), -5);
		assert_eq!(channel.clock().elapsed(), Duration::ZERO);
	}

	#[test]
	fn battery_stats_only_has_the_voltage() {
		let mut channel = Channel::open_mock();
		channel.backend_mut().append_data(b"\r\n+CBC: 3.9V\r\n\r\nOK\r\n");
		let mut telemetry = TelemetryQueries::new(&mut channel);
		assert_eq!(
			telemetry.battery_stats().unwrap(),
			BatteryStats {
				charge_state: 0,
				percent: 0,
				millivolts: 3900,
			}
		);
	}

	#[test]
	fn millivolt_conversion_saturates() {
		assert_eq!(to_millivolts(-1.0), 0);
		assert_eq!(to_millivolts(100.0), u16::MAX);
		assert_eq!(to_millivolts(4.2), 4200);
	}
}
