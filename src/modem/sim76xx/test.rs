use super::*;
use crate::{backend::Mock, channel::ErrorReporting, clock::MockClock, error::ModemError};
use static_assertions::assert_obj_safe;
use std::time::Duration;

assert_obj_safe!(Modem, Registrable, SessionCapable, PowerManageable, BatteryTelemetry, TemperatureTelemetry);

fn open_mock() -> Sim76xx<Mock, MockClock> {
	Sim76xx::new(Channel::open_mock())
}

impl Sim76xx<Mock, MockClock> {
	fn reply(&mut self, bytes: &[u8]) -> &mut Self {
		self.channel.backend_mut().append_data(bytes);
		self
	}

	fn written_lines(&self) -> Vec<String> {
		self.channel.backend().written_lines()
	}

	/// Queue the replies to initialization up to the SIM card status query.
	fn reply_to_init_setup(&mut self) -> &mut Self {
		self.reply(b"\r\nOK\r\n") // AT
			.reply(b"\r\nOK\r\n") // ATE0
			.reply(b"\r\nOK\r\n") // AT+CMEE
			.reply(b"\r\nSIMCOM_SIM7600E-H\r\n\r\nOK\r\n")
			.reply(b"\r\nOK\r\n") // AT+CTZR
			.reply(b"\r\nOK\r\n") // AT+CTZU
	}
}

const INIT_SETUP_LINES: [&str; 6] = ["AT", "ATE0", "AT+CMEE=0", "AT+CGMM", "AT+CTZR=0", "AT+CTZU=1"];

#[test]
fn init_with_a_ready_sim() {
	let mut modem = open_mock();
	modem
		.reply_to_init_setup()
		.reply(b"\r\n+CPIN: READY\r\n\r\nOK\r\n");
	assert!(modem.init(None).unwrap());
	let mut expected = INIT_SETUP_LINES.to_vec();
	expected.push("AT+CPIN?");
	assert_eq!(modem.written_lines(), expected);
}

#[test]
fn init_unlocks_the_sim() {
	let mut modem = open_mock();
	modem
		.reply_to_init_setup()
		.reply(b"\r\n+CPIN: SIM PIN\r\n\r\nOK\r\n")
		.reply(b"\r\nOK\r\n")
		.reply(b"\r\n+CPIN: READY\r\n\r\nOK\r\n");
	assert!(modem.init(Some("1234")).unwrap());
	let lines = modem.written_lines();
	assert_eq!(&lines[6..], ["AT+CPIN?", "AT+CPIN=\"1234\"", "AT+CPIN?"]);
}

#[test]
fn init_fails_if_the_pin_is_wrong() {
	let mut modem = open_mock();
	modem
		.reply_to_init_setup()
		.reply(b"\r\n+CPIN: SIM PIN\r\n\r\nOK\r\n")
		.reply(b"\r\nERROR\r\n")
		.reply(b"\r\n+CPIN: SIM PIN\r\n\r\nOK\r\n");
	assert!(!modem.init(Some("0000")).unwrap());
}

#[test]
fn init_accepts_a_locked_sim_without_a_pin() {
	let mut modem = open_mock();
	modem
		.reply_to_init_setup()
		.reply(b"\r\n+CPIN: SIM PUK\r\n\r\nOK\r\n");
	assert!(modem.init(None).unwrap());

	// An empty PIN is the same as no PIN.
	modem
		.reply_to_init_setup()
		.reply(b"\r\n+CPIN: SIM PIN\r\n\r\nOK\r\n");
	assert!(modem.init(Some("")).unwrap());
	assert!(!modem.written_lines().iter().any(|line| line.starts_with("AT+CPIN=")));
}

#[test]
fn init_without_a_sim() {
	let mut modem = open_mock();
	modem.reply_to_init_setup().reply(b"\r\nERROR\r\n");
	let start = modem.channel().clock().now();
	assert!(!modem.init(None).unwrap());
	assert!(modem.channel().clock().now() - start >= Duration::from_secs(10));
	assert!(modem
		.written_lines()
		.iter()
		.skip(INIT_SETUP_LINES.len())
		.all(|line| line == "AT+CPIN?"));
}

#[test]
fn init_stops_when_echo_cannot_be_disabled() {
	let mut modem = open_mock();
	modem.reply(b"\r\nOK\r\n").reply(b"\r\nERROR\r\n");
	assert!(!modem.init(None).unwrap());
	assert_eq!(modem.written_lines(), vec!["AT", "ATE0"]);
}

#[test]
fn init_configures_error_reporting() {
	let mut channel = Channel::open_mock();
	channel.set_error_reporting(ErrorReporting::Verbose);
	let mut modem = Sim76xx::new(channel);
	modem
		.reply_to_init_setup()
		.reply(b"\r\n+CPIN: READY\r\n\r\nOK\r\n");
	assert!(modem.init(None).unwrap());
	assert_eq!(modem.written_lines()[2], "AT+CMEE=2");
}

#[test]
fn modem_name_and_ccid() {
	let mut modem = open_mock();
	modem
		.reply(b"\r\nSIMCOM_SIM7670G\r\n\r\nOK\r\n")
		.reply(b"\r\n+ICCID: 89882390000012345678\r\n\r\nOK\r\n");
	assert_eq!(modem.modem_name().unwrap(), "SIMCOM SIM7670G");
	assert_eq!(modem.sim_ccid().unwrap(), "89882390000012345678");

	// Nothing more to read.
	assert_eq!(modem.modem_name().unwrap(), "SIMCom SIM76xx");
	assert_eq!(modem.sim_ccid().unwrap(), "");
}

#[test]
fn unsupported_operations_make_no_exchange() {
	let mut modem = open_mock();
	let err = modem.factory_default().unwrap_err();
	assert!(matches!(err, ModemError::Unsupported(_)));
	assert!(modem.battery_percent().is_err());
	assert!(modem.battery_charge_state().is_err());
	assert!(modem.channel().backend().written().is_empty());
	assert_eq!(modem.channel().clock().elapsed(), Duration::ZERO);
}

#[test]
fn hang_up() {
	let mut modem = open_mock();
	modem.reply(b"\r\nOK\r\n");
	assert!(modem.hang_up().unwrap());
	assert_eq!(modem.written_lines(), vec!["AT+CHUP"]);
}

#[test]
fn capabilities_as_trait_objects() {
	fn online(modem: &mut dyn Registrable) -> bool {
		modem.is_network_connected().unwrap()
	}

	let mut modem = open_mock();
	modem
		.reply(b"\r\n+CGREG: 0,5\r\n\r\nOK\r\n")
		.reply(b"\r\n+CGREG: 0,9\r\n\r\nOK\r\n")
		.reply(b"\r\n+CBC: 4.05V\r\n\r\nOK\r\n")
		.reply(b"\r\n+CPMUTEMP: 31\r\n\r\nOK\r\n");
	assert!(online(&mut modem));
	assert!(!online(&mut modem));

	let battery: &mut dyn BatteryTelemetry = &mut modem;
	assert_eq!(battery.battery_voltage().unwrap(), 4050);
	let thermometer: &mut dyn TemperatureTelemetry = &mut modem;
	assert_eq!(thermometer.temperature().unwrap(), 31);
}

#[test]
fn session_and_power_through_traits() {
	let mut modem = open_mock();
	modem
		.reply(b"ERROR\r\n")
		.reply(b"\r\nOK\r\n")
		.reply(b"\r\nOK\r\n");
	assert!(!modem.connect("internet", None).unwrap());
	assert!(modem.disconnect().unwrap());
	assert!(modem.radio_off().unwrap());
	assert_eq!(
		modem.written_lines(),
		vec!["AT+CGDCONT=1,\"IP\",\"internet\"", "AT+CGACT=0,1", "AT+CFUN=4"]
	);
}

#[test]
fn custom_quirks() {
	let mut quirks = VendorQuirks::SIM76XX;
	quirks.registration_command = "CEREG";
	quirks.timeouts.pdp_deactivate = Duration::from_secs(2);
	let mut modem = Sim76xx::with_quirks(Channel::open_mock(), quirks);
	assert_eq!(modem.registration_status().unwrap(), RegistrationState::NoResult);
	assert_eq!(modem.written_lines(), vec!["AT+CEREG?"]);
	assert_eq!(modem.channel().clock().elapsed(), Duration::from_secs(1));

	assert!(!modem.disconnect().unwrap());
	assert_eq!(modem.channel().clock().elapsed(), Duration::from_secs(3));
}

#[test]
fn short_commands_follow_the_channel_default_timeout() {
	let mut modem = open_mock();
	modem
		.channel_mut()
		.backend_mut()
		.append_data_after(Duration::from_secs(5), b"\r\n+CBC: 4.05V\r\n\r\nOK\r\n");
	assert_eq!(modem.battery_voltage().unwrap(), 0);
	assert_eq!(modem.channel().clock().elapsed(), Duration::from_secs(1));

	modem.channel_mut().set_default_timeout(Duration::from_secs(30));
	assert_eq!(modem.battery_voltage().unwrap(), 4050);
	assert_eq!(modem.channel().clock().elapsed(), Duration::from_secs(5));
}

#[test]
fn timeout_guard_applies_to_modem_operations() {
	let mut channel = Channel::open_mock();
	channel
		.backend_mut()
		.append_data_after(Duration::from_secs(3), b"\r\n+CPMUTEMP: 27\r\n\r\nOK\r\n");
	{
		let mut guard = channel.timeout_guard(Duration::from_secs(10));
		assert_eq!(TelemetryQueries::new(&mut *guard).temperature().unwrap(), 27);
	}
	assert_eq!(channel.default_timeout(), crate::channel::DEFAULT_TIMEOUT);

	channel
		.backend_mut()
		.append_data_after(Duration::from_secs(3), b"\r\n+CPMUTEMP: 27\r\n\r\nOK\r\n");
	assert_eq!(TelemetryQueries::new(&mut channel).temperature().unwrap(), 0);
}

#[test]
fn closed_connection_is_not_collapsed() {
	let mut modem = open_mock();
	modem.channel_mut().backend_mut().close();
	assert!(modem.battery_voltage().unwrap_err().is_io());
	assert!(modem.registration_status().unwrap_err().is_io());
	assert!(modem.connect("internet", None).unwrap_err().is_io());
}
