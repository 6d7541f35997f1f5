//! A blocking driver for controlling SIMCom cellular modems with AT commands.
//!
//! The driver is built in two layers:
//!
//! * A [`Channel`] writes AT commands to a modem over a serial port or TCP
//!   connection and waits, with a deadline, for one of several terminator
//!   patterns to appear in the modem's output.
//! * The [`modem`] components interpret the replies to specific commands:
//!   network registration, packet data sessions, power management and sensor
//!   readings. The [`Sim76xx`] type combines them for the SIM7600 family.
//!
//! ```rust,no_run
//! use cellmodem::{Channel, Sim76xx, Modem, Registrable, SessionCapable};
//!
//! # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
//! let mut modem = Sim76xx::new(Channel::open_serial("/dev/ttyUSB2")?);
//! if modem.init(None)? && modem.is_network_connected()? {
//!     modem.connect("internet", None)?;
//!     println!("{:?}", modem.local_ip()?);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(all(doc, feature = "doc_cfg"), feature(doc_cfg))]

pub mod backend;
pub mod channel;
pub mod clock;
pub mod error;
pub mod modem;
pub mod scanner;
pub mod timeout_guard;

pub use channel::{Channel, ErrorReporting, OpenSerialOptions, OpenTcpOptions};
pub use modem::{
	BatteryTelemetry, Modem, PowerManageable, Registrable, RegistrationState, SessionCapable,
	Sim76xx, TemperatureTelemetry, VendorQuirks,
};
pub use scanner::Outcome;
