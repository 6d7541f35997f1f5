//! Types defining the different options when opening a channel.

use super::{Channel, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
use crate::{
	backend::{Backend, Serial},
	clock::SystemClock,
	error::ModemError,
};
use serialport as sp;
use std::{
	io,
	net::{TcpStream, ToSocketAddrs},
	time::Duration,
};

/// How the modem reports why a command failed.
///
/// This corresponds to the `AT+CMEE=<n>` setting. When reporting is enabled
/// the channel also listens for `+CME ERROR:` and `+CMS ERROR:` terminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorReporting {
	/// Failures are reported as a plain `ERROR` (`AT+CMEE=0`).
	#[default]
	Disabled,
	/// Failures are reported with numeric codes (`AT+CMEE=1`).
	Numeric,
	/// Failures are reported with human readable messages (`AT+CMEE=2`).
	Verbose,
}

impl ErrorReporting {
	/// The value for the `AT+CMEE` command.
	pub const fn level(self) -> u8 {
		match self {
			ErrorReporting::Disabled => 0,
			ErrorReporting::Numeric => 1,
			ErrorReporting::Verbose => 2,
		}
	}

	/// Whether `+CME ERROR:` and `+CMS ERROR:` reports are expected.
	pub const fn is_enabled(self) -> bool {
		!matches!(self, ErrorReporting::Disabled)
	}
}

/// Options for configuring and opening a serial channel.
///
/// ## Example
///
/// ```rust
/// # use cellmodem::{OpenSerialOptions, ErrorReporting};
/// # use std::time::Duration;
/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
/// let mut channel = OpenSerialOptions::new()
///     .baud_rate(9_600)
///     .error_reporting(ErrorReporting::Numeric)
///     .open("/dev/ttyUSB2")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OpenSerialOptions {
	/// The custom baud rate
	baud_rate: u32,
	/// The longest single blocking read
	poll_interval: Duration,
	/// The timeout for waits that do not specify one
	default_timeout: Duration,
	/// How the modem is expected to report errors
	error_reporting: ErrorReporting,
}

impl OpenSerialOptions {
	/// The default baud rate of SIMCom modems: 115,200.
	pub const DEFAULT_BAUD_RATE: u32 = 115_200;

	/// Create a blank set of options ready for configuration.
	///
	/// The default baud rate is 115,200, the default timeout is 1 second and
	/// error reporting is disabled.
	///
	/// Equivalent to [`default`](OpenSerialOptions::default).
	pub fn new() -> Self {
		OpenSerialOptions {
			baud_rate: OpenSerialOptions::DEFAULT_BAUD_RATE,
			poll_interval: DEFAULT_POLL_INTERVAL,
			default_timeout: DEFAULT_TIMEOUT,
			error_reporting: ErrorReporting::default(),
		}
	}

	/// Set a custom baud rate.
	///
	/// The default is 115,200.
	pub fn baud_rate(&mut self, baud_rate: u32) -> &mut Self {
		self.baud_rate = baud_rate;
		self
	}

	/// Set how long a single read may block before deadlines are checked again.
	///
	/// The default is 10 ms.
	pub fn poll_interval(&mut self, interval: Duration) -> &mut Self {
		self.poll_interval = interval.max(Duration::from_millis(1));
		self
	}

	/// Set the timeout for waits that do not specify one.
	///
	/// The default is 1 second.
	pub fn default_timeout(&mut self, timeout: Duration) -> &mut Self {
		self.default_timeout = timeout;
		self
	}

	/// Set how the modem is expected to report errors.
	///
	/// The default is [`ErrorReporting::Disabled`].
	pub fn error_reporting(&mut self, reporting: ErrorReporting) -> &mut Self {
		self.error_reporting = reporting;
		self
	}

	/// Open a [`Serial`] port at the specified path.
	fn open_serial_port(&self, path: &str) -> Result<Serial, ModemError> {
		// The baud rate passed to `new` is ignored on some platforms, so it is
		// set again with the `baud_rate` method.
		sp::new(path, OpenSerialOptions::DEFAULT_BAUD_RATE)
			.data_bits(sp::DataBits::Eight)
			.parity(sp::Parity::None)
			.flow_control(sp::FlowControl::None)
			.stop_bits(sp::StopBits::One)
			.timeout(self.poll_interval)
			.baud_rate(self.baud_rate)
			.open_native()
			.map(Serial)
			.map_err(Into::into)
	}

	/// Wrap an opened backend in a channel.
	fn channel<B: Backend>(&self, backend: B) -> Channel<B> {
		Channel::from_parts(
			backend,
			SystemClock,
			self.poll_interval,
			self.default_timeout,
			self.error_reporting,
		)
	}

	/// Open the channel at the specified path with the custom options.
	pub fn open(&self, path: &str) -> Result<Channel<Serial>, ModemError> {
		Ok(self.channel(self.open_serial_port(path)?))
	}

	/// Open the channel at the specified path with the custom options.
	///
	/// The type of the underlying backend is erased via dynamic dispatch,
	/// which does have runtime overhead. [`OpenSerialOptions::open`] should
	/// generally be used instead, except when the type of the underlying
	/// backend may not be known at compile time.
	pub fn open_dyn(&self, path: &str) -> Result<Channel<Box<dyn Backend>>, ModemError> {
		let backend: Box<dyn Backend> = Box::new(self.open_serial_port(path)?);
		Ok(self.channel(backend))
	}
}

impl Default for OpenSerialOptions {
	fn default() -> Self {
		OpenSerialOptions::new()
	}
}

/// Options for configuring and opening a TCP channel.
///
/// ## Example
///
/// ```rust
/// # use cellmodem::OpenTcpOptions;
/// # use std::time::Duration;
/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
/// let mut channel = OpenTcpOptions::new()
///     .default_timeout(Duration::from_secs(2))
///     .open("192.168.0.1:4001")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OpenTcpOptions {
	/// The longest single blocking read
	poll_interval: Duration,
	/// The timeout for waits that do not specify one
	default_timeout: Duration,
	/// How the modem is expected to report errors
	error_reporting: ErrorReporting,
}

impl OpenTcpOptions {
	/// Create a blank set of options ready for configuration.
	///
	/// The default timeout is 1 second and error reporting is disabled.
	///
	/// Equivalent to [`default`](OpenTcpOptions::default).
	pub fn new() -> Self {
		OpenTcpOptions {
			poll_interval: DEFAULT_POLL_INTERVAL,
			default_timeout: DEFAULT_TIMEOUT,
			error_reporting: ErrorReporting::default(),
		}
	}

	/// Set how long a single read may block before deadlines are checked again.
	///
	/// The default is 10 ms.
	pub fn poll_interval(&mut self, interval: Duration) -> &mut Self {
		self.poll_interval = interval.max(Duration::from_millis(1));
		self
	}

	/// Set the timeout for waits that do not specify one.
	///
	/// The default is 1 second.
	pub fn default_timeout(&mut self, timeout: Duration) -> &mut Self {
		self.default_timeout = timeout;
		self
	}

	/// Set how the modem is expected to report errors.
	///
	/// The default is [`ErrorReporting::Disabled`].
	pub fn error_reporting(&mut self, reporting: ErrorReporting) -> &mut Self {
		self.error_reporting = reporting;
		self
	}

	/// Open a [`TcpStream`] at the specified address.
	fn open_tcp_stream<A: ToSocketAddrs>(&self, address: A) -> io::Result<TcpStream> {
		let stream = TcpStream::connect(address)?;
		stream.set_read_timeout(Some(self.poll_interval))?;
		Ok(stream)
	}

	/// Wrap an opened backend in a channel.
	fn channel<B: Backend>(&self, backend: B) -> Channel<B> {
		Channel::from_parts(
			backend,
			SystemClock,
			self.poll_interval,
			self.default_timeout,
			self.error_reporting,
		)
	}

	/// Open the channel at the specified address with the custom options.
	pub fn open<A: ToSocketAddrs>(&self, address: A) -> io::Result<Channel<TcpStream>> {
		Ok(self.channel(self.open_tcp_stream(address)?))
	}

	/// Open the channel at the specified address with the custom options.
	///
	/// The type of the underlying backend is erased via dynamic dispatch,
	/// which does have runtime overhead. [`OpenTcpOptions::open`] should
	/// generally be used instead, except when the type of the underlying
	/// backend may not be known at compile time.
	pub fn open_dyn<A: ToSocketAddrs>(&self, address: A) -> io::Result<Channel<Box<dyn Backend>>> {
		let backend: Box<dyn Backend> = Box::new(self.open_tcp_stream(address)?);
		Ok(self.channel(backend))
	}
}

impl Default for OpenTcpOptions {
	fn default() -> Self {
		OpenTcpOptions::new()
	}
}
