//! Types for opening and using a command channel to a modem.
//!
//! A [`Channel`] pairs a [`Backend`] with the response scanner. It writes AT
//! commands and waits for one of several terminator patterns to appear in the
//! modem's output, reporting which one matched and keeping whatever text came
//! before it as the captured payload.
//!
//! ```rust
//! # use cellmodem::{Channel, backend::Backend, clock::Clock, error::ModemError};
//! # use std::time::Duration;
//! # fn wrapper<B: Backend, C: Clock>(channel: &mut Channel<B, C>) -> Result<(), ModemError> {
//! channel.send_command("+CSQ")?;
//! channel.expect(Duration::from_secs(1), "+CSQ:")?;
//! let quality = channel.read_field(Duration::from_secs(1))?;
//! channel.expect_ok(Duration::from_secs(1))?;
//! # Ok(())
//! # }
//! ```
//!
//! Exchanges must be strictly sequential: a reply cannot be attributed to a
//! command if two commands are outstanding at once. Every method that talks to
//! the modem takes `&mut self`, so sharing a channel between threads requires
//! wrapping it in a [`Mutex`](std::sync::Mutex) and holding the lock for a
//! whole exchange.

mod options;

#[cfg(any(test, feature = "mock"))]
use crate::{backend::Mock, clock::MockClock};
use crate::{
	backend::{Backend, Serial, UNKNOWN_BACKEND_NAME},
	clock::{Clock, SystemClock},
	error::{CommandFailureError, FailureKind, ModemError, TimeoutError},
	scanner::{self, Matcher, Outcome, PatternSet},
	timeout_guard::TimeoutGuard,
};
pub use options::*;
use std::{
	io,
	net::{TcpStream, ToSocketAddrs},
	time::Duration,
};

/// The line terminator used by commands and replies.
pub const NL: &str = "\r\n";
/// The success terminator.
pub const OK: &str = "OK\r\n";
/// The failure terminator.
pub const ERROR: &str = "ERROR\r\n";
/// The prefix of an equipment error report.
pub const CME_ERROR: &str = "\r\n+CME ERROR:";
/// The prefix of a message service error report.
pub const CMS_ERROR: &str = "\r\n+CMS ERROR:";

/// The default timeout for simple acknowledgement commands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
/// The default longest single blocking read.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long each liveness probe attempt waits for `OK`.
const PROBE_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(200);
/// The pause between liveness probe attempts.
const PROBE_PAUSE: Duration = Duration::from_millis(100);

/// A channel for exchanging AT commands and replies with a modem.
///
/// A channel is parameterized by two types:
///
/// 1. `B`: the type of [`Backend`] used to send/receive bytes.
///    * Use the convenience methods [`open_serial`] and [`open_tcp`] to
///      construct a serial channel (`Channel<Serial>`) or a TCP channel
///      (`Channel<TcpStream>`). To customize the construction of these types
///      use the [`OpenSerialOptions`] and [`OpenTcpOptions`] builder types.
/// 2. `C`: the [`Clock`] used for deadlines and sleeping.
///    * This defaults to the [`SystemClock`] and only needs changing in tests.
///
/// [`open_serial`]: Channel::open_serial
/// [`open_tcp`]: Channel::open_tcp
pub struct Channel<B, C = SystemClock> {
	/// The underlying backend
	backend: B,
	/// The source of time for deadlines
	clock: C,
	/// The longest single wait on the backend before re-checking the deadline
	poll_interval: Duration,
	/// The timeout used by waits that do not specify one
	default_timeout: Duration,
	/// How the modem has been asked to report errors
	error_reporting: ErrorReporting,
	/// The bytes consumed by the last wait, minus the matched pattern
	payload: Vec<u8>,
	/// The last command sent, without the `AT` prefix
	last_command: String,
	/// If populated, the error that has "poisoned" the channel. This error MUST be
	/// reported before the channel is used for communication again.
	///
	/// A channel becomes poisoned when restoring the backend's read timeout
	/// after a successful wait fails. Reporting the failure immediately would
	/// lose the outcome of the wait, so it is reported by the next exchange.
	poison: Option<io::Error>,
}

impl<B: Backend, C> std::fmt::Debug for Channel<B, C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Channel")
			.field("name", &self.backend.name())
			.field("error_reporting", &self.error_reporting)
			.finish_non_exhaustive()
	}
}

impl Channel<Serial> {
	/// Open the serial port at the specified path using the default options.
	///
	/// Alternatively, use [`Channel::open_serial_options`] to customize how the port is opened.
	///
	/// ## Example
	///
	/// ```rust
	/// # use cellmodem::Channel;
	/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
	/// let mut channel = Channel::open_serial("/dev/ttyUSB2")?;
	/// // Or equivalently
	/// let mut channel = Channel::open_serial_options().open("/dev/ttyUSB2")?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn open_serial(path: &str) -> Result<Channel<Serial>, ModemError> {
		OpenSerialOptions::new().open(path)
	}

	/// Get an [`OpenSerialOptions`] to customize how a serial port is opened.
	pub fn open_serial_options() -> OpenSerialOptions {
		OpenSerialOptions::default()
	}
}

impl Channel<TcpStream> {
	/// Connect to a modem exposed over TCP (for instance, by a serial-to-network bridge).
	///
	/// Alternatively, use [`Channel::open_tcp_options`] to customize how the connection is opened.
	pub fn open_tcp<A: ToSocketAddrs>(address: A) -> Result<Channel<TcpStream>, io::Error> {
		OpenTcpOptions::new().open(address)
	}

	/// Get an [`OpenTcpOptions`] to customize how a TCP connection is opened.
	pub fn open_tcp_options() -> OpenTcpOptions {
		OpenTcpOptions::default()
	}
}

#[cfg(any(test, feature = "mock"))]
#[cfg_attr(all(doc, feature = "doc_cfg"), doc(cfg(feature = "mock")))]
impl Channel<Mock, MockClock> {
	/// Open a channel on a [`Mock`] backend whose reads consume time on a
	/// shared [`MockClock`].
	pub fn open_mock() -> Channel<Mock, MockClock> {
		let clock = MockClock::new();
		Channel::with_backend(Mock::with_clock(clock.clone()), clock)
	}
}

impl<B: Backend, C: Clock> Channel<B, C> {
	/// Create a channel from any [`Backend`] and [`Clock`] with the default options.
	pub fn with_backend(backend: B, clock: C) -> Self {
		Channel::from_parts(
			backend,
			clock,
			DEFAULT_POLL_INTERVAL,
			DEFAULT_TIMEOUT,
			ErrorReporting::default(),
		)
	}

	/// Create a channel from its parts.
	pub(crate) fn from_parts(
		backend: B,
		clock: C,
		poll_interval: Duration,
		default_timeout: Duration,
		error_reporting: ErrorReporting,
	) -> Self {
		Channel {
			backend,
			clock,
			poll_interval,
			default_timeout,
			error_reporting,
			payload: Vec::new(),
			last_command: String::new(),
			poison: None,
		}
	}

	/// Check if the channel is poisoned and report the error if it exists.
	fn check_poisoned(&mut self) -> Result<(), io::Error> {
		if let Some(poison) = self.poison.take() {
			Err(poison)
		} else {
			Ok(())
		}
	}

	/// The name of the backend, for logging.
	fn backend_name(&self) -> String {
		self.backend
			.name()
			.unwrap_or_else(|| UNKNOWN_BACKEND_NAME.to_string())
	}

	/// Send a command. A reply is not read.
	///
	/// The command is prefixed with `AT` and terminated with `\r\n`.
	///
	/// ## Example
	///
	/// ```rust
	/// # use cellmodem::{Channel, backend::Backend, clock::Clock};
	/// # fn wrapper<B: Backend, C: Clock>(channel: &mut Channel<B, C>) -> Result<(), Box<dyn std::error::Error>> {
	/// // Sends "AT+CPOF\r\n"
	/// channel.send_command("+CPOF")?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn send_command(&mut self, command: &str) -> Result<(), ModemError> {
		self.check_poisoned()?;

		let line = format!("AT{command}{NL}");
		log::debug!("{} TX:   {}", self.backend_name(), line.trim_end());
		self.backend.write_all(line.as_bytes())?;
		self.backend.flush()?;
		command.clone_into(&mut self.last_command);
		Ok(())
	}

	/// Wait until one of `patterns` appears in the modem's output.
	///
	/// The patterns are checked in the order given, so the earlier pattern wins
	/// if two complete on the same byte. Empty patterns never match but keep
	/// their position. At most [`MAX_PATTERNS`](crate::scanner::MAX_PATTERNS)
	/// patterns are supported.
	///
	/// The captured [`payload`](Channel::payload) is cleared first and then
	/// holds everything consumed before the winning pattern.
	pub fn wait_any(&mut self, timeout: Duration, patterns: &[&str]) -> Result<Outcome, ModemError> {
		self.check_poisoned()?;
		let patterns = PatternSet::new(patterns)?;

		let deadline = self.clock.now() + timeout;
		let original_timeout = self.backend.read_timeout()?;
		let mut matcher = Matcher::new(patterns, &mut self.payload);
		let result = scanner::scan(
			&mut self.backend,
			&self.clock,
			&mut matcher,
			deadline,
			self.poll_interval,
		);
		if let Err(e) = self.backend.set_read_timeout(original_timeout) {
			if result.is_ok() {
				self.poison = Some(e);
			}
		}
		let outcome = result?;
		log::debug!(
			"{} RECV: {} ({:?})",
			self.backend_name(),
			String::from_utf8_lossy(&self.payload).trim(),
			outcome
		);
		Ok(outcome)
	}

	/// Wait for one of the default terminators: `OK` (index 0), `ERROR` (index 1)
	/// and, when error reporting is enabled, `+CME ERROR:` (index 2) and
	/// `+CMS ERROR:` (index 3).
	pub fn wait_response(&mut self, timeout: Duration) -> Result<Outcome, ModemError> {
		self.wait_response_for(timeout, OK)
	}

	/// Wait for one of the default terminators within the
	/// [default timeout](Channel::default_timeout).
	///
	/// See [`wait_response`](Channel::wait_response) for the pattern indices.
	pub fn wait_response_default(&mut self) -> Result<Outcome, ModemError> {
		self.wait_response(self.default_timeout)
	}

	/// Wait for `pattern` (index 0) or one of the default error terminators.
	///
	/// See [`wait_response`](Channel::wait_response) for the indices of the
	/// error terminators.
	pub fn wait_response_for(
		&mut self,
		timeout: Duration,
		pattern: &str,
	) -> Result<Outcome, ModemError> {
		let (cme, cms) = if self.error_reporting.is_enabled() {
			(CME_ERROR, CMS_ERROR)
		} else {
			("", "")
		};
		self.wait_any(timeout, &[pattern, ERROR, cme, cms])
	}

	/// Wait for `OK`, converting any other outcome into an error.
	///
	/// ## Example
	///
	/// ```rust
	/// # use cellmodem::{Channel, backend::Backend, clock::Clock, error::ModemError};
	/// # use std::time::Duration;
	/// # fn wrapper<B: Backend, C: Clock>(channel: &mut Channel<B, C>) -> Result<(), ModemError> {
	/// channel.send_command("+CFUN=1")?;
	/// channel.expect_ok(Duration::from_secs(10))?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn expect_ok(&mut self, timeout: Duration) -> Result<(), ModemError> {
		self.expect(timeout, OK)
	}

	/// Wait for `pattern`, converting any other outcome into an error.
	///
	/// A timeout produces [`ModemError::Timeout`]. An error terminator produces
	/// [`ModemError::CommandFailure`]; for `+CME ERROR:`/`+CMS ERROR:` reports the
	/// rest of the line is read and kept as the error's detail.
	pub fn expect(&mut self, timeout: Duration, pattern: &str) -> Result<(), ModemError> {
		let outcome = self.wait_response_for(timeout, pattern)?;
		let kind = match outcome {
			Outcome::Matched(0) => return Ok(()),
			Outcome::Timeout => return Err(TimeoutError::new(timeout).into()),
			Outcome::Matched(2) => FailureKind::Equipment,
			Outcome::Matched(3) => FailureKind::MessageService,
			Outcome::Matched(_) => FailureKind::Error,
		};
		let detail = match kind {
			FailureKind::Error => None,
			_ => self.read_field(self.default_timeout)?,
		};
		let command = std::mem::take(&mut self.last_command);
		let err = CommandFailureError::new(&command, kind, detail.as_deref().unwrap_or(""));
		self.last_command = command;
		log::debug!("{} {}", self.backend_name(), err);
		Err(err.into())
	}

	/// Read the rest of the current line.
	///
	/// The returned text is trimmed of surrounding whitespace, including the
	/// line terminator. `None` is returned if no line end arrives in time.
	pub fn read_field(&mut self, timeout: Duration) -> Result<Option<String>, ModemError> {
		match self.wait_any(timeout, &["\n"])? {
			Outcome::Matched(_) => Ok(Some(self.payload_text().trim().to_string())),
			Outcome::Timeout => Ok(None),
		}
	}

	/// Send a command and wait for `OK`.
	pub fn command(&mut self, command: &str, timeout: Duration) -> Result<(), ModemError> {
		self.send_command(command)?;
		self.expect_ok(timeout)
	}

	/// Send a query, wait for the reply line starting with `tag`, read the
	/// rest of that line, and then wait for the final `OK`.
	///
	/// ## Example
	///
	/// ```rust
	/// # use cellmodem::{Channel, backend::Backend, clock::Clock, error::ModemError};
	/// # use std::time::Duration;
	/// # fn wrapper<B: Backend, C: Clock>(channel: &mut Channel<B, C>) -> Result<(), ModemError> {
	/// // "\r\n+CSQ: 21,99\r\n\r\nOK\r\n" produces "21,99"
	/// let quality = channel.query("+CSQ", "+CSQ:", Duration::from_secs(1))?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn query(&mut self, command: &str, tag: &str, timeout: Duration) -> Result<String, ModemError> {
		self.send_command(command)?;
		self.expect(timeout, tag)?;
		let field = self
			.read_field(timeout)?
			.ok_or(TimeoutError::new(timeout))?;
		self.expect_ok(timeout)?;
		Ok(field)
	}

	/// Check that the modem is alive.
	///
	/// `AT` is sent repeatedly until the modem answers `OK` or `budget` elapses.
	/// Each attempt waits briefly for an answer so that a modem that is still
	/// booting, or whose baud rate detection has not locked on yet, is retried.
	pub fn probe(&mut self, budget: Duration) -> Result<bool, ModemError> {
		let start = self.clock.now();
		while self.clock.now() - start < budget {
			self.send_command("")?;
			if self.wait_response(PROBE_ATTEMPT_TIMEOUT)?.is(0) {
				return Ok(true);
			}
			self.clock.sleep(PROBE_PAUSE);
		}
		log::warn!("{} did not answer AT within {:?}", self.backend_name(), budget);
		Ok(false)
	}

	/// Discard any stale bytes the backend has buffered.
	///
	/// Use this before the next command after abandoning an exchange early, so
	/// that a late reply to the abandoned command is not mistaken for a reply
	/// to the new one.
	pub fn resync(&mut self) -> Result<(), ModemError> {
		self.check_poisoned()?;
		self.backend.discard_input()?;
		self.payload.clear();
		log::debug!("{} discarded stale input", self.backend_name());
		Ok(())
	}

	/// The bytes consumed by the last wait, excluding the matched pattern.
	pub fn payload(&self) -> &[u8] {
		&self.payload
	}

	/// The [`payload`](Channel::payload) as text.
	///
	/// Invalid UTF-8 sequences are replaced.
	pub fn payload_text(&self) -> std::borrow::Cow<'_, str> {
		String::from_utf8_lossy(&self.payload)
	}

	/// Set the timeout used by waits that do not specify one and return the
	/// previous value.
	pub fn set_default_timeout(&mut self, timeout: Duration) -> Duration {
		std::mem::replace(&mut self.default_timeout, timeout)
	}

	/// The timeout used by waits that do not specify one.
	///
	/// Modem operations use it for simple acknowledgement commands and
	/// queries. Long-running operations use their own
	/// [`Timeouts`](crate::modem::Timeouts) class.
	pub fn default_timeout(&self) -> Duration {
		self.default_timeout
	}

	/// Set the default timeout and return a "scope guard" that will reset it
	/// when it goes out of scope.
	///
	/// ## Example
	/// ```rust
	/// # use cellmodem::{Channel, backend::Backend, clock::Clock, error::ModemError};
	/// # use std::time::Duration;
	/// # fn helper<B: Backend, C: Clock>(channel: &mut Channel<B, C>) -> Result<(), ModemError> {
	/// {
	///     let mut guard = channel.timeout_guard(Duration::from_secs(10));
	///     let timeout = guard.default_timeout();
	///     guard.command("+CFUN=1", timeout)?;
	/// }  // The guard is dropped and the default timeout is reset.
	/// # Ok(())
	/// # }
	/// ```
	pub fn timeout_guard(&mut self, timeout: Duration) -> TimeoutGuard<'_, B, C> {
		TimeoutGuard::new(self, timeout)
	}

	/// Set how long a single read may block before the deadline is checked again.
	///
	/// The previous value is returned. Zero is treated as one millisecond.
	pub fn set_poll_interval(&mut self, interval: Duration) -> Duration {
		std::mem::replace(
			&mut self.poll_interval,
			interval.max(Duration::from_millis(1)),
		)
	}

	/// How long a single read may block before the deadline is checked again.
	pub fn poll_interval(&self) -> Duration {
		self.poll_interval
	}

	/// Set how the modem is expected to report errors and return the previous value.
	///
	/// This only changes which terminators the channel listens for. Use
	/// [`Modem::init`](crate::Modem::init) to configure the modem itself.
	pub fn set_error_reporting(&mut self, reporting: ErrorReporting) -> ErrorReporting {
		std::mem::replace(&mut self.error_reporting, reporting)
	}

	/// How the modem is expected to report errors.
	pub fn error_reporting(&self) -> ErrorReporting {
		self.error_reporting
	}

	/// Get the "name" of the channel's backend.
	pub fn name(&self) -> Option<String> {
		self.backend.name()
	}

	/// Get a reference to the clock.
	pub fn clock(&self) -> &C {
		&self.clock
	}

	/// Get a reference to the backend.
	pub fn backend(&self) -> &B {
		&self.backend
	}

	/// Get a mutable reference to the backend.
	pub fn backend_mut(&mut self) -> &mut B {
		&mut self.backend
	}

	/// Consume the channel and return the underlying backend.
	pub fn into_backend(self) -> B {
		self.backend
	}
}
