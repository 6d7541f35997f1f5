//! Error types.
//!
//! Each error is represented by a unique type that implements [`std::error::Error`].
//! Most APIs return the higher level [`ModemError`] enum, which every error type
//! converts into, allowing them to be used with `?`:
//!
//! ```
//! use cellmodem::error::{ModemError, TimeoutError};
//!
//! fn foo() -> Result<(), TimeoutError> {
//!     // ...
//! # unimplemented!();
//! }
//!
//! fn bar() -> Result<(), ModemError> {
//!     foo()?;
//!     // ...
//! # Ok(())
//! }
//! ```
//!
//! Only transport failures are surfaced as errors by the high-level modem
//! operations. A modem that does not answer in time, or answers with an error
//! terminator, produces `false` or a documented "unavailable" value instead.
//! The lower level [`Channel`](crate::Channel) methods report those outcomes
//! as [`TimeoutError`] and [`CommandFailureError`] so the distinction between
//! "no communication happened" and "the modem rejected the command" is never
//! lost.

/// Implement Error and Display traits for the specified type.
///
/// After the type define the format string and any arguments it should
/// reference after `self =>` (to abide by macro hygiene rules).
macro_rules! impl_error_display {
	(
		$name:path,
		$self:ident =>
		$display:literal
		$(,
			$($arg:expr),+
		)?
	) => {
		impl std::error::Error for $name {}

		impl std::fmt::Display for $name {
			fn fmt(&$self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				write!(
					f,
					$display
					$(,
						$($arg),+
					)?
				)
			}
		}
	};
}

/// Define error enums that contain concrete error types (not other error enums).
///
/// From and TryFrom traits will be implemented for the enum and it's underlying
/// errors. The enum's Display implementation will defer to the underlying errors'
/// Display implementations.
///
/// ```compile_fail
/// # // This fails to compile because the macro is not exported.
/// error_enum!{
///     #[non_exhaustive]
///     pub enum ThisError {
///         VariantA(A),
///         VariantB(B),
///         // ...
///     }
/// }
/// ```
macro_rules! error_enum {
	(
		$(#[$attr:meta])*
		pub enum $name:ident {
			$(
				$variant:ident($inner:path)
			),+
			$(,)?
		}
	) => {
		$(
			#[$attr]
		)*
		#[allow(missing_docs)]
		pub enum $name {
			$(
				$variant($inner)
			),+
		}

		impl std::error::Error for $name {}

		// Defer the display to the inner error type
		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				match self {
					$(
						$name::$variant(e) => e.fmt(f)
					),+
				}
			}
		}

		// Allow the enum to be convertible from an infallible error
		impl From<std::convert::Infallible> for $name {
			fn from(_: std::convert::Infallible) -> Self {
				unreachable!();
			}
		}

		// Conversions with underlying errors
		$(
			impl From<$inner> for $name {
				fn from(other: $inner) -> Self {
					$name::$variant(other)
				}
			}

			impl TryFrom<$name> for $inner {
				type Error = $name;
				fn try_from(other: $name) -> Result<Self, Self::Error> {
					match other {
						$name::$variant(value) => Ok(value),
						value => Err(value)
					}
				}
			}
		)+
	};
}

mod codes;
pub use codes::*;

use std::time::Duration;

/// The specified device is either disconnected or already in use by another process.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SerialDeviceInUseOrDisconnectedError(Box<str>);

impl_error_display! {
	SerialDeviceInUseOrDisconnectedError,
	self =>
	"the specified device is either disconnected or already in use by another process: {}", self.0
}

/// No expected pattern was received before the deadline elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeoutError {
	waited: Duration,
}

impl TimeoutError {
	/// Create a new error.
	pub(crate) const fn new(waited: Duration) -> Self {
		TimeoutError { waited }
	}

	/// How long the channel waited before giving up.
	pub const fn waited(&self) -> Duration {
		self.waited
	}
}

impl_error_display! {
	TimeoutError,
	self => "no expected response within {} ms", self.waited.as_millis()
}

/// Which error terminator the modem replied with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
	/// The plain `ERROR` terminator.
	Error,
	/// A `+CME ERROR:` (equipment) report.
	Equipment,
	/// A `+CMS ERROR:` (message service) report.
	MessageService,
}

/// The modem rejected a command by replying with an error terminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandFailureError {
	command: Box<str>,
	kind: FailureKind,
	detail: Box<str>,
}

impl CommandFailureError {
	/// Create a new error.
	pub(crate) fn new(command: &str, kind: FailureKind, detail: &str) -> Self {
		CommandFailureError {
			command: command.into(),
			kind,
			detail: detail.trim().into(),
		}
	}

	/// The command that was rejected, without the `AT` prefix.
	pub fn command(&self) -> &str {
		&self.command
	}

	/// The error terminator that was received.
	pub fn kind(&self) -> FailureKind {
		self.kind
	}

	/// The text following a `+CME ERROR:`/`+CMS ERROR:` report, if any.
	///
	/// This is the numeric code when the modem reports errors numerically,
	/// or a human readable message when verbose reporting is enabled.
	pub fn detail(&self) -> &str {
		&self.detail
	}

	/// The numeric vendor error code, if the modem reported one.
	pub fn code(&self) -> Option<i32> {
		match self.kind {
			FailureKind::Error => None,
			_ => self.detail.parse().ok(),
		}
	}

	/// Get the name of the numeric vendor error code.
	///
	/// If there is no code, or it is not recognized, `None` is returned.
	pub fn name(&self) -> Option<&'static str> {
		let code = self.code()?;
		match self.kind {
			FailureKind::Error => None,
			FailureKind::Equipment => cme_code::name(code),
			FailureKind::MessageService => cms_code::name(code),
		}
	}
}

impl std::error::Error for CommandFailureError {}

impl std::fmt::Display for CommandFailureError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "AT{} failed", self.command)?;
		match (self.kind, self.name()) {
			(FailureKind::Error, _) => Ok(()),
			(_, Some(name)) => write!(f, ": [{}] {}", self.detail, name),
			(_, None) if self.detail.is_empty() => Ok(()),
			(_, None) => write!(f, ": {}", self.detail),
		}
	}
}

/// The operation is not implemented by this modem variant.
///
/// It is returned without any exchange with the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnsupportedOperationError(&'static str);

impl UnsupportedOperationError {
	/// Create a new error.
	pub(crate) const fn new(operation: &'static str) -> Self {
		UnsupportedOperationError(operation)
	}

	/// The name of the unsupported operation.
	pub const fn operation(&self) -> &'static str {
		self.0
	}
}

impl_error_display! {
	UnsupportedOperationError,
	self => "{} is not supported by this modem", self.0
}

/// More patterns were passed to a single wait than the scanner supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TooManyPatternsError(usize);

impl TooManyPatternsError {
	/// Create a new error.
	pub(crate) const fn new(count: usize) -> Self {
		TooManyPatternsError(count)
	}
}

impl_error_display! {
	TooManyPatternsError,
	self => "{} patterns were given but at most {} are supported", self.0, crate::scanner::MAX_PATTERNS
}

error_enum! {
	/// Any error returned by this library.
	#[derive(Debug)]
	#[non_exhaustive]
	pub enum ModemError {
		SerialDeviceInUseOrDisconnected(SerialDeviceInUseOrDisconnectedError),
		Io(std::io::Error),
		Timeout(TimeoutError),
		CommandFailure(CommandFailureError),
		Unsupported(UnsupportedOperationError),
		TooManyPatterns(TooManyPatternsError),
	}
}

impl ModemError {
	/// A convenience function for determining if the error is due to the
	/// modem not answering in time.
	pub fn is_timeout(&self) -> bool {
		match self {
			ModemError::Timeout(_) => true,
			ModemError::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
			_ => false,
		}
	}

	/// A convenience function for determining if the error originated from
	/// the transport rather than from the modem's answer.
	pub fn is_io(&self) -> bool {
		matches!(
			self,
			ModemError::Io(_) | ModemError::SerialDeviceInUseOrDisconnected(_)
		)
	}
}

impl From<serialport::Error> for ModemError {
	fn from(other: serialport::Error) -> Self {
		use std::io;

		match other.kind() {
			serialport::ErrorKind::NoDevice => ModemError::SerialDeviceInUseOrDisconnected(
				SerialDeviceInUseOrDisconnectedError(other.description.into_boxed_str()),
			),
			serialport::ErrorKind::InvalidInput => ModemError::Io(io::Error::new(
				io::ErrorKind::InvalidInput,
				other.description,
			)),
			serialport::ErrorKind::Unknown => {
				ModemError::Io(io::Error::new(io::ErrorKind::Other, other.description))
			}
			serialport::ErrorKind::Io(kind) => ModemError::Io(io::Error::new(kind, other.description)),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use static_assertions::{assert_impl_all, const_assert};

	// Keep Result<T, ModemError> small.
	const _WORD_SIZE: usize = std::mem::size_of::<&usize>();
	const_assert!(std::mem::size_of::<ModemError>() <= 6 * _WORD_SIZE);

	assert_impl_all!(ModemError: From<TimeoutError>, From<CommandFailureError>, Send, Sync);
	assert_impl_all!(CommandFailureError: TryFrom<ModemError>);

	#[test]
	fn command_failure_display() {
		let err = CommandFailureError::new("+CGACT=1,1", FailureKind::Error, "");
		assert_eq!(err.to_string(), "AT+CGACT=1,1 failed");
		assert_eq!(err.code(), None);

		let err = CommandFailureError::new("+CPIN?", FailureKind::Equipment, " 10\r");
		assert_eq!(err.code(), Some(10));
		assert_eq!(err.name(), Some("SIM Not Inserted"));
		assert_eq!(err.to_string(), "AT+CPIN? failed: [10] SIM Not Inserted");

		let err = CommandFailureError::new("+CPIN?", FailureKind::Equipment, "SIM not inserted");
		assert_eq!(err.code(), None);
		assert_eq!(err.to_string(), "AT+CPIN? failed: SIM not inserted");
	}

	#[test]
	fn error_classification() {
		let err = ModemError::from(TimeoutError::new(Duration::from_secs(1)));
		assert!(err.is_timeout());
		assert!(!err.is_io());

		let err = ModemError::from(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
		assert!(err.is_io());
		assert!(!err.is_timeout());

		let err = ModemError::from(UnsupportedOperationError::new("factory default"));
		assert_eq!(err.to_string(), "factory default is not supported by this modem");
		assert!(UnsupportedOperationError::try_from(err).is_ok());
	}
}
