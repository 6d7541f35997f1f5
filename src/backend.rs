//! Types that can exchange (read/write) bytes with a connected modem.
//!
//! The [`Backend`] trait represents all such types.

use std::io;
use std::time::Duration;

use serialport as sp;

#[cfg(windows)]
use sp::COMPort as ExternSerial;
use sp::SerialPort;
#[cfg(unix)]
use sp::TTYPort as ExternSerial;

/// The placeholder name for a backend that doesn't have a name.
pub(crate) const UNKNOWN_BACKEND_NAME: &str = "<unknown backend>";

/// Types that allow reading and writing bytes with a connected modem.
pub trait Backend: io::Read + io::Write + private::Sealed {
	/// Set the read timeout.
	///
	/// If timeout is `None`, reads will block indefinitely.
	fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), io::Error>;

	/// Get the read timeout.
	///
	/// If timeout is `None`, reads will block indefinitely.
	fn read_timeout(&self) -> Result<Option<Duration>, io::Error>;

	/// Discard any received bytes that have not been read yet.
	fn discard_input(&mut self) -> Result<(), io::Error>;

	/// Get the "name" of the backend.
	///
	/// This can be in any format, but should uniquely identify the backend
	/// instance.
	fn name(&self) -> Option<String>;
}

impl<C: Backend + ?Sized> Backend for Box<C> {
	fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), io::Error> {
		(**self).set_read_timeout(timeout)
	}
	fn read_timeout(&self) -> Result<Option<Duration>, io::Error> {
		(**self).read_timeout()
	}
	fn discard_input(&mut self) -> Result<(), io::Error> {
		(**self).discard_input()
	}
	fn name(&self) -> Option<String> {
		(**self).name()
	}
}

impl<C: Backend + ?Sized> Backend for &mut C {
	fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), io::Error> {
		(**self).set_read_timeout(timeout)
	}
	fn read_timeout(&self) -> Result<Option<Duration>, io::Error> {
		(**self).read_timeout()
	}
	fn discard_input(&mut self) -> Result<(), io::Error> {
		(**self).discard_input()
	}
	fn name(&self) -> Option<String> {
		(**self).name()
	}
}

impl Backend for std::net::TcpStream {
	fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), io::Error> {
		std::net::TcpStream::set_read_timeout(self, timeout)
	}
	fn read_timeout(&self) -> Result<Option<Duration>, io::Error> {
		std::net::TcpStream::read_timeout(self)
	}
	fn discard_input(&mut self) -> Result<(), io::Error> {
		use io::Read as _;

		self.set_nonblocking(true)?;
		let mut buf = [0u8; 256];
		let result = loop {
			match self.read(&mut buf) {
				Ok(0) => break Ok(()),
				Ok(_) => {}
				Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
				Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
				Err(e) => break Err(e),
			}
		};
		self.set_nonblocking(false)?;
		result
	}
	fn name(&self) -> Option<String> {
		self.peer_addr().map(|addr| format!("{addr}")).ok()
	}
}

/// A platform agnostic serial port backend.
//
// The `serialport` crate exposes two platform specific serial ports, `COMPort`
// and `TTYPort` for windows and unix, respectively. Wrapping whichever one the
// platform provides in a new type keeps the platform specific type out of
// every signature that mentions a serial backend.
#[derive(Debug)]
pub struct Serial(pub(crate) ExternSerial);

impl io::Read for Serial {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		self.0.read(buf)
	}
}

impl io::Write for Serial {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.0.write(buf)
	}

	fn flush(&mut self) -> io::Result<()> {
		self.0.flush()
	}
}

impl Backend for Serial {
	fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), io::Error> {
		// The serialport API does not support infinite timeouts, so simply set
		// the timeout to the largest possible duration if `timeout` is `None`,
		// which is practically infinite.
		Ok(self.0.set_timeout(timeout.unwrap_or(Duration::MAX))?)
	}
	fn read_timeout(&self) -> Result<Option<Duration>, io::Error> {
		Ok(Some(self.0.timeout()))
	}
	fn discard_input(&mut self) -> Result<(), io::Error> {
		Ok(self.0.clear(sp::ClearBuffer::Input)?)
	}
	fn name(&self) -> Option<String> {
		self.0.name()
	}
}

/// A mock backend for use in testing.
///
/// It has the following features:
///   * It records all data written to it.
///   * It can be filled with data for reading, either immediately or after
///     some amount of virtual time has passed on a shared [`MockClock`].
///   * Specific errors can be inserted for calls to `read`, `write`, `flush`,
///     and `set_read_timeout`.
///
/// [`MockClock`]: crate::clock::MockClock
#[cfg(any(test, feature = "mock"))]
#[cfg_attr(all(doc, feature = "doc_cfg"), doc(cfg(feature = "mock")))]
#[derive(Debug)]
pub struct Mock {
	/// Bytes that can be read right now.
	available: std::collections::VecDeque<u8>,
	/// Bytes that become readable once the clock reaches the paired time.
	scheduled: std::collections::VecDeque<(Duration, Vec<u8>)>,
	/// Everything written to the backend.
	written: Vec<u8>,
	/// The clock that drives scheduled data and simulated read timeouts.
	clock: Option<crate::clock::MockClock>,
	/// Whether an empty read reports `WouldBlock` instead of waiting.
	nonblocking: bool,
	/// Whether the remote end has closed the stream.
	closed: bool,
	/// The number of calls to `read`.
	reads: usize,
	/// The error to surface on the next read, if any. It is only surfaced once.
	read_error: Option<io::Error>,
	/// The error to surface on the next write, if any. It is only surfaced once.
	write_error: Option<io::Error>,
	/// The error to surface on the next flush, if any. It is only surfaced once.
	flush_error: Option<io::Error>,
	/// The error to surface on the next set_read_timeout, if any. It is only surfaced once.
	set_read_timeout_error: Option<io::Error>,
	/// The read timeout, which is simulated against the clock, if any.
	read_timeout: Option<Duration>,
}

#[cfg(any(test, feature = "mock"))]
impl Mock {
	/// Create a new Mock backend.
	///
	/// Without a clock, reading from an empty mock fails with a timeout
	/// error immediately.
	pub fn new() -> Self {
		Mock {
			available: std::collections::VecDeque::new(),
			scheduled: std::collections::VecDeque::new(),
			written: Vec::new(),
			clock: None,
			nonblocking: false,
			closed: false,
			reads: 0,
			read_error: None,
			write_error: None,
			flush_error: None,
			set_read_timeout_error: None,
			read_timeout: Some(Duration::ZERO),
		}
	}

	/// Create a new Mock backend whose reads consume virtual time on `clock`.
	pub fn with_clock(clock: crate::clock::MockClock) -> Self {
		Mock {
			clock: Some(clock),
			..Mock::new()
		}
	}

	/// Append data to the read buffer.
	///
	/// The data is not validated in any way.
	pub fn append_data<T: AsRef<[u8]>>(&mut self, bytes: T) {
		self.available.extend(bytes.as_ref());
	}

	/// Append data that only becomes readable once `delay` of virtual time
	/// has passed from now.
	///
	/// Without a clock the data is readable immediately.
	pub fn append_data_after<T: AsRef<[u8]>>(&mut self, delay: Duration, bytes: T) {
		let elapsed = self
			.clock
			.as_ref()
			.map_or(Duration::ZERO, crate::clock::MockClock::elapsed);
		self.scheduled
			.push_back((elapsed + delay, bytes.as_ref().to_vec()));
		self.release();
	}

	/// Clear the read buffer, including any scheduled data.
	pub fn clear_buffer(&mut self) {
		self.available.clear();
		self.scheduled.clear();
	}

	/// Whether the mock has any data available right now or not.
	pub fn is_empty(&self) -> bool {
		self.available.is_empty()
	}

	/// All the bytes written to the mock so far.
	pub fn written(&self) -> &[u8] {
		&self.written
	}

	/// The written bytes, split into lines with the line terminators removed.
	pub fn written_lines(&self) -> Vec<String> {
		String::from_utf8_lossy(&self.written)
			.split("\r\n")
			.filter(|line| !line.is_empty())
			.map(ToString::to_string)
			.collect()
	}

	/// Forget everything written so far.
	pub fn clear_written(&mut self) {
		self.written.clear();
	}

	/// The number of times `read` has been called.
	pub fn read_count(&self) -> usize {
		self.reads
	}

	/// Set whether empty reads return `WouldBlock` immediately (`true`) or
	/// wait for the read timeout and return `TimedOut` (`false`, the default).
	pub fn set_nonblocking(&mut self, nonblocking: bool) {
		self.nonblocking = nonblocking;
	}

	/// Simulate the remote end closing the stream.
	///
	/// Data that is already readable can still be read. After that every read
	/// returns zero bytes, as a TCP connection does once its peer hangs up.
	pub fn close(&mut self) {
		self.closed = true;
	}

	/// Set the error for the next `read`, if any.
	pub fn read_error(&mut self, err: Option<io::Error>) {
		self.read_error = err;
	}
	/// Set the error for the next `write`, if any.
	pub fn write_error(&mut self, err: Option<io::Error>) {
		self.write_error = err;
	}
	/// Set the error for the next `flush`, if any.
	pub fn flush_error(&mut self, err: Option<io::Error>) {
		self.flush_error = err;
	}
	/// Set the error for the next `set_read_timeout`, if any.
	pub fn set_read_timeout_error(&mut self, err: Option<io::Error>) {
		self.set_read_timeout_error = err;
	}

	/// Move any scheduled data whose time has come into the read buffer.
	fn release(&mut self) {
		let elapsed = match &self.clock {
			Some(clock) => clock.elapsed(),
			None => Duration::MAX,
		};
		while let Some((at, _)) = self.scheduled.front() {
			if *at > elapsed {
				break;
			}
			if let Some((_, bytes)) = self.scheduled.pop_front() {
				self.available.extend(bytes);
			}
		}
	}

	/// Simulate a device that has nothing to send by letting the clock run
	/// until either the read timeout elapses or scheduled data arrives.
	fn wait_for_data(&mut self) {
		let Some(clock) = &self.clock else {
			return;
		};
		let elapsed = clock.elapsed();
		let until_next = self
			.scheduled
			.front()
			.map(|(at, _)| at.saturating_sub(elapsed));
		let wait = match (self.read_timeout, until_next) {
			(Some(timeout), Some(next)) => timeout.min(next),
			(Some(timeout), None) => timeout,
			(None, Some(next)) => next,
			(None, None) => Duration::ZERO,
		};
		clock.advance(wait);
		self.release();
	}
}

#[cfg(any(test, feature = "mock"))]
impl Default for Mock {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(any(test, feature = "mock"))]
impl Backend for Mock {
	fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), io::Error> {
		if let Some(err) = self.set_read_timeout_error.take() {
			Err(err)
		} else {
			self.read_timeout = timeout;
			Ok(())
		}
	}

	fn read_timeout(&self) -> Result<Option<Duration>, io::Error> {
		Ok(self.read_timeout)
	}

	fn discard_input(&mut self) -> Result<(), io::Error> {
		self.release();
		self.available.clear();
		Ok(())
	}

	fn name(&self) -> Option<String> {
		Some(format!("<mock 0x{:x}>", self as *const Mock as usize))
	}
}

#[cfg(any(test, feature = "mock"))]
impl io::Read for Mock {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		self.reads += 1;
		if let Some(err) = self.read_error.take() {
			return Err(err);
		}
		self.release();
		if self.available.is_empty() && self.closed {
			return Ok(0);
		}
		if self.available.is_empty() {
			if self.nonblocking {
				return Err(io::Error::new(
					io::ErrorKind::WouldBlock,
					"Simulated would-block error",
				));
			}
			self.wait_for_data();
		}
		if self.available.is_empty() {
			// For a real device, having no data ready would result in a wait
			// and then eventual timeout error. The wait has been simulated
			// against the clock (if any), so report the timeout.
			return Err(io::Error::new(
				io::ErrorKind::TimedOut,
				"Simulated timeout error",
			));
		}
		let n = buf.len().min(self.available.len());
		for (slot, byte) in buf.iter_mut().zip(self.available.drain(..n)) {
			*slot = byte;
		}
		Ok(n)
	}
}

#[cfg(any(test, feature = "mock"))]
impl io::Write for Mock {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		if let Some(err) = self.write_error.take() {
			Err(err)
		} else {
			self.written.extend_from_slice(buf);
			Ok(buf.len())
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		if let Some(err) = self.flush_error.take() {
			Err(err)
		} else {
			Ok(())
		}
	}
}

mod private {
	pub trait Sealed {}

	impl Sealed for super::Serial {}
	impl Sealed for std::net::TcpStream {}
	#[cfg(any(test, feature = "mock"))]
	impl Sealed for super::Mock {}
	impl<C: super::Backend + ?Sized> Sealed for Box<C> {}
	impl<C: super::Backend + ?Sized> Sealed for &mut C {}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::clock::MockClock;
	use std::io::{Read as _, Write as _};

	#[test]
	fn mock_records_writes() {
		let mut mock = Mock::new();
		mock.write_all(b"AT+CBC\r\n").unwrap();
		mock.write_all(b"AT\r\n").unwrap();
		assert_eq!(mock.written_lines(), vec!["AT+CBC", "AT"]);
		mock.clear_written();
		assert!(mock.written().is_empty());
	}

	#[test]
	fn mock_releases_scheduled_data_on_the_clock() {
		let clock = MockClock::new();
		let mut mock = Mock::with_clock(clock.clone());
		mock.set_read_timeout(Some(Duration::from_millis(10))).unwrap();
		mock.append_data_after(Duration::from_millis(25), b"OK");

		let mut buf = [0u8; 4];
		assert_eq!(
			mock.read(&mut buf).unwrap_err().kind(),
			io::ErrorKind::TimedOut
		);
		assert_eq!(clock.elapsed(), Duration::from_millis(10));
		assert!(mock.read(&mut buf).is_err());
		// The data arrives part way through the third read's timeout.
		assert_eq!(mock.read(&mut buf).unwrap(), 2);
		assert_eq!(&buf[..2], b"OK");
		assert_eq!(clock.elapsed(), Duration::from_millis(25));
	}

	#[test]
	fn mock_nonblocking_does_not_consume_time() {
		let clock = MockClock::new();
		let mut mock = Mock::with_clock(clock.clone());
		mock.set_nonblocking(true);
		let mut buf = [0u8; 1];
		assert_eq!(
			mock.read(&mut buf).unwrap_err().kind(),
			io::ErrorKind::WouldBlock
		);
		assert_eq!(clock.elapsed(), Duration::ZERO);
	}

	#[test]
	fn mock_discard_input() {
		let mut mock = Mock::new();
		mock.append_data(b"stale\r\n");
		mock.discard_input().unwrap();
		assert!(mock.is_empty());
	}
}
