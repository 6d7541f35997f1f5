//! Incremental multi-pattern matching over a byte stream.
//!
//! The scanner consumes bytes one at a time from a [`Backend`] and, after each
//! byte, checks whether the bytes seen so far end with any of up to
//! [`MAX_PATTERNS`] patterns. Patterns are checked in the order the caller
//! gave them, so when two patterns complete on the same byte the one with the
//! lower index wins. Bytes are never read past the end of a match, so a reply
//! belonging to the next exchange is left untouched in the transport.
//!
//! Everything consumed before the winning pattern is kept as the captured
//! payload. The payload is bounded: once it reaches its capacity the oldest
//! half is discarded, which is fine because callers only ever need the
//! trailing field of a reply.

use crate::{backend::Backend, clock::Clock, error::TooManyPatternsError};
use std::{
	io,
	time::{Duration, Instant},
};

/// The maximum number of patterns that can be active in one wait.
pub const MAX_PATTERNS: usize = 5;

/// The minimum number of payload bytes retained before old content is discarded.
pub(crate) const PAYLOAD_CAPACITY: usize = 1024;

/// The result of waiting for a set of patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// The pattern at this (zero-based) index completed first.
	Matched(usize),
	/// The deadline elapsed without any pattern completing.
	Timeout,
}

impl Outcome {
	/// Whether the pattern at `index` is the one that matched.
	pub fn is(self, index: usize) -> bool {
		self == Outcome::Matched(index)
	}
}

/// An ordered set of up to [`MAX_PATTERNS`] byte patterns.
///
/// Empty patterns are disabled: they never match, but they keep their
/// position so the indices of the remaining patterns do not shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternSet<'a> {
	patterns: [&'a [u8]; MAX_PATTERNS],
	len: usize,
}

impl<'a> PatternSet<'a> {
	/// Create a pattern set from text patterns, in priority order.
	pub fn new(patterns: &[&'a str]) -> Result<Self, TooManyPatternsError> {
		if patterns.len() > MAX_PATTERNS {
			return Err(TooManyPatternsError::new(patterns.len()));
		}
		let mut set = PatternSet {
			patterns: [&[]; MAX_PATTERNS],
			len: patterns.len(),
		};
		for (slot, pattern) in set.patterns.iter_mut().zip(patterns) {
			*slot = pattern.as_bytes();
		}
		Ok(set)
	}

	/// The number of patterns, including disabled ones.
	pub fn len(&self) -> usize {
		self.len
	}

	/// Whether the set contains no patterns at all.
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Get the pattern at `index`.
	pub fn get(&self, index: usize) -> Option<&'a [u8]> {
		self.patterns[..self.len].get(index).copied()
	}

	/// The length of the longest pattern.
	fn longest(&self) -> usize {
		self.patterns[..self.len]
			.iter()
			.map(|p| p.len())
			.max()
			.unwrap_or(0)
	}
}

/// Matches a set of patterns against bytes pushed one at a time.
#[derive(Debug)]
pub(crate) struct Matcher<'p, 'a> {
	patterns: PatternSet<'a>,
	window: &'p mut Vec<u8>,
	capacity: usize,
}

impl<'p, 'a> Matcher<'p, 'a> {
	/// Create a matcher that accumulates consumed bytes into `payload`.
	///
	/// `payload` is cleared first.
	pub fn new(patterns: PatternSet<'a>, payload: &'p mut Vec<u8>) -> Self {
		payload.clear();
		let capacity = PAYLOAD_CAPACITY.max(2 * patterns.longest());
		Matcher {
			patterns,
			window: payload,
			capacity,
		}
	}

	/// Consume one byte and report the index of the pattern it completes, if any.
	///
	/// On a match the pattern's bytes are removed from the payload.
	pub fn push(&mut self, byte: u8) -> Option<usize> {
		if self.window.len() >= self.capacity {
			self.window.drain(..self.capacity / 2);
		}
		self.window.push(byte);
		let index = self.patterns.patterns[..self.patterns.len]
			.iter()
			.position(|p| !p.is_empty() && self.window.ends_with(p))?;
		let trimmed = self.window.len() - self.patterns.patterns[index].len();
		self.window.truncate(trimmed);
		Some(index)
	}
}

/// Consume bytes from `backend` until a pattern matches or `deadline` passes.
///
/// While no byte is available the calling thread waits, either inside the
/// backend's read (bounded by at most `poll`) or by sleeping on `clock`, so
/// the loop never spins. A read of zero bytes means the stream has ended and
/// is reported as an [`UnexpectedEof`](io::ErrorKind::UnexpectedEof) error.
pub(crate) fn scan<B, C>(
	backend: &mut B,
	clock: &C,
	matcher: &mut Matcher<'_, '_>,
	deadline: Instant,
	poll: Duration,
) -> io::Result<Outcome>
where
	B: Backend + ?Sized,
	C: Clock + ?Sized,
{
	let mut read_timeout = None;
	let mut byte = [0u8; 1];
	loop {
		let now = clock.now();
		if now >= deadline {
			return Ok(Outcome::Timeout);
		}
		let slice = poll.min(deadline - now);
		if read_timeout != Some(slice) {
			backend.set_read_timeout(Some(slice))?;
			read_timeout = Some(slice);
		}
		match backend.read(&mut byte) {
			Ok(0) => {
				return Err(io::Error::new(
					io::ErrorKind::UnexpectedEof,
					"the connection was closed",
				))
			}
			Ok(_) => {
				if let Some(index) = matcher.push(byte[0]) {
					return Ok(Outcome::Matched(index));
				}
			}
			// The backend already waited for the read timeout.
			Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
			Err(e) if e.kind() == io::ErrorKind::WouldBlock => clock.sleep(slice),
			Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
			Err(e) => return Err(e),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{backend::Mock, clock::MockClock};

	fn push_all(matcher: &mut Matcher<'_, '_>, bytes: &[u8]) -> Option<(usize, usize)> {
		for (offset, byte) in bytes.iter().enumerate() {
			if let Some(index) = matcher.push(*byte) {
				return Some((index, offset));
			}
		}
		None
	}

	#[test]
	fn first_completed_pattern_wins() {
		let patterns = PatternSet::new(&["OK\r\n", "ERROR\r\n"]).unwrap();
		let mut payload = Vec::new();
		let mut matcher = Matcher::new(patterns, &mut payload);
		let result = push_all(&mut matcher, b"\r\n+CBC: 4.05V\r\n\r\nERROR\r\nOK\r\n");
		assert_eq!(result, Some((1, 23)));
		assert_eq!(payload, b"\r\n+CBC: 4.05V\r\n\r\n");
	}

	#[test]
	fn lower_index_wins_on_simultaneous_completion() {
		let patterns = PatternSet::new(&["\r\nERROR", "ERROR"]).unwrap();
		let mut payload = Vec::new();
		let mut matcher = Matcher::new(patterns, &mut payload);
		assert_eq!(push_all(&mut matcher, b"\r\nERROR"), Some((0, 6)));

		let patterns = PatternSet::new(&["ERROR", "\r\nERROR"]).unwrap();
		let mut matcher = Matcher::new(patterns, &mut payload);
		assert_eq!(push_all(&mut matcher, b"\r\nERROR"), Some((0, 6)));
	}

	#[test]
	fn disabled_patterns_keep_their_index() {
		let patterns = PatternSet::new(&["", "", "PB DONE"]).unwrap();
		assert_eq!(patterns.len(), 3);
		let mut payload = Vec::new();
		let mut matcher = Matcher::new(patterns, &mut payload);
		assert_eq!(push_all(&mut matcher, b"\r\nPB DONE"), Some((2, 8)));
	}

	#[test]
	fn matching_is_case_sensitive() {
		let patterns = PatternSet::new(&["OK"]).unwrap();
		let mut payload = Vec::new();
		let mut matcher = Matcher::new(patterns, &mut payload);
		assert_eq!(push_all(&mut matcher, b"ok Ok oK"), None);
	}

	#[test]
	fn too_many_patterns() {
		assert!(PatternSet::new(&["1", "2", "3", "4", "5"]).is_ok());
		assert!(PatternSet::new(&["1", "2", "3", "4", "5", "6"]).is_err());
	}

	#[test]
	fn payload_is_bounded() {
		let patterns = PatternSet::new(&["OK\r\n"]).unwrap();
		let mut payload = Vec::new();
		let mut matcher = Matcher::new(patterns, &mut payload);
		for _ in 0..10 * PAYLOAD_CAPACITY {
			assert_eq!(matcher.push(b'x'), None);
		}
		assert_eq!(push_all(&mut matcher, b" 42\r\nOK\r\n"), Some((0, 8)));
		assert!(payload.len() <= PAYLOAD_CAPACITY);
		assert!(payload.ends_with(b"x 42\r\n"));
	}

	#[test]
	fn scan_stops_at_the_match() {
		let clock = MockClock::new();
		let mut backend = Mock::with_clock(clock.clone());
		backend.append_data(b"\r\nOK\r\n+CPIN: READY\r\n");
		let mut payload = Vec::new();
		let mut matcher = Matcher::new(PatternSet::new(&["OK\r\n"]).unwrap(), &mut payload);
		let deadline = clock.now() + Duration::from_secs(1);
		let outcome = scan(
			&mut backend,
			&clock,
			&mut matcher,
			deadline,
			Duration::from_millis(10),
		)
		.unwrap();
		assert_eq!(outcome, Outcome::Matched(0));
		assert_eq!(payload, b"\r\n");

		// The rest of the stream is left for the next exchange.
		let mut matcher = Matcher::new(PatternSet::new(&["READY"]).unwrap(), &mut payload);
		let outcome = scan(
			&mut backend,
			&clock,
			&mut matcher,
			deadline,
			Duration::from_millis(10),
		)
		.unwrap();
		assert_eq!(outcome, Outcome::Matched(0));
		assert_eq!(payload, b"+CPIN: ");
		assert_eq!(clock.elapsed(), Duration::ZERO);
	}

	#[test]
	fn scan_times_out_without_spinning() {
		let clock = MockClock::new();
		let mut backend = Mock::with_clock(clock.clone());
		// A partial match must not extend the deadline.
		backend.append_data(b"\r\nO");
		let mut payload = Vec::new();
		let mut matcher = Matcher::new(PatternSet::new(&["OK\r\n"]).unwrap(), &mut payload);
		let start = clock.now();
		let outcome = scan(
			&mut backend,
			&clock,
			&mut matcher,
			start + Duration::from_secs(1),
			Duration::from_millis(10),
		)
		.unwrap();
		assert_eq!(outcome, Outcome::Timeout);
		assert!(clock.now() - start >= Duration::from_secs(1));
		// Three data reads plus one read per 10 ms poll.
		assert!(backend.read_count() <= 3 + 100);
	}

	#[test]
	fn scan_sleeps_on_would_block() {
		let clock = MockClock::new();
		let mut backend = Mock::with_clock(clock.clone());
		backend.set_nonblocking(true);
		let mut payload = Vec::new();
		let mut matcher = Matcher::new(PatternSet::new(&["OK\r\n"]).unwrap(), &mut payload);
		let start = clock.now();
		let outcome = scan(
			&mut backend,
			&clock,
			&mut matcher,
			start + Duration::from_millis(500),
			Duration::from_millis(20),
		)
		.unwrap();
		assert_eq!(outcome, Outcome::Timeout);
		assert_eq!(backend.read_count(), 25);
	}

	#[test]
	fn scan_keeps_timing_out_while_bytes_arrive() {
		let clock = MockClock::new();
		let mut backend = Mock::with_clock(clock.clone());
		for i in 0..200u64 {
			backend.append_data_after(Duration::from_millis(10 * i), b"noise ");
		}
		let mut payload = Vec::new();
		let mut matcher = Matcher::new(PatternSet::new(&["OK\r\n"]).unwrap(), &mut payload);
		let start = clock.now();
		let outcome = scan(
			&mut backend,
			&clock,
			&mut matcher,
			start + Duration::from_millis(500),
			Duration::from_millis(20),
		)
		.unwrap();
		assert_eq!(outcome, Outcome::Timeout);
		assert!(clock.now() - start < Duration::from_millis(520));
	}

	#[test]
	fn scan_reports_end_of_stream() {
		let clock = MockClock::new();
		let mut backend = Mock::with_clock(clock.clone());
		backend.append_data(b"\r\n+CSQ: 2");
		backend.close();
		let mut payload = Vec::new();
		let mut matcher = Matcher::new(PatternSet::new(&["OK\r\n"]).unwrap(), &mut payload);
		let err = scan(
			&mut backend,
			&clock,
			&mut matcher,
			clock.now() + Duration::from_secs(1),
			Duration::from_millis(10),
		)
		.unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
		assert_eq!(payload, b"\r\n+CSQ: 2");
		assert_eq!(clock.elapsed(), Duration::ZERO);
	}

	#[test]
	fn scan_with_a_past_deadline_reads_nothing() {
		let clock = MockClock::new();
		let mut backend = Mock::with_clock(clock.clone());
		backend.append_data(b"\r\nOK\r\n");
		let mut payload = Vec::new();
		let mut matcher = Matcher::new(PatternSet::new(&["OK\r\n"]).unwrap(), &mut payload);
		let outcome = scan(
			&mut backend,
			&clock,
			&mut matcher,
			clock.now(),
			Duration::from_millis(10),
		)
		.unwrap();
		assert_eq!(outcome, Outcome::Timeout);
		assert_eq!(backend.read_count(), 0);
		assert!(payload.is_empty());
	}

	#[test]
	fn scan_reports_transport_errors() {
		let clock = MockClock::new();
		let mut backend = Mock::with_clock(clock.clone());
		backend.read_error(Some(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")));
		let mut payload = Vec::new();
		let mut matcher = Matcher::new(PatternSet::new(&["OK\r\n"]).unwrap(), &mut payload);
		let err = scan(
			&mut backend,
			&clock,
			&mut matcher,
			clock.now() + Duration::from_secs(1),
			Duration::from_millis(10),
		)
		.unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
	}
}
