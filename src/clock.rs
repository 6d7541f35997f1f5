//! Sources of monotonic time.
//!
//! Every wait performed by a [`Channel`](crate::Channel) is bounded by a
//! deadline computed from a [`Clock`]. Production code uses the [`SystemClock`];
//! tests substitute a [`MockClock`] so that waits lasting tens of seconds
//! complete instantly.

use std::time::{Duration, Instant};

/// A monotonic clock and sleep primitive.
pub trait Clock {
	/// The current monotonic time.
	fn now(&self) -> Instant;

	/// Block the calling thread for `duration`, letting other work proceed.
	fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
	fn now(&self) -> Instant {
		(**self).now()
	}
	fn sleep(&self, duration: Duration) {
		(**self).sleep(duration);
	}
}

/// The operating system's monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> Instant {
		Instant::now()
	}
	fn sleep(&self, duration: Duration) {
		std::thread::sleep(duration);
	}
}

/// A virtual clock for use in testing.
///
/// Time only moves when [`sleep`](Clock::sleep) or [`advance`](MockClock::advance)
/// is called. Clones share the same virtual time, so a clone can be handed
/// to a [`Mock`](crate::backend::Mock) backend to simulate bytes that arrive
/// later.
#[cfg(any(test, feature = "mock"))]
#[cfg_attr(all(doc, feature = "doc_cfg"), doc(cfg(feature = "mock")))]
#[derive(Debug, Clone)]
pub struct MockClock {
	origin: Instant,
	elapsed: std::sync::Arc<std::sync::Mutex<Duration>>,
}

#[cfg(any(test, feature = "mock"))]
impl MockClock {
	/// Create a new clock starting at zero elapsed time.
	pub fn new() -> Self {
		MockClock {
			origin: Instant::now(),
			elapsed: std::sync::Arc::default(),
		}
	}

	/// The virtual time that has passed since the clock was created.
	pub fn elapsed(&self) -> Duration {
		*self
			.elapsed
			.lock()
			.unwrap_or_else(std::sync::PoisonError::into_inner)
	}

	/// Move the virtual time forward.
	pub fn advance(&self, duration: Duration) {
		let mut elapsed = self
			.elapsed
			.lock()
			.unwrap_or_else(std::sync::PoisonError::into_inner);
		*elapsed += duration;
	}
}

#[cfg(any(test, feature = "mock"))]
impl Default for MockClock {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(any(test, feature = "mock"))]
impl Clock for MockClock {
	fn now(&self) -> Instant {
		self.origin + self.elapsed()
	}
	fn sleep(&self, duration: Duration) {
		self.advance(duration);
	}
}
