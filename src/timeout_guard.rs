//! A "scope guard" that will reset a channel's default response timeout when it goes out of scope.

use crate::{backend::Backend, channel::Channel, clock::Clock};
use std::time::Duration;

/// A "scope guard" that will update the channel's default response timeout
/// and then reset it when it goes out of scope.
///
/// To create a guard, use the channel's [`timeout_guard`](Channel::timeout_guard) method.
///
/// While the guard is in scope, the channel can only be accessed through the guard.
/// However, because the guard implements [`Deref`](std::ops::Deref) and
/// [`DerefMut`](std::ops::DerefMut) callers can treat the guard as the channel.
#[derive(Debug)]
pub struct TimeoutGuard<'a, B: Backend, C: Clock> {
	/// The underlying channel.
	channel: &'a mut Channel<B, C>,
	/// The original timeout that will be restored when the guard is dropped.
	original_timeout: Duration,
}

impl<'a, B: Backend, C: Clock> TimeoutGuard<'a, B, C> {
	/// Update the channel's default timeout and return a [`TimeoutGuard`] wrapping the channel.
	pub(crate) fn new(channel: &'a mut Channel<B, C>, timeout: Duration) -> Self {
		let original_timeout = channel.set_default_timeout(timeout);
		TimeoutGuard {
			channel,
			original_timeout,
		}
	}
}

impl<B: Backend, C: Clock> std::ops::Deref for TimeoutGuard<'_, B, C> {
	type Target = Channel<B, C>;
	/// Get a shared reference to the underlying channel.
	fn deref(&self) -> &Self::Target {
		self.channel
	}
}

impl<B: Backend, C: Clock> std::ops::DerefMut for TimeoutGuard<'_, B, C> {
	/// Get an exclusive reference to the underlying channel.
	fn deref_mut(&mut self) -> &mut Self::Target {
		self.channel
	}
}

impl<B: Backend, C: Clock> std::ops::Drop for TimeoutGuard<'_, B, C> {
	fn drop(&mut self) {
		self.channel.set_default_timeout(self.original_timeout);
	}
}
