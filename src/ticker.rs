use std::thread;
use std::time::{Duration, Instant};

use crate::consts::CANCEL_POLL;
use crate::coordination::CancellationToken;

/// Fixed-period deadline scheduler.
///
/// Sleeps until the next deadline in short slices so a cancellation is seen
/// promptly. When an iteration overruns the period, the schedule restarts
/// from now instead of firing a burst of catch-up ticks.
pub struct Ticker {
	period: Duration,
	next: Instant,
}

impl Ticker {
	pub fn new(period: Duration) -> Self {
		Ticker {
			period,
			next: Instant::now() + period,
		}
	}

	/// Block until the next deadline. Returns false once cancelled.
	pub fn wait(&mut self, cancel: &CancellationToken) -> bool {
		loop {
			if cancel.is_cancelled() {
				return false;
			}
			let now = Instant::now();
			if now >= self.next {
				break;
			}
			thread::sleep((self.next - now).min(CANCEL_POLL));
		}

		self.next += self.period;
		let now = Instant::now();
		if self.next < now {
			self.next = now + self.period;
		}
		true
	}
}
