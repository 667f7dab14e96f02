//! Shared state between the producer threads and the scheduler

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::protocol::frame::SensorFrame;
use crate::types::BatteryStatus;

/// Cooperative shutdown flag, checked once per loop iteration and once per
/// handshake attempt.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}

/// Latest serialized sensor frame awaiting transmission.
///
/// Holds at most one frame: publishing replaces whatever the scheduler has not
/// taken yet.
#[derive(Default)]
pub struct SensorSlot {
	frame: Mutex<Option<SensorFrame>>,
}

impl SensorSlot {
	/// Store a frame, returning true when an unsent frame was replaced
	pub fn publish(&self, frame: SensorFrame) -> bool {
		let mut slot = self.frame.lock().unwrap_or_else(|e| e.into_inner());
		slot.replace(frame).is_some()
	}

	pub fn take(&self) -> Option<SensorFrame> {
		self.frame.lock().unwrap_or_else(|e| e.into_inner()).take()
	}

	/// Put a frame back unless the producer already published a newer one
	pub fn restore(&self, frame: SensorFrame) {
		let mut slot = self.frame.lock().unwrap_or_else(|e| e.into_inner());
		if slot.is_none() {
			*slot = Some(frame);
		}
	}

	#[cfg(test)]
	pub fn is_ready(&self) -> bool {
		self.frame.lock().unwrap_or_else(|e| e.into_inner()).is_some()
	}
}

#[derive(Debug, Default)]
pub struct LinkStats {
	pub sensor_published: AtomicU64,
	pub sensor_overwritten: AtomicU64,
	pub sensor_ack: AtomicU64,
	pub sensor_nak: AtomicU64,
	pub images_captured: AtomicU64,
	pub image_chunks_queued: AtomicU64,
	pub image_ack: AtomicU64,
	pub image_nak: AtomicU64,
	pub battery_ok: AtomicU64,
	pub battery_checksum_errors: AtomicU64,
	pub battery_failures: AtomicU64,
}

/// Point-in-time copy of [`LinkStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
	pub sensor_published: u64,
	pub sensor_overwritten: u64,
	pub sensor_ack: u64,
	pub sensor_nak: u64,
	pub images_captured: u64,
	pub image_chunks_queued: u64,
	pub image_ack: u64,
	pub image_nak: u64,
	pub battery_ok: u64,
	pub battery_checksum_errors: u64,
	pub battery_failures: u64,
}

impl LinkStats {
	pub fn bump(counter: &AtomicU64) {
		counter.fetch_add(1, Ordering::Relaxed);
	}

	pub fn snapshot(&self) -> StatsSnapshot {
		let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
		StatsSnapshot {
			sensor_published: get(&self.sensor_published),
			sensor_overwritten: get(&self.sensor_overwritten),
			sensor_ack: get(&self.sensor_ack),
			sensor_nak: get(&self.sensor_nak),
			images_captured: get(&self.images_captured),
			image_chunks_queued: get(&self.image_chunks_queued),
			image_ack: get(&self.image_ack),
			image_nak: get(&self.image_nak),
			battery_ok: get(&self.battery_ok),
			battery_checksum_errors: get(&self.battery_checksum_errors),
			battery_failures: get(&self.battery_failures),
		}
	}
}

impl fmt::Display for StatsSnapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Sensor snapshots built:   {}", self.sensor_published)?;
		writeln!(f, "Sensor snapshots dropped: {}", self.sensor_overwritten)?;
		writeln!(f, "Sensor messages ACK:      {}", self.sensor_ack)?;
		writeln!(f, "Sensor messages NAK:      {}", self.sensor_nak)?;
		writeln!(f, "Images captured:          {}", self.images_captured)?;
		writeln!(f, "Image chunks queued:      {}", self.image_chunks_queued)?;
		writeln!(f, "Image messages ACK:       {}", self.image_ack)?;
		writeln!(f, "Image messages NAK:       {}", self.image_nak)?;
		writeln!(f, "Battery polls OK:         {}", self.battery_ok)?;
		writeln!(f, "Battery checksum errors:  {}", self.battery_checksum_errors)?;
		write!(f, "Battery poll failures:    {}", self.battery_failures)
	}
}

/// Everything the three loops share, passed around as `Arc<Coordination>`.
#[derive(Default)]
pub struct Coordination {
	pub cancel: CancellationToken,
	pub sensor: SensorSlot,
	/// Set by the image producer once all chunks of an image are queued,
	/// cleared by the scheduler when the queue drains.
	pub image_ready: AtomicBool,
	pub stats: LinkStats,
	battery: Mutex<BatteryStatus>,
}

impl Coordination {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn image_in_progress(&self) -> bool {
		self.image_ready.load(Ordering::Acquire)
	}

	pub fn set_image_in_progress(&self, value: bool) {
		self.image_ready.store(value, Ordering::Release);
	}

	pub fn battery(&self) -> BatteryStatus {
		*self.battery.lock().unwrap_or_else(|e| e.into_inner())
	}

	pub fn set_battery(&self, status: BatteryStatus) {
		*self.battery.lock().unwrap_or_else(|e| e.into_inner()) = status;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::SensorSnapshot;

	#[test]
	fn test_publish_overwrites_unsent_frame() {
		let slot = SensorSlot::default();
		let first = SensorSnapshot::default().to_frame();
		let second = SensorSnapshot {
			gps_altitude: 120.0,
			..Default::default()
		}
		.to_frame();
		assert!(!slot.publish(first));
		assert!(slot.publish(second.clone()));
		assert_eq!(slot.take(), Some(second));
		assert!(!slot.is_ready());
	}

	#[test]
	fn test_restore_keeps_newer_frame() {
		let slot = SensorSlot::default();
		let old = SensorSnapshot::default().to_frame();
		let newer = SensorSnapshot {
			gps_altitude: 5.0,
			..Default::default()
		}
		.to_frame();
		slot.publish(newer.clone());
		slot.restore(old.clone());
		assert_eq!(slot.take(), Some(newer));
		slot.restore(old.clone());
		assert_eq!(slot.take(), Some(old));
	}

	#[test]
	fn test_cancellation_shared_between_clones() {
		let token = CancellationToken::new();
		let other = token.clone();
		assert!(!other.is_cancelled());
		token.cancel();
		assert!(other.is_cancelled());
	}
}
