use std::fmt;

use crate::consts::BATTERY_RECORD_SIZE;
use crate::protocol::frame::BatteryFrame;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatteryStatus {
	pub hub: f32,
	pub coprocessor: f32,
}

impl BatteryStatus {
	pub fn to_bytes(&self) -> [u8; BATTERY_RECORD_SIZE] {
		let mut b = [0u8; BATTERY_RECORD_SIZE];
		b[..4].copy_from_slice(&self.hub.to_ne_bytes());
		b[4..].copy_from_slice(&self.coprocessor.to_ne_bytes());
		b
	}

	pub fn from_bytes(b: &[u8; BATTERY_RECORD_SIZE]) -> Self {
		Self {
			hub: f32::from_ne_bytes([b[0], b[1], b[2], b[3]]),
			coprocessor: f32::from_ne_bytes([b[4], b[5], b[6], b[7]]),
		}
	}

	pub fn to_frame(&self) -> BatteryFrame {
		BatteryFrame::seal(&self.to_bytes())
	}

	pub fn from_frame(frame: &BatteryFrame) -> Self {
		let mut record = [0u8; BATTERY_RECORD_SIZE];
		record.copy_from_slice(frame.body());
		Self::from_bytes(&record)
	}
}

impl fmt::Display for BatteryStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Hub battery:          {:.2} V", self.hub)?;
		write!(f, "Co-processor battery: {:.2} V", self.coprocessor)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::consts::BATTERY_FRAME_SIZE;

	#[test]
	fn test_frame_is_nine_bytes() {
		let frame = BatteryStatus { hub: 4.98, coprocessor: 7.4 }.to_frame();
		assert_eq!(frame.as_bytes().len(), BATTERY_FRAME_SIZE);
		assert_eq!(BATTERY_FRAME_SIZE, 9);
	}

	#[test]
	fn test_round_trip() {
		let status = BatteryStatus { hub: 4.98, coprocessor: 7.4 };
		assert_eq!(BatteryStatus::from_frame(&status.to_frame()), status);
	}
}
