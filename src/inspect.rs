use std::fmt;

use crate::consts::*;
use crate::error::{Error, Result};
use crate::protocol::frame::{BatteryFrame, ImageFrame, SensorFrame};
use crate::types::{BatteryStatus, ImageChunk, SensorSnapshot};

/// A verified frame read from untyped input
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedFrame {
	Sensor(SensorSnapshot),
	Image(ImageChunk),
	Battery(BatteryStatus),
}

/// Identify a raw frame by its length, then verify checksum and type tag.
pub fn decode_frame(bytes: &[u8]) -> Result<DecodedFrame> {
	match bytes.len() {
		SENSOR_FRAME_SIZE => {
			let frame = SensorFrame::from_bytes(to_array(bytes)?)?;
			expect_tag(frame.type_tag(), CMD_SENSOR)?;
			Ok(DecodedFrame::Sensor(SensorSnapshot::from_frame(&frame)))
		}
		IMAGE_FRAME_SIZE => {
			let frame = ImageFrame::from_bytes(to_array(bytes)?)?;
			expect_tag(frame.type_tag(), CMD_IMAGE)?;
			Ok(DecodedFrame::Image(ImageChunk::from_frame(&frame)))
		}
		BATTERY_FRAME_SIZE => {
			let frame = BatteryFrame::from_bytes(to_array(bytes)?)?;
			Ok(DecodedFrame::Battery(BatteryStatus::from_frame(&frame)))
		}
		other => Err(Error::FrameLength(other)),
	}
}

fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
	bytes.try_into().map_err(|_| Error::FrameLength(bytes.len()))
}

fn expect_tag(tag: u8, expected: u8) -> Result<()> {
	if tag != expected {
		return Err(Error::UnrecognizedCommand(tag));
	}
	Ok(())
}

impl fmt::Display for DecodedFrame {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DecodedFrame::Sensor(s) => write!(f, "Sensor frame\n{s}"),
			DecodedFrame::Image(c) => write!(f, "Image frame\n{c}"),
			DecodedFrame::Battery(b) => write!(f, "Battery frame\n{b}"),
		}
	}
}
