use crate::consts::{BATTERY_FRAME_SIZE, IMAGE_FRAME_SIZE, SENSOR_FRAME_SIZE};
use crate::error::{Error, Result};
use crate::protocol::checksum::checksum;

/// Fixed-length wire envelope: record bytes followed by one checksum byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<const N: usize> {
	buf: [u8; N],
}

pub type SensorFrame = Frame<SENSOR_FRAME_SIZE>;
pub type ImageFrame = Frame<IMAGE_FRAME_SIZE>;
pub type BatteryFrame = Frame<BATTERY_FRAME_SIZE>;

impl<const N: usize> Frame<N> {
	/// Build a frame from record bytes, computing the trailing checksum.
	pub fn seal(body: &[u8]) -> Self {
		let mut buf = [0u8; N];
		let len = body.len().min(N - 1);
		buf[..len].copy_from_slice(&body[..len]);
		buf[N - 1] = checksum(&buf[..N - 1]);
		Frame { buf }
	}

	/// Accept received bytes only if the trailing checksum matches.
	pub fn from_bytes(buf: [u8; N]) -> Result<Self> {
		let expected = checksum(&buf[..N - 1]);
		let actual = buf[N - 1];
		if expected != actual {
			return Err(Error::ChecksumMismatch { expected, actual });
		}
		Ok(Frame { buf })
	}

	pub fn as_bytes(&self) -> &[u8; N] {
		&self.buf
	}

	pub fn body(&self) -> &[u8] {
		&self.buf[..N - 1]
	}

	pub fn type_tag(&self) -> u8 {
		self.buf[0]
	}

	pub fn checksum(&self) -> u8 {
		self.buf[N - 1]
	}
}
