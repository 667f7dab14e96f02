use std::fmt;

use crate::consts::{CHUNK_CAPACITY, CMD_IMAGE, IMAGE_HEADER_SIZE, IMAGE_RECORD_SIZE};
use crate::protocol::frame::ImageFrame;

/// One fixed-size slice of an image plus its positional metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageChunk {
	pub msg_type: u8,
	pub chunk_size: u8,
	pub image_id: u16,
	pub chunk_id: u16,
	pub chunk_count: u16,
	pub width: u16,
	pub height: u16,
	pub payload: [u8; CHUNK_CAPACITY],
}

impl ImageChunk {
	pub fn new(image_id: u16, chunk_id: u16, chunk_count: u16, width: u16, height: u16) -> Self {
		Self {
			msg_type: CMD_IMAGE,
			chunk_size: CHUNK_CAPACITY as u8,
			image_id,
			chunk_id,
			chunk_count,
			width,
			height,
			payload: [0u8; CHUNK_CAPACITY],
		}
	}

	/// Payload bytes that carry pixels (padding included for the last chunk).
	pub fn data(&self) -> &[u8] {
		&self.payload[..(self.chunk_size as usize).min(CHUNK_CAPACITY)]
	}

	pub fn pixel_count(&self) -> usize {
		self.width as usize * self.height as usize
	}

	pub fn is_last(&self) -> bool {
		self.chunk_id + 1 >= self.chunk_count
	}

	pub fn to_bytes(&self) -> [u8; IMAGE_RECORD_SIZE] {
		let mut b = [0u8; IMAGE_RECORD_SIZE];
		let mut pos = 0;
		b[pos] = self.msg_type;
		pos += 1;
		b[pos] = self.chunk_size;
		pos += 1;
		for value in [self.image_id, self.chunk_id, self.chunk_count, self.width, self.height] {
			b[pos..pos + 2].copy_from_slice(&value.to_ne_bytes());
			pos += 2;
		}
		b[pos..pos + CHUNK_CAPACITY].copy_from_slice(&self.payload);
		b
	}

	pub fn from_bytes(b: &[u8; IMAGE_RECORD_SIZE]) -> Self {
		let u = |pos: usize| u16::from_ne_bytes([b[pos], b[pos + 1]]);
		let mut payload = [0u8; CHUNK_CAPACITY];
		payload.copy_from_slice(&b[IMAGE_HEADER_SIZE..]);
		Self {
			msg_type: b[0],
			chunk_size: b[1],
			image_id: u(2),
			chunk_id: u(4),
			chunk_count: u(6),
			width: u(8),
			height: u(10),
			payload,
		}
	}

	pub fn to_frame(&self) -> ImageFrame {
		ImageFrame::seal(&self.to_bytes())
	}

	pub fn from_frame(frame: &ImageFrame) -> Self {
		let mut record = [0u8; IMAGE_RECORD_SIZE];
		record.copy_from_slice(frame.body());
		Self::from_bytes(&record)
	}
}

impl fmt::Display for ImageChunk {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Type:                 {:#04x}", self.msg_type)?;
		writeln!(f, "Image id:             {}", self.image_id)?;
		writeln!(f, "Chunk:                {}/{}", self.chunk_id, self.chunk_count)?;
		writeln!(f, "Chunk size:           {}", self.chunk_size)?;
		writeln!(f, "Dimensions:           {}x{}", self.width, self.height)?;
		write!(f, "Payload:             ")?;
		for b in self.data().iter().take(16) {
			write!(f, " {b:02x}")?;
		}
		if self.data().len() > 16 {
			write!(f, " ...")?;
		}
		Ok(())
	}
}
