use crate::error::{Error, Result};

/// Single-channel image, one byte per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
	pub width: u16,
	pub height: u16,
	pub pixels: Vec<u8>,
}

impl Raster {
	pub fn new(width: u16, height: u16, pixels: Vec<u8>) -> Result<Self> {
		let expected = width as usize * height as usize;
		if pixels.len() != expected {
			return Err(Error::InvalidImage(format!(
				"{}x{} raster needs {expected} bytes, got {}",
				width,
				height,
				pixels.len()
			)));
		}
		Ok(Self {
			width,
			height,
			pixels,
		})
	}

	pub fn pixel_count(&self) -> usize {
		self.pixels.len()
	}
}
