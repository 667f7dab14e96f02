use crate::error::{Error, Result};
use crate::types::{ImageChunk, Raster};

/// Rebuilds rasters from chunks on the receiving side of the link.
///
/// Chunks are placed by id, so arrival order does not matter. A chunk from a
/// different image id abandons the partial image. A repeated chunk id
/// overwrites its slot without counting twice.
pub struct ImageAssembler {
	image_id: Option<u16>,
	width: u16,
	height: u16,
	chunk_size: usize,
	buffer: Vec<u8>,
	received: Vec<bool>,
	unique: usize,
}

impl ImageAssembler {
	pub fn new() -> Self {
		Self {
			image_id: None,
			width: 0,
			height: 0,
			chunk_size: 0,
			buffer: Vec::new(),
			received: Vec::new(),
			unique: 0,
		}
	}

	pub fn feed(&mut self, chunk: &ImageChunk) -> Result<Option<Raster>> {
		if chunk.chunk_count == 0 || chunk.chunk_id >= chunk.chunk_count {
			return Err(Error::InvalidImage(format!(
				"chunk {} outside 0..{}",
				chunk.chunk_id, chunk.chunk_count
			)));
		}
		if chunk.chunk_size == 0 {
			return Err(Error::InvalidImage("zero chunk size".to_string()));
		}

		if self.image_id != Some(chunk.image_id) {
			if let Some(previous) = self.image_id {
				log::warn!(
					"Image {previous} abandoned with {}/{} chunks",
					self.unique,
					self.received.len()
				);
			}
			self.start(chunk);
		} else if chunk.chunk_count as usize != self.received.len()
			|| chunk.chunk_size as usize != self.chunk_size
			|| chunk.width != self.width
			|| chunk.height != self.height
		{
			return Err(Error::InvalidImage(format!(
				"chunk {} of image {} disagrees with earlier metadata",
				chunk.chunk_id, chunk.image_id
			)));
		}

		let id = chunk.chunk_id as usize;
		let offset = id * self.chunk_size;
		let data = chunk.data();
		self.buffer[offset..offset + data.len()].copy_from_slice(data);

		if self.received[id] {
			log::debug!("Duplicate chunk {id} of image {}", chunk.image_id);
		} else {
			self.received[id] = true;
			self.unique += 1;
		}

		if self.unique < self.received.len() {
			return Ok(None);
		}

		let mut pixels = std::mem::take(&mut self.buffer);
		let pixel_count = chunk.pixel_count();
		self.image_id = None;
		if pixels.len() < pixel_count {
			return Err(Error::InvalidImage(format!(
				"{} chunks carry {} bytes, image needs {pixel_count}",
				self.received.len(),
				pixels.len()
			)));
		}
		pixels.truncate(pixel_count);
		Raster::new(self.width, self.height, pixels).map(Some)
	}

	fn start(&mut self, chunk: &ImageChunk) {
		let count = chunk.chunk_count as usize;
		self.image_id = Some(chunk.image_id);
		self.width = chunk.width;
		self.height = chunk.height;
		self.chunk_size = chunk.chunk_size as usize;
		self.buffer = vec![0u8; count * self.chunk_size];
		self.received = vec![false; count];
		self.unique = 0;
	}
}
