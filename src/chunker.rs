use crate::consts::CHUNK_CAPACITY;
use crate::error::{Error, Result};
use crate::types::{ImageChunk, Raster};

/// Split a raster into fixed-size chunks carrying full positional metadata.
///
/// Chunk `i` holds pixels `[i * chunk_size, (i + 1) * chunk_size)`; the tail
/// of the last chunk is zero.
pub fn partition(raster: &Raster, image_id: u16, chunk_size: usize) -> Result<Vec<ImageChunk>> {
	if !(1..=CHUNK_CAPACITY).contains(&chunk_size) {
		return Err(Error::InvalidImage(format!(
			"chunk size {chunk_size} outside 1..={CHUNK_CAPACITY}"
		)));
	}
	let total = raster.pixel_count();
	if total == 0 {
		return Err(Error::InvalidImage("empty raster".to_string()));
	}

	let total_chunks = total.div_ceil(chunk_size);
	let chunk_count = u16::try_from(total_chunks).map_err(|_| {
		Error::InvalidImage(format!(
			"{total_chunks} chunks of {chunk_size} bytes exceed the 16-bit chunk id"
		))
	})?;

	let chunks = raster
		.pixels
		.chunks(chunk_size)
		.enumerate()
		.map(|(i, data)| {
			let (width, height) = (raster.width, raster.height);
			let mut chunk = ImageChunk::new(image_id, i as u16, chunk_count, width, height);
			chunk.chunk_size = chunk_size as u8;
			chunk.payload[..data.len()].copy_from_slice(data);
			chunk
		})
		.collect();
	Ok(chunks)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::ImageAssembler;
	use rand::rngs::StdRng;
	use rand::{Rng, SeedableRng};

	fn gradient(width: u16, height: u16) -> Raster {
		let pixels = (0..width as usize * height as usize).map(|i| i as u8).collect();
		Raster::new(width, height, pixels).unwrap()
	}

	#[test]
	fn test_partition_sizes() {
		let raster = gradient(8, 8);
		let chunks = partition(&raster, 3, 20).unwrap();
		assert_eq!(chunks.len(), 4);

		for (i, chunk) in chunks.iter().enumerate() {
			assert_eq!(chunk.chunk_id as usize, i);
			assert_eq!(chunk.chunk_count, 4);
			assert_eq!(chunk.image_id, 3);
			assert_eq!((chunk.width, chunk.height), (8, 8));
			assert_eq!(chunk.chunk_size, 20);
		}
		assert_eq!(&chunks[3].payload[..4], &[60, 61, 62, 63]);
		assert!(chunks[3].payload[4..].iter().all(|&b| b == 0));
	}

	#[test]
	fn test_partition_reassembles_exactly() {
		let raster = gradient(8, 8);
		let mut assembler = ImageAssembler::new();
		let mut result = None;
		for chunk in partition(&raster, 0, 20).unwrap() {
			result = assembler.feed(&chunk).unwrap();
		}
		assert_eq!(result, Some(raster));
	}

	#[test]
	fn test_randomized_partition_covers_raster() {
		let mut rng = StdRng::seed_from_u64(0x4348_554e);
		for _ in 0..200 {
			let width = rng.gen_range(1..=80u16);
			let height = rng.gen_range(1..=80u16);
			let size = rng.gen_range(1..=CHUNK_CAPACITY);
			let total = width as usize * height as usize;
			let pixels: Vec<u8> = (0..total).map(|_| rng.gen()).collect();
			let raster = Raster::new(width, height, pixels).unwrap();

			let chunks = partition(&raster, 9, size).unwrap();
			let case = format!("{width}x{height} at {size}");
			assert_eq!(chunks.len(), total.div_ceil(size), "{case}");

			let mut assembler = ImageAssembler::new();
			let mut result = None;
			for (i, chunk) in chunks.iter().enumerate() {
				assert_eq!(chunk.chunk_id as usize, i, "{case}");
				assert_eq!(chunk.chunk_count as usize, chunks.len(), "{case}");
				let filled = size.min(total - i * size);
				assert_eq!(chunk.payload[..filled], raster.pixels[i * size..i * size + filled]);
				assert!(chunk.payload[filled..].iter().all(|&b| b == 0), "{case}");
				result = assembler.feed(chunk).unwrap();
			}
			assert_eq!(result.as_ref(), Some(&raster), "{case}");
		}
	}

	#[test]
	fn test_exact_multiple_has_no_padding_chunk() {
		let raster = gradient(10, 8);
		let chunks = partition(&raster, 0, 80).unwrap();
		assert_eq!(chunks.len(), 1);
		assert!(chunks[0].is_last());
	}

	#[test]
	fn test_invalid_inputs() {
		let raster = gradient(4, 4);
		assert!(partition(&raster, 0, 0).is_err());
		assert!(partition(&raster, 0, CHUNK_CAPACITY + 1).is_err());

		let empty = Raster::new(0, 0, Vec::new()).unwrap();
		assert!(partition(&empty, 0, 20).is_err());

		// 320x240 at one byte per chunk needs 76800 ids
		let large = Raster::new(320, 240, vec![0; 320 * 240]).unwrap();
		assert!(partition(&large, 0, 1).is_err());
	}
}
