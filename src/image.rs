use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};

use crate::error::{Error, Result};
use crate::types::Raster;

const SUPPORTED: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// Load a captured image and reduce it to an 8-bit luma thumbnail.
pub fn load_raster(path: &Path, width: u32, height: u32, crop: bool) -> Result<Raster> {
	let ext = path
		.extension()
		.and_then(|e| e.to_str())
		.unwrap_or("")
		.to_lowercase();
	if !SUPPORTED.contains(&ext.as_str()) {
		return Err(Error::InvalidImage(format!("unsupported image format: {ext:?}")));
	}

	let img = image::open(path)?;
	to_raster(&img, width, height, crop)
}

pub fn to_raster(img: &DynamicImage, width: u32, height: u32, crop: bool) -> Result<Raster> {
	let (w, h) = match (u16::try_from(width), u16::try_from(height)) {
		(Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
		_ => {
			return Err(Error::InvalidImage(format!(
				"thumbnail size {width}x{height} out of range"
			)))
		}
	};
	let resized = resize_image(img, width, height, crop);
	Raster::new(w, h, resized.to_luma8().into_raw())
}

/// Write a raster as a grayscale image, format chosen by extension
pub fn save_raster(path: &Path, raster: &Raster) -> Result<()> {
	let img = GrayImage::from_raw(
		raster.width as u32,
		raster.height as u32,
		raster.pixels.clone(),
	)
	.ok_or_else(|| Error::InvalidImage("raster size does not match its pixels".to_string()))?;
	img.save(path)?;
	Ok(())
}

fn resize_image(img: &DynamicImage, target_w: u32, target_h: u32, crop: bool) -> DynamicImage {
	if img.width() == target_w && img.height() == target_h {
		return img.clone();
	}

	let src_w = img.width() as f64;
	let src_h = img.height() as f64;
	let target_aspect = target_w as f64 / target_h as f64;
	let src_aspect = src_w / src_h;

	if crop {
		let (crop_w, crop_h, crop_x, crop_y) = if src_aspect > target_aspect {
			let cw = src_h * target_aspect;
			(cw, src_h, (src_w - cw) / 2.0, 0.0)
		} else {
			let ch = src_w / target_aspect;
			(src_w, ch, 0.0, (src_h - ch) / 2.0)
		};

		let cropped = img.crop_imm(
			crop_x as u32,
			crop_y as u32,
			(crop_w as u32).max(1),
			(crop_h as u32).max(1),
		);
		cropped.resize_exact(target_w, target_h, FilterType::Lanczos3)
	} else {
		let fitted = img.resize(target_w, target_h, FilterType::Lanczos3).to_luma8();
		let mut canvas = GrayImage::new(target_w, target_h);
		let offset_x = (target_w - fitted.width()) / 2;
		let offset_y = (target_h - fitted.height()) / 2;
		image::imageops::overlay(&mut canvas, &fitted, offset_x as i64, offset_y as i64);
		DynamicImage::from(canvas)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::{Luma, Rgb, RgbImage};

	#[test]
	fn test_crop_fills_target() {
		let img = DynamicImage::from(RgbImage::from_pixel(64, 32, Rgb([255, 255, 255])));
		let raster = to_raster(&img, 16, 16, true).unwrap();
		assert_eq!((raster.width, raster.height), (16, 16));
		assert!(raster.pixels.iter().all(|&p| p > 250));
	}

	#[test]
	fn test_letterbox_pads_with_black() {
		let img = DynamicImage::from(RgbImage::from_pixel(64, 32, Rgb([255, 255, 255])));
		let raster = to_raster(&img, 16, 16, false).unwrap();
		// 64x32 fits as 16x8, centered with 4 black rows above and below
		assert_eq!(raster.pixels[0], 0);
		assert_eq!(raster.pixels[15 * 16], 0);
		assert!(raster.pixels[8 * 16 + 8] > 250);
	}

	#[test]
	fn test_zero_size_rejected() {
		let img = DynamicImage::from(RgbImage::new(4, 4));
		assert!(to_raster(&img, 0, 4, true).is_err());
	}

	#[test]
	fn test_save_and_reload() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("echo.png");
		let pixels: Vec<u8> = (0..64).map(|i| (i * 4) as u8).collect();
		let raster = Raster::new(8, 8, pixels).unwrap();
		save_raster(&path, &raster).unwrap();

		let back = load_raster(&path, 8, 8, true).unwrap();
		assert_eq!(back, raster);
		let decoded = image::open(&path).unwrap().to_luma8();
		assert_eq!(decoded.get_pixel(1, 0), &Luma([4u8]));
	}

	#[test]
	fn test_unsupported_extension() {
		let result = load_raster(Path::new("capture.tiff"), 8, 8, true);
		assert!(matches!(result, Err(Error::InvalidImage(_))));
	}
}
