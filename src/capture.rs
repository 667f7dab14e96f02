//! Image capture collaborator for the image producer

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::config::ImageConfig;
use crate::image::load_raster;
use crate::types::Raster;

/// Source of finished images. `Ok(None)` means no new image since the last
/// call.
pub trait CaptureSource: Send {
	fn acquire(&mut self) -> Result<Option<Raster>>;
}

/// Watches the file a camera writes to, optionally running the capture
/// program first.
pub struct FileCapture {
	path: PathBuf,
	command: Option<Vec<String>>,
	width: u32,
	height: u32,
	crop: bool,
	last_fingerprint: Option<u32>,
}

/// CRC32 over path, modification time and size
fn file_fingerprint(path: &Path) -> Result<u32> {
	let mut hasher = crc32fast::Hasher::new();
	hasher.update(path.to_string_lossy().as_bytes());
	let meta = std::fs::metadata(path)?;
	let modified = meta
		.modified()?
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default();
	hasher.update(&modified.as_secs().to_le_bytes());
	hasher.update(&modified.subsec_nanos().to_le_bytes());
	hasher.update(&meta.len().to_le_bytes());
	Ok(hasher.finalize())
}

impl FileCapture {
	pub fn new(config: &ImageConfig) -> Self {
		FileCapture {
			path: config.capture_path.clone(),
			command: config.capture_command.clone(),
			width: config.width,
			height: config.height,
			crop: config.crop,
			last_fingerprint: None,
		}
	}

	fn run_command(&self) -> Result<()> {
		let Some((program, args)) = self.command.as_ref().and_then(|c| c.split_first()) else {
			return Ok(());
		};
		log::debug!("Running capture command: {program} {}", args.join(" "));
		let status = Command::new(program)
			.args(args)
			.status()
			.with_context(|| format!("failed to start capture command {program}"))?;
		if !status.success() {
			bail!("capture command {program} exited with {status}");
		}
		Ok(())
	}
}

impl CaptureSource for FileCapture {
	fn acquire(&mut self) -> Result<Option<Raster>> {
		self.run_command()?;

		if !self.path.exists() {
			log::debug!("No capture at {}", self.path.display());
			return Ok(None);
		}
		let fingerprint = file_fingerprint(&self.path)?;
		if self.last_fingerprint == Some(fingerprint) {
			return Ok(None);
		}

		let raster = load_raster(&self.path, self.width, self.height, self.crop)
			.with_context(|| format!("failed to load {}", self.path.display()))?;
		self.last_fingerprint = Some(fingerprint);
		Ok(Some(raster))
	}
}
