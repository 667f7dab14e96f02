//! Application configuration loaded from TOML
//!
//! Every field has a default, so an empty file (or no file at all) gives a
//! working setup against the first detected USB serial adapter.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{Error, Result};
use crate::protocol::link::LinkTiming;
use crate::sensors::SourceKind;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
	pub link: LinkConfig,
	pub timing: TimingConfig,
	pub image: ImageConfig,
	pub sensors: SensorsConfig,
	pub policy: PolicyConfig,
	pub logging: LoggingConfig,
}

/// Serial link to the co-processor
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LinkConfig {
	/// Serial device path; auto-detected when unset
	#[serde(skip_serializing_if = "Option::is_none")]
	pub port: Option<String>,
	pub baud_rate: u32,
	/// How long to wait for the reply to a single byte
	pub byte_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
	pub pacing_us: u64,
	pub retry_delay_us: u64,
	pub handshake_retries: u32,
	pub tick_ms: u64,
	pub sensor_period_ms: u64,
	pub image_period_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageConfig {
	/// File the camera writes each finished capture to
	pub capture_path: PathBuf,
	/// Program and arguments run before each capture poll
	#[serde(skip_serializing_if = "Option::is_none")]
	pub capture_command: Option<Vec<String>>,
	pub width: u32,
	pub height: u32,
	/// Crop to fill (true) or letterbox (false)
	pub crop: bool,
	pub chunk_size: usize,
	pub queue_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SensorsConfig {
	pub sources: Vec<SourceKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
	/// Put a snapshot that failed to send back into the slot if nothing newer
	/// has been published
	pub retry_failed_snapshot: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
	/// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
	pub level: String,
}

impl Default for LinkConfig {
	fn default() -> Self {
		Self {
			port: None,
			baud_rate: SERIAL_BAUD_RATE,
			byte_timeout_ms: BYTE_TIMEOUT.as_millis() as u64,
		}
	}
}

impl Default for TimingConfig {
	fn default() -> Self {
		Self {
			pacing_us: PACING_GAP.as_micros() as u64,
			retry_delay_us: RETRY_DELAY.as_micros() as u64,
			handshake_retries: HANDSHAKE_RETRIES,
			tick_ms: TICK_PERIOD.as_millis() as u64,
			sensor_period_ms: SENSOR_PERIOD.as_millis() as u64,
			image_period_ms: IMAGE_PERIOD.as_millis() as u64,
		}
	}
}

impl Default for ImageConfig {
	fn default() -> Self {
		Self {
			capture_path: PathBuf::from("images/thumbnail.png"),
			capture_command: None,
			width: THUMBNAIL_WIDTH,
			height: THUMBNAIL_HEIGHT,
			crop: true,
			chunk_size: DEFAULT_CHUNK_SIZE,
			queue_capacity: DEFAULT_QUEUE_CAPACITY,
		}
	}
}

impl Default for SensorsConfig {
	fn default() -> Self {
		Self {
			sources: SourceKind::ALL.to_vec(),
		}
	}
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
		}
	}
}

impl TimingConfig {
	pub fn link_timing(&self) -> LinkTiming {
		LinkTiming {
			pacing: Duration::from_micros(self.pacing_us),
			retry_delay: Duration::from_micros(self.retry_delay_us),
			handshake_retries: self.handshake_retries,
		}
	}

	pub fn tick(&self) -> Duration {
		Duration::from_millis(self.tick_ms)
	}

	pub fn sensor_period(&self) -> Duration {
		Duration::from_millis(self.sensor_period_ms)
	}

	pub fn image_period(&self) -> Duration {
		Duration::from_millis(self.image_period_ms)
	}
}

impl LinkConfig {
	pub fn byte_timeout(&self) -> Duration {
		Duration::from_millis(self.byte_timeout_ms)
	}
}

impl AppConfig {
	/// Load and validate a TOML file
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		let contents = fs::read_to_string(path)?;
		Self::from_toml(&contents)
	}

	pub fn from_toml(contents: &str) -> Result<Self> {
		let config: AppConfig = toml::from_str(contents)?;
		config.validate()?;
		Ok(config)
	}

	pub fn to_toml(&self) -> Result<String> {
		Ok(toml::to_string_pretty(self)?)
	}

	pub fn validate(&self) -> Result<()> {
		let invalid = |msg: String| Err(Error::InvalidConfig(msg));

		if !(1..=CHUNK_CAPACITY).contains(&self.image.chunk_size) {
			return invalid(format!(
				"image.chunk_size must be 1..={CHUNK_CAPACITY}, got {}",
				self.image.chunk_size
			));
		}
		for (name, value) in [("width", self.image.width), ("height", self.image.height)] {
			if value == 0 || value > u16::MAX as u32 {
				return invalid(format!("image.{name} must be 1..=65535, got {value}"));
			}
		}
		if self.image.queue_capacity == 0 {
			return invalid("image.queue_capacity must be at least 1".to_string());
		}
		let pixels = self.image.width as usize * self.image.height as usize;
		let chunks = pixels.div_ceil(self.image.chunk_size);
		if chunks > u16::MAX as usize {
			return invalid(format!(
				"image {}x{} at chunk_size {} needs {chunks} chunks, over the 16-bit chunk id",
				self.image.width, self.image.height, self.image.chunk_size
			));
		}
		if chunks > self.image.queue_capacity {
			return invalid(format!(
				"image {}x{} needs {chunks} chunks, image.queue_capacity is {}",
				self.image.width, self.image.height, self.image.queue_capacity
			));
		}
		if self.timing.handshake_retries == 0 {
			return invalid("timing.handshake_retries must be at least 1".to_string());
		}
		for (name, value) in [
			("tick_ms", self.timing.tick_ms),
			("sensor_period_ms", self.timing.sensor_period_ms),
			("image_period_ms", self.timing.image_period_ms),
		] {
			if value == 0 {
				return invalid(format!("timing.{name} must be positive"));
			}
		}
		if self.link.baud_rate == 0 {
			return invalid("link.baud_rate must be positive".to_string());
		}
		if matches!(&self.image.capture_command, Some(cmd) if cmd.is_empty()) {
			return invalid("image.capture_command must name a program".to_string());
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_config() {
		let config = AppConfig::default();
		assert_eq!(config.link.port, None);
		assert_eq!(config.link.baud_rate, 115200);
		assert_eq!(config.timing.handshake_retries, 4096);
		assert_eq!(config.timing.tick(), Duration::from_millis(90));
		assert_eq!(config.timing.sensor_period(), Duration::from_secs(1));
		assert_eq!(config.timing.image_period(), Duration::from_secs(100));
		assert_eq!(config.image.chunk_size, 80);
		assert_eq!(config.image.queue_capacity, 1024);
		assert_eq!(config.sensors.sources.len(), 4);
		assert!(!config.policy.retry_failed_snapshot);
		config.validate().unwrap();
	}

	#[test]
	fn test_link_timing_from_config() {
		let timing = TimingConfig::default().link_timing();
		assert_eq!(timing, LinkTiming::default());
	}

	#[test]
	fn test_toml_serialization() {
		let config = AppConfig::default();
		let toml_string = config.to_toml().unwrap();

		assert!(toml_string.contains("[link]"));
		assert!(toml_string.contains("[timing]"));
		assert!(toml_string.contains("[image]"));
		assert!(toml_string.contains("[policy]"));
		assert!(toml_string.contains("chunk_size = 80"));
		assert!(!toml_string.contains("port ="));

		let back = AppConfig::from_toml(&toml_string).unwrap();
		assert_eq!(back, config);
	}

	#[test]
	fn test_toml_deserialization() {
		let toml_content = r#"
[link]
port = "/dev/ttyAMA0"

[timing]
tick_ms = 50

[image]
capture_command = ["raspistill", "--nopreview", "-o", "images/thumbnail.png"]
width = 64
height = 48
chunk_size = 20
crop = false

[sensors]
sources = ["gps", "barometer"]

[policy]
retry_failed_snapshot = true

[logging]
level = "debug"
"#;

		let config = AppConfig::from_toml(toml_content).unwrap();
		assert_eq!(config.link.port.as_deref(), Some("/dev/ttyAMA0"));
		assert_eq!(config.link.baud_rate, 115200);
		assert_eq!(config.timing.tick_ms, 50);
		assert_eq!(config.timing.sensor_period_ms, 1000);
		assert_eq!(config.image.chunk_size, 20);
		assert!(!config.image.crop);
		assert_eq!(config.image.capture_command.as_ref().map(Vec::len), Some(4));
		assert_eq!(
			config.sensors.sources,
			vec![SourceKind::Gps, SourceKind::Barometer]
		);
		assert!(config.policy.retry_failed_snapshot);
		assert_eq!(config.logging.level, "debug");
	}

	#[test]
	fn test_out_of_range_rejected() {
		for bad in [
			"[image]\nchunk_size = 0",
			"[image]\nchunk_size = 81",
			"[image]\nwidth = 70000",
			"[image]\nqueue_capacity = 0",
			"[image]\nchunk_size = 20",
			"[image]\nchunk_size = 1",
			"[image]\nqueue_capacity = 959",
			"[timing]\nhandshake_retries = 0",
			"[timing]\ntick_ms = 0",
			"[image]\ncapture_command = []",
		] {
			assert!(
				matches!(AppConfig::from_toml(bad), Err(Error::InvalidConfig(_))),
				"{bad}"
			);
		}
	}

	#[test]
	fn test_queue_sized_for_one_image() {
		// 320x240 at 80 bytes per chunk is exactly 960 chunks
		let config = AppConfig::from_toml("[image]\nqueue_capacity = 960").unwrap();
		assert_eq!(config.image.queue_capacity, 960);

		// 3072 one-byte chunks fit a queue of 4096
		let small = "[image]\nwidth = 64\nheight = 48\nchunk_size = 1\nqueue_capacity = 4096";
		assert_eq!(AppConfig::from_toml(small).unwrap().image.chunk_size, 1);
	}

	#[test]
	fn test_unknown_source_is_parse_error() {
		let result = AppConfig::from_toml("[sensors]\nsources = [\"sonar\"]");
		assert!(matches!(result, Err(Error::Config(_))));
	}

	#[test]
	fn test_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("habpi.toml");
		fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();
		let config = AppConfig::from_file(&path).unwrap();
		assert_eq!(config.logging.level, "warn");
	}
}
