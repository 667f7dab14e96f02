//! Error types for the link and codec layers

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Link error types
///
/// Every variant is recoverable from the scheduler's point of view: a failed
/// exchange drops the affected message and bumps a counter.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Serial port error
	#[error("Serial port error: {0}")]
	Serial(#[from] serialport::Error),

	/// I/O error on the underlying byte exchange
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// Recomputed checksum differs from the trailing frame byte
	#[error("Checksum error: expected {expected:#04x}, got {actual:#04x}")]
	ChecksumMismatch { expected: u8, actual: u8 },

	/// No acknowledgment within the handshake retry cap
	#[error("Handshake for command {command:#04x} failed after {attempts} attempts")]
	HandshakeTimeout { command: u8, attempts: u32 },

	/// Raw frame whose length matches no record shape
	#[error("No frame is {0} bytes long")]
	FrameLength(usize),

	/// Command code outside the protocol
	#[error("Unrecognized command: {0:#04x}")]
	UnrecognizedCommand(u8),

	/// Payload transferred but the trailing status request was not acknowledged
	#[error("Command {command:#04x} not acknowledged (reply {reply:#04x})")]
	NotAcknowledged { command: u8, reply: u8 },

	/// Shutdown requested while the link was busy
	#[error("Cancelled")]
	Cancelled,

	/// Image cannot be chunked or decoded into a raster
	#[error("Invalid image: {0}")]
	InvalidImage(String),

	/// Image decoding/encoding error
	#[error("Image error: {0}")]
	Image(#[from] image::ImageError),

	/// Configuration parse error
	#[error("Config error: {0}")]
	Config(#[from] toml::de::Error),

	/// Configuration serialization error
	#[error("Config serialize error: {0}")]
	ConfigSerialize(#[from] toml::ser::Error),

	/// Configuration value out of range
	#[error("Invalid config: {0}")]
	InvalidConfig(String),
}
