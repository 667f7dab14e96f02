use std::time::Duration;

pub const NUL: u8 = 0x00;
pub const STX: u8 = 0x02;
pub const EOT: u8 = 0x04;
pub const ENQ: u8 = 0x05;
pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;
pub const US: u8 = 0x1F;

pub const CMD_SENSOR: u8 = 0x60;
pub const CMD_IMAGE: u8 = 0x70;
pub const CMD_BATTERY: u8 = 0x90;

pub const CHUNK_CAPACITY: usize = 80;

pub const SENSOR_FLOAT_FIELDS: usize = 16;
pub const SENSOR_RECORD_SIZE: usize = 5 + SENSOR_FLOAT_FIELDS * 4;
pub const SENSOR_FRAME_SIZE: usize = SENSOR_RECORD_SIZE + 1;

pub const IMAGE_HEADER_SIZE: usize = 2 + 5 * 2;
pub const IMAGE_RECORD_SIZE: usize = IMAGE_HEADER_SIZE + CHUNK_CAPACITY;
pub const IMAGE_FRAME_SIZE: usize = IMAGE_RECORD_SIZE + 1;

pub const BATTERY_RECORD_SIZE: usize = 2 * 4;
pub const BATTERY_FRAME_SIZE: usize = BATTERY_RECORD_SIZE + 1;

pub const HANDSHAKE_RETRIES: u32 = 4096;
pub const PACING_GAP: Duration = Duration::from_micros(10);
pub const RETRY_DELAY: Duration = Duration::from_micros(10);
pub const SENSOR_PERIOD: Duration = Duration::from_secs(1);
pub const IMAGE_PERIOD: Duration = Duration::from_secs(100);
pub const TICK_PERIOD: Duration = Duration::from_millis(90);
pub const CANCEL_POLL: Duration = Duration::from_millis(50);

pub const SERIAL_BAUD_RATE: u32 = 115200;
pub const BYTE_TIMEOUT: Duration = Duration::from_millis(50);

pub const THUMBNAIL_WIDTH: u32 = 320;
pub const THUMBNAIL_HEIGHT: u32 = 240;
pub const DEFAULT_CHUNK_SIZE: usize = CHUNK_CAPACITY;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

pub const PROXIMITY_ALTITUDE: f32 = 250.0;
pub const SEA_LEVEL_PRESSURE: f32 = 1013.25;
