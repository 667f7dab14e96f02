mod battery_status;
mod image_assembler;
mod image_chunk;
mod raster;
mod sensor_snapshot;

pub use battery_status::BatteryStatus;
pub use image_assembler::ImageAssembler;
pub use image_chunk::ImageChunk;
pub use raster::Raster;
pub use sensor_snapshot::SensorSnapshot;
