use std::fmt;

use crate::consts::{CMD_SENSOR, NUL, SENSOR_FLOAT_FIELDS, SENSOR_RECORD_SIZE};
use crate::protocol::frame::SensorFrame;

const FLOAT_OFFSET: usize = 5;

/// Current sensor state, overwritten in place every producer cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
	pub msg_type: u8,
	pub proximity: u8,

	pub gps_satellites: u8,
	pub gps_status: u8,
	pub gps_mode: u8,
	pub gps_latitude: f32,
	pub gps_longitude: f32,
	pub gps_altitude: f32,
	pub gps_speed: f32,
	pub gps_track: f32,
	pub gps_climb: f32,

	pub heading: f32,
	pub pitch: f32,
	pub roll: f32,

	pub baro_temperature: f32,
	pub baro_pressure: f32,
	pub baro_altitude: f32,

	pub climate_temperature: f32,
	pub relative_humidity: f32,

	pub battery_hub: f32,
	pub battery_coprocessor: f32,
}

impl Default for SensorSnapshot {
	fn default() -> Self {
		Self {
			msg_type: CMD_SENSOR,
			proximity: NUL,
			gps_satellites: 0,
			gps_status: 0,
			gps_mode: 0,
			gps_latitude: 0.0,
			gps_longitude: 0.0,
			gps_altitude: 0.0,
			gps_speed: 0.0,
			gps_track: 0.0,
			gps_climb: 0.0,
			heading: 0.0,
			pitch: 0.0,
			roll: 0.0,
			baro_temperature: 0.0,
			baro_pressure: 0.0,
			baro_altitude: 0.0,
			climate_temperature: 0.0,
			relative_humidity: 0.0,
			battery_hub: 0.0,
			battery_coprocessor: 0.0,
		}
	}
}

impl SensorSnapshot {
	fn floats(&self) -> [f32; SENSOR_FLOAT_FIELDS] {
		[
			self.gps_latitude,
			self.gps_longitude,
			self.gps_altitude,
			self.gps_speed,
			self.gps_track,
			self.gps_climb,
			self.heading,
			self.pitch,
			self.roll,
			self.baro_temperature,
			self.baro_pressure,
			self.baro_altitude,
			self.climate_temperature,
			self.relative_humidity,
			self.battery_hub,
			self.battery_coprocessor,
		]
	}

	pub fn to_bytes(&self) -> [u8; SENSOR_RECORD_SIZE] {
		let mut b = [0u8; SENSOR_RECORD_SIZE];
		b[0] = self.msg_type;
		b[1] = self.proximity;
		b[2] = self.gps_satellites;
		b[3] = self.gps_status;
		b[4] = self.gps_mode;
		for (i, value) in self.floats().iter().enumerate() {
			let pos = FLOAT_OFFSET + i * 4;
			b[pos..pos + 4].copy_from_slice(&value.to_ne_bytes());
		}
		b
	}

	pub fn from_bytes(b: &[u8; SENSOR_RECORD_SIZE]) -> Self {
		let f = |i: usize| {
			let pos = FLOAT_OFFSET + i * 4;
			f32::from_ne_bytes([b[pos], b[pos + 1], b[pos + 2], b[pos + 3]])
		};
		Self {
			msg_type: b[0],
			proximity: b[1],
			gps_satellites: b[2],
			gps_status: b[3],
			gps_mode: b[4],
			gps_latitude: f(0),
			gps_longitude: f(1),
			gps_altitude: f(2),
			gps_speed: f(3),
			gps_track: f(4),
			gps_climb: f(5),
			heading: f(6),
			pitch: f(7),
			roll: f(8),
			baro_temperature: f(9),
			baro_pressure: f(10),
			baro_altitude: f(11),
			climate_temperature: f(12),
			relative_humidity: f(13),
			battery_hub: f(14),
			battery_coprocessor: f(15),
		}
	}

	pub fn to_frame(&self) -> SensorFrame {
		SensorFrame::seal(&self.to_bytes())
	}

	pub fn from_frame(frame: &SensorFrame) -> Self {
		let mut record = [0u8; SENSOR_RECORD_SIZE];
		record.copy_from_slice(frame.body());
		Self::from_bytes(&record)
	}
}

impl fmt::Display for SensorSnapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Type:                 {:#04x}", self.msg_type)?;
		writeln!(f, "Proximity:            {:#04x}", self.proximity)?;
		writeln!(f, "GPS")?;
		writeln!(f, "  satellites:         {}", self.gps_satellites)?;
		writeln!(f, "  status:             {}", self.gps_status)?;
		writeln!(f, "  mode:               {}", self.gps_mode)?;
		writeln!(f, "  lat, lon:           {:.6}, {:.6}", self.gps_latitude, self.gps_longitude)?;
		writeln!(f, "  altitude:           {:.1} m", self.gps_altitude)?;
		writeln!(f, "  speed:              {:.2} m/s", self.gps_speed)?;
		writeln!(f, "  track:              {:.1}\u{00b0}", self.gps_track)?;
		writeln!(f, "  climb:              {:.2} m/s", self.gps_climb)?;
		writeln!(f, "Orientation")?;
		writeln!(f, "  heading:            {:.1}\u{00b0}", self.heading)?;
		writeln!(f, "  pitch:              {:.1}\u{00b0}", self.pitch)?;
		writeln!(f, "  roll:               {:.1}\u{00b0}", self.roll)?;
		writeln!(f, "Barometer")?;
		writeln!(f, "  temperature:        {:.2} C", self.baro_temperature)?;
		writeln!(f, "  pressure:           {:.2} hPa", self.baro_pressure)?;
		writeln!(f, "  altitude:           {:.1} m", self.baro_altitude)?;
		writeln!(f, "Climate")?;
		writeln!(f, "  temperature:        {:.2} C", self.climate_temperature)?;
		writeln!(f, "  humidity:           {:.1} %", self.relative_humidity)?;
		writeln!(f, "Battery")?;
		writeln!(f, "  hub:                {:.2} V", self.battery_hub)?;
		write!(f, "  co-processor:       {:.2} V", self.battery_coprocessor)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::rngs::StdRng;
	use rand::{Rng, SeedableRng};

	fn random_snapshot(rng: &mut StdRng) -> SensorSnapshot {
		SensorSnapshot {
			msg_type: CMD_SENSOR,
			proximity: if rng.gen_bool(0.5) { crate::consts::US } else { NUL },
			gps_satellites: rng.gen_range(0..24),
			gps_status: rng.gen_range(0..3),
			gps_mode: rng.gen_range(0..4),
			gps_latitude: rng.gen_range(-90.0..90.0),
			gps_longitude: rng.gen_range(-180.0..180.0),
			gps_altitude: rng.gen_range(-100.0..40_000.0),
			gps_speed: rng.gen_range(0.0..80.0),
			gps_track: rng.gen_range(0.0..360.0),
			gps_climb: rng.gen_range(-60.0..10.0),
			heading: rng.gen_range(0.0..360.0),
			pitch: rng.gen_range(-90.0..90.0),
			roll: rng.gen_range(-180.0..180.0),
			baro_temperature: rng.gen_range(-70.0..45.0),
			baro_pressure: rng.gen_range(2.0..1050.0),
			baro_altitude: rng.gen_range(-100.0..40_000.0),
			climate_temperature: rng.gen_range(-70.0..45.0),
			relative_humidity: rng.gen_range(0.0..100.0),
			battery_hub: rng.gen_range(3.0..5.5),
			battery_coprocessor: rng.gen_range(3.0..9.0),
		}
	}

	#[test]
	fn test_record_size() {
		assert_eq!(SENSOR_RECORD_SIZE, 69);
		assert_eq!(crate::consts::SENSOR_FRAME_SIZE, 70);
	}

	#[test]
	fn test_randomized_round_trip() {
		let mut rng = StdRng::seed_from_u64(0x4841_4250);
		for _ in 0..500 {
			let snapshot = random_snapshot(&mut rng);
			assert_eq!(SensorSnapshot::from_bytes(&snapshot.to_bytes()), snapshot);
			assert_eq!(SensorSnapshot::from_frame(&snapshot.to_frame()), snapshot);
		}
	}

	#[test]
	fn test_field_order_on_wire() {
		let snapshot = SensorSnapshot {
			proximity: crate::consts::US,
			gps_satellites: 7,
			gps_latitude: 1.5,
			battery_coprocessor: -2.25,
			..Default::default()
		};
		let b = snapshot.to_bytes();
		assert_eq!(b[0], CMD_SENSOR);
		assert_eq!(b[1], crate::consts::US);
		assert_eq!(b[2], 7);
		assert_eq!(&b[5..9], &1.5f32.to_ne_bytes());
		assert_eq!(&b[65..69], &(-2.25f32).to_ne_bytes());
	}

	#[test]
	fn test_dump_is_labeled() {
		let text = SensorSnapshot::default().to_string();
		assert!(text.starts_with("Type:                 0x60"));
		assert!(text.contains("pressure:"));
		assert!(text.contains("co-processor:"));
	}
}
