//! Sensor sources feeding the snapshot producer

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::consts::SEA_LEVEL_PRESSURE;
use crate::types::SensorSnapshot;

const BARO_EXPONENT: f32 = 5.25588;
const BARO_COEFFICIENT: f32 = 2.25577e-5;

const LAUNCH_ALTITUDE: f32 = 120.0;
const BURST_ALTITUDE: f32 = 30_000.0;
const ASCENT_RATE: f32 = 5.0;
const DESCENT_RATE: f32 = 12.0;
const LAUNCH_LATITUDE: f32 = 40.0150;
const LAUNCH_LONGITUDE: f32 = -105.2705;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpsFix {
	pub satellites: u8,
	pub status: u8,
	pub mode: u8,
	pub latitude: f32,
	pub longitude: f32,
	pub altitude: f32,
	pub speed: f32,
	pub track: f32,
	pub climb: f32,
}

/// One reading from one source; each variant owns a disjoint set of
/// snapshot fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorReading {
	Gps(GpsFix),
	Orientation {
		heading: f32,
		pitch: f32,
		roll: f32,
	},
	Barometer {
		temperature: f32,
		pressure: f32,
		altitude: f32,
	},
	Climate {
		temperature: f32,
		humidity: f32,
	},
}

impl SensorReading {
	pub fn apply_to(&self, s: &mut SensorSnapshot) {
		match *self {
			SensorReading::Gps(fix) => {
				s.gps_satellites = fix.satellites;
				s.gps_status = fix.status;
				s.gps_mode = fix.mode;
				s.gps_latitude = fix.latitude;
				s.gps_longitude = fix.longitude;
				s.gps_altitude = fix.altitude;
				s.gps_speed = fix.speed;
				s.gps_track = fix.track;
				s.gps_climb = fix.climb;
			}
			SensorReading::Orientation {
				heading,
				pitch,
				roll,
			} => {
				s.heading = heading;
				s.pitch = pitch;
				s.roll = roll;
			}
			SensorReading::Barometer {
				temperature,
				pressure,
				altitude,
			} => {
				s.baro_temperature = temperature;
				s.baro_pressure = pressure;
				s.baro_altitude = altitude;
			}
			SensorReading::Climate {
				temperature,
				humidity,
			} => {
				s.climate_temperature = temperature;
				s.relative_humidity = humidity;
			}
		}
	}
}

pub trait SensorSource: Send {
	fn name(&self) -> &str;
	fn read(&mut self) -> Result<SensorReading>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
	Gps,
	Orientation,
	Barometer,
	Climate,
}

impl SourceKind {
	pub const ALL: [SourceKind; 4] = [
		SourceKind::Gps,
		SourceKind::Orientation,
		SourceKind::Barometer,
		SourceKind::Climate,
	];

	pub fn name(self) -> &'static str {
		match self {
			SourceKind::Gps => "gps",
			SourceKind::Orientation => "orientation",
			SourceKind::Barometer => "barometer",
			SourceKind::Climate => "climate",
		}
	}
}

/// Altitude in meters for a static pressure in hPa (international barometric
/// formula).
pub fn pressure_altitude(pressure: f32) -> f32 {
	(1.0 - (pressure / SEA_LEVEL_PRESSURE).powf(1.0 / BARO_EXPONENT)) / BARO_COEFFICIENT
}

/// Inverse of [`pressure_altitude`]
pub fn altitude_pressure(altitude: f32) -> f32 {
	SEA_LEVEL_PRESSURE * (1.0 - BARO_COEFFICIENT * altitude).max(0.0).powf(BARO_EXPONENT)
}

/// Balloon flight: steady ascent to burst, faster descent back to the launch
/// altitude.
#[derive(Debug, Clone, Copy)]
struct FlightProfile {
	elapsed: f32,
}

impl FlightProfile {
	fn burst_time() -> f32 {
		(BURST_ALTITUDE - LAUNCH_ALTITUDE) / ASCENT_RATE
	}

	fn altitude(&self) -> f32 {
		let burst = Self::burst_time();
		if self.elapsed <= burst {
			LAUNCH_ALTITUDE + ASCENT_RATE * self.elapsed
		} else {
			(BURST_ALTITUDE - DESCENT_RATE * (self.elapsed - burst)).max(LAUNCH_ALTITUDE)
		}
	}

	fn climb(&self) -> f32 {
		let burst = Self::burst_time();
		if self.elapsed <= burst {
			ASCENT_RATE
		} else if self.altitude() > LAUNCH_ALTITUDE {
			-DESCENT_RATE
		} else {
			0.0
		}
	}

	/// ISA temperature, clamped at the tropopause
	fn air_temperature(&self) -> f32 {
		(15.0 - 0.0065 * self.altitude()).max(-56.5)
	}
}

/// Synthetic source for bench runs and the loopback mode.
pub struct SimulatedSource {
	kind: SourceKind,
	profile: FlightProfile,
	step: f32,
}

impl SimulatedSource {
	pub fn new(kind: SourceKind, step: Duration) -> Self {
		SimulatedSource {
			kind,
			profile: FlightProfile { elapsed: 0.0 },
			step: step.as_secs_f32(),
		}
	}

	fn reading(&self) -> SensorReading {
		let t = self.profile.elapsed;
		let altitude = self.profile.altitude();
		match self.kind {
			SourceKind::Gps => {
				let drift = t * 2.5e-5;
				SensorReading::Gps(GpsFix {
					satellites: 9,
					status: 1,
					mode: 3,
					latitude: LAUNCH_LATITUDE + drift * 0.2,
					longitude: LAUNCH_LONGITUDE + drift,
					altitude,
					speed: 6.0 + (t * 0.01).sin() * 2.0,
					track: 78.0,
					climb: self.profile.climb(),
				})
			}
			SourceKind::Orientation => SensorReading::Orientation {
				heading: (t * 3.0) % 360.0,
				pitch: (t * 0.7).sin() * 8.0,
				roll: (t * 0.5).cos() * 12.0,
			},
			SourceKind::Barometer => {
				let pressure = altitude_pressure(altitude);
				SensorReading::Barometer {
					temperature: self.profile.air_temperature(),
					pressure,
					altitude: pressure_altitude(pressure),
				}
			}
			SourceKind::Climate => SensorReading::Climate {
				temperature: self.profile.air_temperature() + 4.0,
				humidity: (60.0 - altitude / 600.0).clamp(2.0, 100.0),
			},
		}
	}
}

impl SensorSource for SimulatedSource {
	fn name(&self) -> &str {
		self.kind.name()
	}

	fn read(&mut self) -> Result<SensorReading> {
		let reading = self.reading();
		self.profile.elapsed += self.step;
		Ok(reading)
	}
}

pub fn simulated_sources(kinds: &[SourceKind], step: Duration) -> Vec<Box<dyn SensorSource>> {
	kinds
		.iter()
		.map(|&kind| Box::new(SimulatedSource::new(kind, step)) as Box<dyn SensorSource>)
		.collect()
}
