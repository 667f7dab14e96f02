use std::sync::{Arc, Mutex};

use super::Transport;
use crate::consts::*;
use crate::error::Result;
use crate::protocol::frame::{ImageFrame, SensorFrame};
use crate::types::{BatteryStatus, ImageAssembler, ImageChunk, Raster, SensorSnapshot};

/// Frame accepted by the simulated co-processor.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
	Sensor(SensorSnapshot),
	Image(ImageChunk),
}

/// In-process stand-in for the downstream co-processor.
///
/// Answers handshakes, serves battery frames, verifies incoming frames and
/// reassembles images. Clones share state, so a test can keep one handle while
/// the link owns another.
#[derive(Clone)]
pub struct LoopbackCoprocessor {
	inner: Arc<Mutex<CoprocessorState>>,
}

enum Phase {
	Idle,
	Command,
	Enquiry(u8),
	Reply { bytes: [u8; BATTERY_FRAME_SIZE], pos: usize },
	Payload { command: u8, bytes: Vec<u8>, expected: usize },
	Status { accepted: bool },
}

struct CoprocessorState {
	phase: Phase,
	battery: BatteryStatus,
	corrupt_battery: u32,
	busy_handshakes: u32,
	reject_payloads: u32,
	received: Vec<Received>,
	rejected: usize,
	assembler: ImageAssembler,
	images: Vec<Raster>,
}

impl LoopbackCoprocessor {
	pub fn new(battery: BatteryStatus) -> Self {
		LoopbackCoprocessor {
			inner: Arc::new(Mutex::new(CoprocessorState {
				phase: Phase::Idle,
				battery,
				corrupt_battery: 0,
				busy_handshakes: 0,
				reject_payloads: 0,
				received: Vec::new(),
				rejected: 0,
				assembler: ImageAssembler::new(),
				images: Vec::new(),
			})),
		}
	}

	fn state(&self) -> std::sync::MutexGuard<'_, CoprocessorState> {
		self.inner.lock().unwrap_or_else(|e| e.into_inner())
	}

	#[cfg(test)]
	/// Flip a bit in the next `count` battery frames
	pub fn corrupt_battery(&self, count: u32) {
		self.state().corrupt_battery = count;
	}

	#[cfg(test)]
	/// Refuse the next `count` handshake attempts
	pub fn stay_busy(&self, count: u32) {
		self.state().busy_handshakes = count;
	}

	#[cfg(test)]
	/// NAK the next `count` payloads regardless of checksum
	pub fn reject_payloads(&self, count: u32) {
		self.state().reject_payloads = count;
	}

	pub fn received(&self) -> Vec<Received> {
		self.state().received.clone()
	}

	pub fn rejected(&self) -> usize {
		self.state().rejected
	}

	/// Images fully reassembled so far
	pub fn images(&self) -> Vec<Raster> {
		self.state().images.clone()
	}
}

impl CoprocessorState {
	fn exchange(&mut self, rx: u8) -> u8 {
		match std::mem::replace(&mut self.phase, Phase::Idle) {
			Phase::Idle => {
				if rx == STX {
					self.phase = Phase::Command;
				}
				NUL
			}
			Phase::Command => {
				if matches!(rx, CMD_SENSOR | CMD_IMAGE | CMD_BATTERY) {
					self.phase = Phase::Enquiry(rx);
				}
				NUL
			}
			Phase::Enquiry(command) => {
				if rx != ENQ {
					return NAK;
				}
				if self.busy_handshakes > 0 {
					self.busy_handshakes -= 1;
					return NAK;
				}
				self.phase = match command {
					CMD_BATTERY => Phase::Reply {
						bytes: self.battery_frame(),
						pos: 0,
					},
					CMD_SENSOR => Phase::Payload {
						command,
						bytes: Vec::with_capacity(SENSOR_FRAME_SIZE),
						expected: SENSOR_FRAME_SIZE,
					},
					_ => Phase::Payload {
						command,
						bytes: Vec::with_capacity(IMAGE_FRAME_SIZE),
						expected: IMAGE_FRAME_SIZE,
					},
				};
				ACK
			}
			Phase::Reply { bytes, pos } => {
				let reply = bytes[pos];
				if pos + 1 < bytes.len() {
					self.phase = Phase::Reply { bytes, pos: pos + 1 };
				}
				reply
			}
			Phase::Payload {
				command,
				mut bytes,
				expected,
			} => {
				bytes.push(rx);
				if bytes.len() < expected {
					self.phase = Phase::Payload {
						command,
						bytes,
						expected,
					};
				} else {
					let accepted = self.accept(command, &bytes);
					self.phase = Phase::Status { accepted };
				}
				EOT
			}
			Phase::Status { accepted } => {
				if rx == ENQ && accepted {
					ACK
				} else {
					NAK
				}
			}
		}
	}

	fn battery_frame(&mut self) -> [u8; BATTERY_FRAME_SIZE] {
		let mut bytes = *self.battery.to_frame().as_bytes();
		if self.corrupt_battery > 0 {
			self.corrupt_battery -= 1;
			bytes[0] ^= 0x01;
		}
		bytes
	}

	fn accept(&mut self, command: u8, bytes: &[u8]) -> bool {
		if self.reject_payloads > 0 {
			self.reject_payloads -= 1;
			self.rejected += 1;
			return false;
		}
		let result = match command {
			CMD_SENSOR => <[u8; SENSOR_FRAME_SIZE]>::try_from(bytes).ok().map(|raw| {
				SensorFrame::from_bytes(raw)
					.map(|f| Received::Sensor(SensorSnapshot::from_frame(&f)))
			}),
			_ => <[u8; IMAGE_FRAME_SIZE]>::try_from(bytes).ok().map(|raw| {
				ImageFrame::from_bytes(raw).map(|f| Received::Image(ImageChunk::from_frame(&f)))
			}),
		};
		match result {
			Some(Ok(received)) => {
				if let Received::Image(chunk) = &received {
					match self.assembler.feed(chunk) {
						Ok(Some(raster)) => self.images.push(raster),
						Ok(None) => {}
						Err(e) => log::warn!("Loopback reassembly: {e}"),
					}
				}
				self.received.push(received);
				true
			}
			Some(Err(e)) => {
				log::warn!("Loopback rejected frame: {e}");
				self.rejected += 1;
				false
			}
			None => {
				self.rejected += 1;
				false
			}
		}
	}
}

impl Transport for LoopbackCoprocessor {
	fn transfer_byte(&mut self, tx: u8) -> Result<u8> {
		Ok(self.state().exchange(tx))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn handshake(dev: &mut LoopbackCoprocessor, command: u8) -> u8 {
		dev.transfer_byte(STX).unwrap();
		dev.transfer_byte(command).unwrap();
		dev.transfer_byte(ENQ).unwrap()
	}

	#[test]
	fn test_battery_served_after_handshake() {
		let battery = BatteryStatus {
			hub: 5.0,
			coprocessor: 7.2,
		};
		let mut dev = LoopbackCoprocessor::new(battery);
		assert_eq!(handshake(&mut dev, CMD_BATTERY), ACK);
		let mut rx = [0u8; BATTERY_FRAME_SIZE];
		dev.transfer_bytes(&[ENQ; BATTERY_FRAME_SIZE], &mut rx).unwrap();
		assert_eq!(&rx, battery.to_frame().as_bytes());
	}

	#[test]
	fn test_unknown_command_never_acked() {
		let mut dev = LoopbackCoprocessor::new(BatteryStatus::default());
		assert_ne!(handshake(&mut dev, 0x42), ACK);
	}

	#[test]
	fn test_corrupted_sensor_frame_nakked() {
		let mut dev = LoopbackCoprocessor::new(BatteryStatus::default());
		assert_eq!(handshake(&mut dev, CMD_SENSOR), ACK);
		let mut frame = *SensorSnapshot::default().to_frame().as_bytes();
		frame[10] ^= 0x40;
		for b in frame {
			assert_eq!(dev.transfer_byte(b).unwrap(), EOT);
		}
		assert_eq!(dev.transfer_byte(ENQ).unwrap(), NAK);
		assert_eq!(dev.rejected(), 1);
		assert!(dev.received().is_empty());
	}
}
