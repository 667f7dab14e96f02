//! Handshake and frame exchange with the co-processor

use std::thread;
use std::time::Duration;

use crate::consts::*;
use crate::coordination::CancellationToken;
use crate::error::{Error, Result};
use crate::protocol::frame::Frame;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
	Idle,
	Handshaking,
	Ready,
	Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
	Sensor,
	Image,
	Battery,
}

impl Command {
	pub fn code(self) -> u8 {
		match self {
			Command::Sensor => CMD_SENSOR,
			Command::Image => CMD_IMAGE,
			Command::Battery => CMD_BATTERY,
		}
	}
}

impl TryFrom<u8> for Command {
	type Error = Error;

	fn try_from(code: u8) -> Result<Self> {
		match code {
			CMD_SENSOR => Ok(Command::Sensor),
			CMD_IMAGE => Ok(Command::Image),
			CMD_BATTERY => Ok(Command::Battery),
			other => Err(Error::UnrecognizedCommand(other)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTiming {
	/// Gap between payload bytes
	pub pacing: Duration,
	/// Wait between failed handshake attempts
	pub retry_delay: Duration,
	pub handshake_retries: u32,
}

impl Default for LinkTiming {
	fn default() -> Self {
		LinkTiming {
			pacing: PACING_GAP,
			retry_delay: RETRY_DELAY,
			handshake_retries: HANDSHAKE_RETRIES,
		}
	}
}

/// One command exchange at a time over a byte transport.
///
/// Every exchange starts with a handshake (`STX`, command, `ENQ`, expect
/// `ACK`) and then either reads the battery frame or writes a sensor/image
/// frame followed by a status `ENQ`. Failures are reported, never retried.
pub struct Link<T: Transport> {
	transport: T,
	timing: LinkTiming,
	state: LinkState,
	cancel: CancellationToken,
}

fn pause(gap: Duration) {
	if !gap.is_zero() {
		thread::sleep(gap);
	}
}

impl<T: Transport> Link<T> {
	pub fn new(transport: T, timing: LinkTiming, cancel: CancellationToken) -> Self {
		Link {
			transport,
			timing,
			state: LinkState::Idle,
			cancel,
		}
	}

	#[cfg(test)]
	pub fn state(&self) -> LinkState {
		self.state
	}

	/// Run handshake attempts until the co-processor acknowledges.
	///
	/// Returns the number of attempts used.
	pub fn handshake(&mut self, command: Command) -> Result<u32> {
		if self.state == LinkState::Failed {
			log::debug!("Retrying link after failed exchange");
		}
		self.state = LinkState::Handshaking;
		let code = command.code();
		for attempt in 1..=self.timing.handshake_retries {
			if self.cancel.is_cancelled() {
				self.state = LinkState::Idle;
				return Err(Error::Cancelled);
			}
			let reply = self.guarded(|t| {
				t.transfer_byte(STX)?;
				t.transfer_byte(code)?;
				t.transfer_byte(ENQ)
			})?;
			log::trace!("Handshake {code:#04x} attempt {attempt}: reply {reply:#04x}");
			if reply == ACK {
				self.state = LinkState::Ready;
				return Ok(attempt);
			}
			pause(self.timing.retry_delay);
		}
		self.state = LinkState::Failed;
		Err(Error::HandshakeTimeout {
			command: code,
			attempts: self.timing.handshake_retries,
		})
	}

	/// Perform a complete exchange for `command`.
	///
	/// For the battery command `buf` is filled with the reply bytes; for sensor
	/// and image commands `buf` holds the serialized frame to write.
	pub fn exchange(&mut self, command: u8, buf: &mut [u8]) -> Result<()> {
		let command = Command::try_from(command)?;
		self.handshake(command)?;

		let pacing = self.timing.pacing;
		let result = match command {
			Command::Battery => self.guarded(|t| {
				for byte in buf.iter_mut() {
					*byte = t.transfer_byte(ENQ)?;
				}
				Ok(())
			}),
			Command::Sensor | Command::Image => self.guarded(|t| {
				if pacing.is_zero() {
					let mut replies = vec![0u8; buf.len()];
					t.transfer_bytes(&buf[..], &mut replies)?;
				} else {
					for &byte in buf.iter() {
						t.transfer_byte(byte)?;
						pause(pacing);
					}
				}
				let reply = t.transfer_byte(ENQ)?;
				if reply != ACK {
					return Err(Error::NotAcknowledged {
						command: command.code(),
						reply,
					});
				}
				Ok(())
			}),
		};

		if result.is_ok() {
			self.state = LinkState::Idle;
		}
		result
	}

	pub fn request_battery(&mut self) -> Result<[u8; BATTERY_FRAME_SIZE]> {
		let mut buf = [0u8; BATTERY_FRAME_SIZE];
		self.exchange(CMD_BATTERY, &mut buf)?;
		Ok(buf)
	}

	pub fn send_frame<const N: usize>(&mut self, command: Command, frame: &Frame<N>) -> Result<()> {
		log::trace!("Sending {command:?} frame, checksum {:#04x}", frame.checksum());
		let mut buf = *frame.as_bytes();
		self.exchange(command.code(), &mut buf)
	}

	/// Run transport I/O, moving to `Failed` on any error
	fn guarded<R>(&mut self, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
		let result = f(&mut self.transport);
		if result.is_err() {
			self.state = LinkState::Failed;
		}
		result
	}
}
