use std::io::{Read, Write};
use std::time::Duration;

use anyhow::{bail, Result as AnyResult};

use super::Transport;
use crate::error::Result;

/// Co-processor attached through a UART or USB serial adapter.
///
/// The co-processor answers every received byte with one status byte, which
/// gives the same full-duplex exchange as a bus transfer.
pub struct SerialTransport {
	port: Box<dyn serialport::SerialPort>,
}

/// First USB serial adapter on the system.
pub fn detect_port() -> AnyResult<String> {
	let ports = serialport::available_ports()?;
	for p in &ports {
		if let serialport::SerialPortType::UsbPort(usb) = &p.port_type {
			log::info!(
				"Using {} (VID:{:#06x} PID:{:#06x})",
				p.port_name,
				usb.vid,
				usb.pid
			);
			return Ok(p.port_name.clone());
		}
	}
	bail!("no USB serial adapter found. Is the co-processor plugged in? (use --port)")
}

impl SerialTransport {
	pub fn open(path: &str, baud_rate: u32, byte_timeout: Duration) -> Result<Self> {
		let port = serialport::new(path, baud_rate)
			.data_bits(serialport::DataBits::Eight)
			.stop_bits(serialport::StopBits::One)
			.parity(serialport::Parity::None)
			.flow_control(serialport::FlowControl::None)
			.timeout(byte_timeout)
			.open()?;

		log::info!("Opened serial port: {} at {} baud", path, baud_rate);
		Ok(SerialTransport { port })
	}
}

impl Transport for SerialTransport {
	fn transfer_byte(&mut self, tx: u8) -> Result<u8> {
		self.port.write_all(&[tx])?;
		self.port.flush()?;
		let mut rx = [0u8; 1];
		self.port.read_exact(&mut rx)?;
		Ok(rx[0])
	}
}
