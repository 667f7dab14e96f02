//! Byte-exchange devices behind the link protocol

use crate::error::Result;

mod loopback;
#[cfg(test)]
pub mod mock;
mod serial;

pub use loopback::LoopbackCoprocessor;
#[cfg(test)]
pub use loopback::Received;
pub use serial::{detect_port, SerialTransport};

/// Full-duplex byte exchange with the downstream device.
///
/// Every byte written is answered by exactly one reply byte.
pub trait Transport: Send {
	/// Write one byte and return the byte received in exchange
	fn transfer_byte(&mut self, tx: u8) -> Result<u8>;

	/// Exchange a whole buffer, `rx` receiving one reply per byte of `tx`
	fn transfer_bytes(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
		for (out, reply) in tx.iter().zip(rx.iter_mut()) {
			*reply = self.transfer_byte(*out)?;
		}
		Ok(())
	}
}

impl<T: Transport + ?Sized> Transport for Box<T> {
	fn transfer_byte(&mut self, tx: u8) -> Result<u8> {
		(**self).transfer_byte(tx)
	}

	fn transfer_bytes(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
		(**self).transfer_bytes(tx, rx)
	}
}
