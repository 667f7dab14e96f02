//! Mock transport for unit testing

use std::sync::{Arc, Mutex};

use super::Transport;
use crate::error::Result;

type Responder = Box<dyn FnMut(u8) -> Result<u8> + Send>;

/// Closure-driven transport that records every byte written.
#[derive(Clone)]
pub struct MockTransport {
	inner: Arc<Mutex<MockTransportInner>>,
}

struct MockTransportInner {
	written: Vec<u8>,
	responder: Responder,
}

impl MockTransport {
	pub fn new<F>(responder: F) -> Self
	where
		F: FnMut(u8) -> Result<u8> + Send + 'static,
	{
		MockTransport {
			inner: Arc::new(Mutex::new(MockTransportInner {
				written: Vec::new(),
				responder: Box::new(responder),
			})),
		}
	}

	/// Replies ACK to everything
	pub fn always_ack() -> Self {
		Self::new(|_| Ok(crate::consts::ACK))
	}

	/// Get all written data
	pub fn written(&self) -> Vec<u8> {
		self.inner.lock().unwrap().written.clone()
	}
}

impl Transport for MockTransport {
	fn transfer_byte(&mut self, tx: u8) -> Result<u8> {
		let mut inner = self.inner.lock().unwrap();
		inner.written.push(tx);
		(inner.responder)(tx)
	}
}
