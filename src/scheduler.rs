//! Transport scheduler: sole owner of the link
//!
//! Each tick polls the battery, then sends at most one message: the pending
//! sensor frame if there is one, otherwise the next chunk of the image in
//! progress.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::coordination::{Coordination, LinkStats};
use crate::error::Error;
use crate::protocol::frame::BatteryFrame;
use crate::protocol::link::{Command, Link};
use crate::ticker::Ticker;
use crate::transport::Transport;
use crate::types::{BatteryStatus, ImageChunk};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traffic {
	Sensor { acked: bool },
	Image { chunk_id: u16, acked: bool },
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
	/// Fresh battery reading, if the poll succeeded and verified
	pub battery: Option<BatteryStatus>,
	pub sent: Option<Traffic>,
}

pub struct TransportScheduler<T: Transport> {
	link: Link<T>,
	ctx: Arc<Coordination>,
	images: Receiver<ImageChunk>,
	retry_failed_snapshot: bool,
	tick_period: Duration,
}

impl<T: Transport> TransportScheduler<T> {
	pub fn new(
		link: Link<T>,
		ctx: Arc<Coordination>,
		images: Receiver<ImageChunk>,
		tick_period: Duration,
	) -> Self {
		TransportScheduler {
			link,
			ctx,
			images,
			retry_failed_snapshot: false,
			tick_period,
		}
	}

	/// Put a snapshot that failed to send back into the slot
	pub fn with_snapshot_retry(mut self, enabled: bool) -> Self {
		self.retry_failed_snapshot = enabled;
		self
	}

	pub fn tick(&mut self) -> TickReport {
		let battery = self.poll_battery();

		let sent = if let Some(frame) = self.ctx.sensor.take() {
			let acked = match self.link.send_frame(Command::Sensor, &frame) {
				Ok(()) => {
					log::debug!("Sensor frame acknowledged");
					LinkStats::bump(&self.ctx.stats.sensor_ack);
					true
				}
				Err(Error::Cancelled) => {
					log::debug!("Sensor frame interrupted by shutdown");
					self.ctx.sensor.restore(frame);
					false
				}
				Err(e) => {
					report("Sensor frame", &e);
					LinkStats::bump(&self.ctx.stats.sensor_nak);
					if self.retry_failed_snapshot {
						self.ctx.sensor.restore(frame);
					}
					false
				}
			};
			Some(Traffic::Sensor { acked })
		} else if self.ctx.image_in_progress() {
			self.send_next_chunk()
		} else {
			None
		};

		TickReport { battery, sent }
	}

	fn poll_battery(&mut self) -> Option<BatteryStatus> {
		let stats = &self.ctx.stats;
		let raw = match self.link.request_battery() {
			Ok(raw) => raw,
			Err(Error::Cancelled) => {
				log::debug!("Battery poll interrupted by shutdown");
				return None;
			}
			Err(e) => {
				report("Battery poll", &e);
				LinkStats::bump(&stats.battery_failures);
				return None;
			}
		};
		match BatteryFrame::from_bytes(raw) {
			Ok(frame) => {
				let status = BatteryStatus::from_frame(&frame);
				log::debug!(
					"Battery: hub {:.2} V, co-processor {:.2} V",
					status.hub,
					status.coprocessor
				);
				self.ctx.set_battery(status);
				LinkStats::bump(&stats.battery_ok);
				Some(status)
			}
			Err(e) => {
				log::warn!("Battery frame rejected, keeping last reading: {e}");
				LinkStats::bump(&stats.battery_checksum_errors);
				None
			}
		}
	}

	fn send_next_chunk(&mut self) -> Option<Traffic> {
		let Ok(chunk) = self.images.try_recv() else {
			log::warn!("Image flagged in progress but queue is empty");
			self.ctx.set_image_in_progress(false);
			return None;
		};

		let acked = match self.link.send_frame(Command::Image, &chunk.to_frame()) {
			Ok(()) => {
				log::debug!(
					"Image {} chunk {}/{} acknowledged",
					chunk.image_id,
					chunk.chunk_id + 1,
					chunk.chunk_count
				);
				LinkStats::bump(&self.ctx.stats.image_ack);
				true
			}
			Err(Error::Cancelled) => {
				log::debug!("Image chunk {} interrupted by shutdown", chunk.chunk_id);
				false
			}
			Err(e) => {
				report("Image chunk", &e);
				LinkStats::bump(&self.ctx.stats.image_nak);
				false
			}
		};

		if self.images.is_empty() {
			if chunk.is_last() {
				log::info!("Image {} sent", chunk.image_id);
			} else {
				log::warn!("Image {} queue drained before its last chunk", chunk.image_id);
			}
			self.ctx.set_image_in_progress(false);
		}
		Some(Traffic::Image {
			chunk_id: chunk.chunk_id,
			acked,
		})
	}

	/// Tick until cancelled
	pub fn run(&mut self) {
		log::info!("Transport scheduler started, tick {:?}", self.tick_period);
		let mut ticker = Ticker::new(self.tick_period);
		while !self.ctx.cancel.is_cancelled() {
			self.tick();
			if !ticker.wait(&self.ctx.cancel) {
				break;
			}
		}
		log::info!("Transport scheduler stopped");
	}
}

fn report(what: &str, e: &Error) {
	match e {
		Error::NotAcknowledged { .. } | Error::ChecksumMismatch { .. } => {
			log::warn!("{what} failed: {e}")
		}
		_ => log::error!("{what} failed: {e}"),
	}
}
