//! Sensor and image producer loops

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::Sender;

use crate::capture::CaptureSource;
use crate::chunker::partition;
use crate::consts::{NUL, PROXIMITY_ALTITUDE, US};
use crate::coordination::{Coordination, LinkStats};
use crate::sensors::SensorSource;
use crate::ticker::Ticker;
use crate::types::{ImageChunk, Raster, SensorSnapshot};

/// `US` while descending below the proximity altitude, `NUL` otherwise
pub fn proximity_flag(s: &SensorSnapshot) -> u8 {
	if s.gps_altitude < PROXIMITY_ALTITUDE && s.gps_climb < 0.0 {
		US
	} else {
		NUL
	}
}

pub struct SensorProducer {
	sources: Vec<Box<dyn SensorSource>>,
	snapshot: SensorSnapshot,
	ctx: Arc<Coordination>,
	period: Duration,
}

impl SensorProducer {
	pub fn new(
		sources: Vec<Box<dyn SensorSource>>,
		ctx: Arc<Coordination>,
		period: Duration,
	) -> Self {
		SensorProducer {
			sources,
			snapshot: SensorSnapshot::default(),
			ctx,
			period,
		}
	}

	#[cfg(test)]
	pub fn snapshot(&self) -> &SensorSnapshot {
		&self.snapshot
	}

	/// Refresh the snapshot from every source and publish its frame
	pub fn cycle(&mut self) {
		for source in self.sources.iter_mut() {
			match source.read() {
				Ok(reading) => reading.apply_to(&mut self.snapshot),
				Err(e) => {
					log::warn!("Sensor {} read failed, keeping last values: {e:#}", source.name())
				}
			}
		}

		let battery = self.ctx.battery();
		self.snapshot.battery_hub = battery.hub;
		self.snapshot.battery_coprocessor = battery.coprocessor;
		self.snapshot.proximity = proximity_flag(&self.snapshot);

		let stats = &self.ctx.stats;
		if self.ctx.sensor.publish(self.snapshot.to_frame()) {
			log::debug!("Unsent sensor frame replaced");
			LinkStats::bump(&stats.sensor_overwritten);
		}
		LinkStats::bump(&stats.sensor_published);
	}

	pub fn run(mut self) {
		log::info!(
			"Sensor producer started with {} source(s), period {:?}",
			self.sources.len(),
			self.period
		);
		let mut ticker = Ticker::new(self.period);
		loop {
			self.cycle();
			if !ticker.wait(&self.ctx.cancel) {
				break;
			}
		}
		log::info!("Sensor producer stopped");
	}
}

pub struct ImageProducer {
	capture: Box<dyn CaptureSource>,
	ctx: Arc<Coordination>,
	queue: Sender<ImageChunk>,
	next_image_id: u16,
	chunk_size: usize,
	period: Duration,
}

impl ImageProducer {
	pub fn new(
		capture: Box<dyn CaptureSource>,
		ctx: Arc<Coordination>,
		queue: Sender<ImageChunk>,
		chunk_size: usize,
		period: Duration,
	) -> Self {
		ImageProducer {
			capture,
			ctx,
			queue,
			next_image_id: 0,
			chunk_size,
			period,
		}
	}

	/// Poll the capture source once; returns whether an image was queued
	pub fn cycle(&mut self) -> Result<bool> {
		if self.ctx.image_in_progress() {
			log::debug!("Previous image still in flight, skipping capture");
			return Ok(false);
		}
		let Some(raster) = self.capture.acquire()? else {
			return Ok(false);
		};
		self.enqueue(&raster)?;
		Ok(true)
	}

	/// Chunk a raster onto the queue and mark the image in progress.
	///
	/// Returns the number of chunks queued.
	pub fn enqueue(&mut self, raster: &Raster) -> Result<usize> {
		if self.ctx.image_in_progress() {
			bail!("previous image is still being sent");
		}
		let image_id = self.next_image_id;
		let chunks = partition(raster, image_id, self.chunk_size)?;
		let count = chunks.len();
		if let Some(capacity) = self.queue.capacity() {
			if count > capacity {
				bail!(
					"image {}x{} needs {count} chunks, queue holds {capacity}",
					raster.width,
					raster.height
				);
			}
		}

		for chunk in chunks {
			self.queue
				.try_send(chunk)
				.map_err(|e| anyhow!("image queue refused chunk: {e}"))?;
			LinkStats::bump(&self.ctx.stats.image_chunks_queued);
		}
		LinkStats::bump(&self.ctx.stats.images_captured);
		self.next_image_id = image_id.wrapping_add(1);
		self.ctx.set_image_in_progress(true);
		log::info!(
			"Image {image_id} ({}x{}) queued as {count} chunk(s)",
			raster.width,
			raster.height
		);
		Ok(count)
	}

	pub fn run(mut self) {
		log::info!("Image producer started, period {:?}", self.period);
		let mut ticker = Ticker::new(self.period);
		loop {
			if let Err(e) = self.cycle() {
				log::error!("Image capture failed: {e:#}");
			}
			if !ticker.wait(&self.ctx.cancel) {
				break;
			}
		}
		log::info!("Image producer stopped");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sensors::{GpsFix, SensorReading};
	use crate::types::BatteryStatus;
	use std::sync::atomic::Ordering;

	struct Scripted {
		readings: Vec<Result<SensorReading>>,
	}

	impl SensorSource for Scripted {
		fn name(&self) -> &str {
			"scripted"
		}

		fn read(&mut self) -> Result<SensorReading> {
			if self.readings.is_empty() {
				bail!("exhausted");
			}
			self.readings.remove(0)
		}
	}

	fn gps(altitude: f32, climb: f32) -> SensorReading {
		SensorReading::Gps(GpsFix {
			altitude,
			climb,
			..Default::default()
		})
	}

	#[test]
	fn test_proximity_flag() {
		let mut s = SensorSnapshot {
			gps_altitude: 200.0,
			gps_climb: -3.0,
			..Default::default()
		};
		assert_eq!(proximity_flag(&s), US);
		s.gps_climb = 2.0;
		assert_eq!(proximity_flag(&s), NUL);
		s.gps_altitude = 400.0;
		s.gps_climb = -3.0;
		assert_eq!(proximity_flag(&s), NUL);
	}

	#[test]
	fn test_failed_read_keeps_previous_values() {
		let ctx = Arc::new(Coordination::new());
		let source = Scripted {
			readings: vec![Ok(gps(180.0, -4.0)), Err(anyhow!("i2c timeout"))],
		};
		let sources: Vec<Box<dyn SensorSource>> = vec![Box::new(source)];
		let mut producer = SensorProducer::new(sources, ctx.clone(), Duration::from_secs(1));

		producer.cycle();
		producer.cycle();
		assert_eq!(producer.snapshot().gps_altitude, 180.0);
		assert_eq!(producer.snapshot().proximity, US);

		let frame = ctx.sensor.take().unwrap();
		assert_eq!(SensorSnapshot::from_frame(&frame).gps_altitude, 180.0);
	}

	#[test]
	fn test_unsent_frame_counted_as_overwritten() {
		let ctx = Arc::new(Coordination::new());
		ctx.set_battery(BatteryStatus {
			hub: 4.9,
			coprocessor: 7.4,
		});
		let mut producer = SensorProducer::new(Vec::new(), ctx.clone(), Duration::from_secs(1));
		producer.cycle();
		producer.cycle();
		producer.cycle();

		let stats = ctx.stats.snapshot();
		assert_eq!(stats.sensor_published, 3);
		assert_eq!(stats.sensor_overwritten, 2);
		let frame = ctx.sensor.take().unwrap();
		assert_eq!(SensorSnapshot::from_frame(&frame).battery_coprocessor, 7.4);
	}

	struct OneShot(Option<Raster>);

	impl CaptureSource for OneShot {
		fn acquire(&mut self) -> Result<Option<Raster>> {
			Ok(self.0.take())
		}
	}

	fn raster() -> Raster {
		Raster::new(8, 8, (0..64).collect()).unwrap()
	}

	#[test]
	fn test_enqueue_marks_image_in_progress() {
		let ctx = Arc::new(Coordination::new());
		let (tx, rx) = crossbeam_channel::bounded(16);
		let capture = Box::new(OneShot(Some(raster())));
		let period = Duration::from_secs(100);
		let mut producer = ImageProducer::new(capture, ctx.clone(), tx, 20, period);

		assert!(producer.cycle().unwrap());
		assert!(ctx.image_ready.load(Ordering::SeqCst));
		assert_eq!(rx.len(), 4);
		let ids: Vec<u16> = rx.try_iter().map(|c| c.chunk_id).collect();
		assert_eq!(ids, vec![0, 1, 2, 3]);

		// Flag still set: no new capture is attempted
		assert!(!producer.cycle().unwrap());
		assert_eq!(ctx.stats.snapshot().images_captured, 1);
		assert_eq!(ctx.stats.snapshot().image_chunks_queued, 4);
	}

	#[test]
	fn test_image_ids_increment_and_wrap() {
		let ctx = Arc::new(Coordination::new());
		let (tx, rx) = crossbeam_channel::bounded(16);
		let capture = Box::new(OneShot(None));
		let mut producer = ImageProducer::new(capture, ctx.clone(), tx, 80, Duration::from_secs(1));
		producer.next_image_id = u16::MAX;

		producer.enqueue(&raster()).unwrap();
		assert_eq!(rx.try_recv().unwrap().image_id, u16::MAX);
		ctx.set_image_in_progress(false);

		producer.enqueue(&raster()).unwrap();
		assert_eq!(rx.try_recv().unwrap().image_id, 0);
	}

	#[test]
	fn test_image_larger_than_queue_rejected() {
		let ctx = Arc::new(Coordination::new());
		let (tx, rx) = crossbeam_channel::bounded(2);
		let capture = Box::new(OneShot(None));
		let mut producer = ImageProducer::new(capture, ctx.clone(), tx, 20, Duration::from_secs(1));

		assert!(producer.enqueue(&raster()).is_err());
		assert!(rx.is_empty());
		assert!(!ctx.image_in_progress());
	}
}
