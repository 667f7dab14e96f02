mod capture;
mod chunker;
mod cli;
mod config;
mod consts;
mod coordination;
mod error;
mod image;
mod inspect;
mod producer;
mod protocol;
mod scheduler;
mod sensors;
mod ticker;
mod transport;
mod types;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use capture::FileCapture;
use cli::{Cli, Commands};
use config::AppConfig;
use coordination::{CancellationToken, Coordination};
use producer::{ImageProducer, SensorProducer};
use protocol::link::{Command, Link};
use scheduler::TransportScheduler;
use transport::{detect_port, LoopbackCoprocessor, SerialTransport, Transport};
use types::BatteryStatus;

/// Battery voltages reported by the simulated co-processor
const LOOPBACK_BATTERY: BatteryStatus = BatteryStatus {
	hub: 5.05,
	coprocessor: 7.4,
};

fn main() -> Result<()> {
	let cli = Cli::parse();

	let mut config = match &cli.config {
		Some(path) => AppConfig::from_file(path)
			.with_context(|| format!("failed to load config {}", path.display()))?,
		None => AppConfig::default(),
	};
	if let Some(port) = &cli.port {
		config.link.port = Some(port.clone());
	}

	env_logger::Builder::from_env(
		env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
	)
	.init();

	match cli.command {
		Commands::Run { loopback } => cmd_run(&config, loopback),
		Commands::SendImage {
			path,
			loopback,
			echo,
		} => cmd_send_image(&config, &path, loopback, echo.as_deref()),
		Commands::Inspect { file } => cmd_inspect(&file),
		Commands::Config => cmd_config(&config),
	}
}

/// Serial transport, or a simulated co-processor when `loopback` is set
fn open_transport(
	config: &AppConfig,
	loopback: bool,
) -> Result<(Box<dyn Transport>, Option<LoopbackCoprocessor>)> {
	if loopback {
		let device = LoopbackCoprocessor::new(LOOPBACK_BATTERY);
		log::info!("Using simulated co-processor");
		let transport: Box<dyn Transport> = Box::new(device.clone());
		return Ok((transport, Some(device)));
	}

	let port = match &config.link.port {
		Some(p) => p.clone(),
		None => detect_port()?,
	};
	let serial = SerialTransport::open(&port, config.link.baud_rate, config.link.byte_timeout())
		.with_context(|| format!("failed to open {port}"))?;
	let transport: Box<dyn Transport> = Box::new(serial);
	Ok((transport, None))
}

fn cmd_run(config: &AppConfig, loopback: bool) -> Result<()> {
	let (transport, device) = open_transport(config, loopback)?;
	let ctx = Arc::new(Coordination::new());

	let cancel = ctx.cancel.clone();
	ctrlc::set_handler(move || {
		log::info!("Received shutdown signal");
		cancel.cancel();
	})
	.context("failed to install Ctrl+C handler")?;

	let (tx, rx) = crossbeam_channel::bounded(config.image.queue_capacity);

	let sensor_period = config.timing.sensor_period();
	let sources = sensors::simulated_sources(&config.sensors.sources, sensor_period);
	let sensor_producer = SensorProducer::new(sources, ctx.clone(), sensor_period);
	let image_producer = ImageProducer::new(
		Box::new(FileCapture::new(&config.image)),
		ctx.clone(),
		tx,
		config.image.chunk_size,
		config.timing.image_period(),
	);

	let sensor_handle = thread::Builder::new()
		.name("sensor-producer".to_string())
		.spawn(move || sensor_producer.run())
		.context("failed to spawn sensor producer")?;
	let image_handle = thread::Builder::new()
		.name("image-producer".to_string())
		.spawn(move || image_producer.run())
		.context("failed to spawn image producer")?;

	let link = Link::new(transport, config.timing.link_timing(), ctx.cancel.clone());
	let mut scheduler = TransportScheduler::new(link, ctx.clone(), rx, config.timing.tick())
		.with_snapshot_retry(config.policy.retry_failed_snapshot);
	scheduler.run();

	for (name, handle) in [("sensor", sensor_handle), ("image", image_handle)] {
		if handle.join().is_err() {
			log::error!("{name} producer thread panicked");
		}
	}

	println!("{}", ctx.stats.snapshot());
	if let Some(dev) = device {
		println!(
			"Co-processor accepted {} frame(s), rejected {}, reassembled {} image(s)",
			dev.received().len(),
			dev.rejected(),
			dev.images().len()
		);
	}
	Ok(())
}

fn cmd_send_image(
	config: &AppConfig,
	path: &Path,
	loopback: bool,
	echo: Option<&Path>,
) -> Result<()> {
	eprintln!("Loading {}...", path.display());
	let image = &config.image;
	let raster = crate::image::load_raster(path, image.width, image.height, image.crop)
		.with_context(|| format!("failed to load {}", path.display()))?;
	let chunks = chunker::partition(&raster, 0, config.image.chunk_size)?;
	eprintln!(
		"  {}x{}, {} chunk(s) of {} bytes",
		raster.width,
		raster.height,
		chunks.len(),
		config.image.chunk_size
	);

	let (transport, device) = open_transport(config, loopback)?;
	let mut link = Link::new(transport, config.timing.link_timing(), CancellationToken::new());

	let pb = ProgressBar::new(chunks.len() as u64);
	pb.set_style(
		ProgressStyle::default_bar()
			.template("{spinner:.cyan} [{bar:40.cyan/dim}] {pos}/{len} chunks ({eta})")?
			.progress_chars("=> "),
	);

	let mut failed = 0;
	for chunk in &chunks {
		if let Err(e) = link.send_frame(Command::Image, &chunk.to_frame()) {
			log::warn!("Chunk {} failed: {e}", chunk.chunk_id);
			failed += 1;
		}
		pb.inc(1);
	}
	pb.finish_and_clear();
	eprintln!("Sent {} chunk(s), {failed} not acknowledged", chunks.len());

	if let (Some(dev), Some(out)) = (device, echo) {
		match dev.images().last() {
			Some(img) => {
				crate::image::save_raster(out, img)?;
				println!("Reassembled image saved to {}", out.display());
			}
			None => bail!("co-processor did not reassemble the image"),
		}
	}
	Ok(())
}

fn cmd_inspect(file: &Path) -> Result<()> {
	let data = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
	let frame = inspect::decode_frame(&data)?;
	println!("{frame}");
	Ok(())
}

fn cmd_config(config: &AppConfig) -> Result<()> {
	print!("{}", config.to_toml()?);
	Ok(())
}
