use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
	name = "habpi-link",
	about = "Telemetry and image link from the flight computer to the radio co-processor"
)]
pub struct Cli {
	#[arg(short, long, global = true, help = "Configuration file (TOML)")]
	pub config: Option<PathBuf>,

	#[arg(
		short,
		long,
		global = true,
		help = "Serial port path (overrides config, auto-detects if neither is set)"
	)]
	pub port: Option<String>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
	#[command(about = "Run the sensor, image and transport loops until Ctrl+C")]
	Run {
		#[arg(long, help = "Talk to a simulated co-processor instead of the serial port")]
		loopback: bool,
	},
	#[command(about = "Chunk one image and send it over the link")]
	SendImage {
		#[arg(help = "Image file (png, jpg, bmp, webp)")]
		path: PathBuf,

		#[arg(long, help = "Talk to a simulated co-processor instead of the serial port")]
		loopback: bool,

		#[arg(
			long,
			requires = "loopback",
			help = "Save the image reassembled by the simulated co-processor"
		)]
		echo: Option<PathBuf>,
	},
	#[command(about = "Verify and dump a raw frame saved to a file")]
	Inspect {
		#[arg(help = "File holding exactly one frame")]
		file: PathBuf,
	},
	#[command(about = "Print the effective configuration as TOML")]
	Config,
}
