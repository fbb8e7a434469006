mod config;
mod frame_decoder;
mod logging;
mod telemetry;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use tracing::info;

use config::CliConfig;
use telemetry::TelemetryAggregator;
use wavephy_core::{PhyConfig, StreamingReceiver, Transmitter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Acoustic IEEE 802.11a PHY command-line tool", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file; falls back to PhyConfig::default().
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encodes a payload into a WAV clip of passband audio.
    Encode {
        /// Output WAV path.
        #[arg(short, long)]
        output: PathBuf,
        /// Literal message to encode; mutually exclusive with --input-file.
        #[arg(short, long)]
        message: Option<String>,
        /// File whose raw bytes become the PSDU payload.
        #[arg(short, long)]
        input_file: Option<PathBuf>,
    },
    /// Decodes a WAV clip of passband audio back into payloads.
    Decode {
        /// Input WAV path.
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let cli_config = match &cli.config {
        Some(path) => CliConfig::from_file(path)
            .wrap_err_with(|| format!("failed to load config from {}", path.display()))?,
        None => CliConfig::default(),
    };
    logging::init(&cli_config.log_level);
    cli_config.phy.validate().wrap_err("invalid PHY configuration")?;

    match cli.command {
        Command::Encode { output, message, input_file } => {
            encode(&cli_config.phy, output, message, input_file)
        }
        Command::Decode { input } => decode(&cli_config.phy, input),
    }
}

fn encode(
    phy: &PhyConfig,
    output: PathBuf,
    message: Option<String>,
    input_file: Option<PathBuf>,
) -> Result<()> {
    let payload: Vec<u8> = match (message, input_file) {
        (Some(_), Some(_)) => {
            return Err(eyre!("--message and --input-file are mutually exclusive"))
        }
        (Some(text), None) => text.into_bytes(),
        (None, Some(path)) => std::fs::read(&path)
            .wrap_err_with(|| format!("failed to read input file {}", path.display()))?,
        (None, None) => return Err(eyre!("one of --message or --input-file is required")),
    };

    let mut tx = Transmitter::new(phy.channel.clone());
    let stereo = tx
        .encode_stereo_clip(&payload, phy.rate_code)
        .wrap_err("failed to encode payload into a baseband frame")?;

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: phy.channel.passband_hz() as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&output, spec)
        .wrap_err_with(|| format!("failed to create WAV file {}", output.display()))?;
    for (left, right) in &stereo {
        writer.write_sample(*left)?;
        writer.write_sample(*right)?;
    }
    writer.finalize()?;

    info!(
        octets = payload.len(),
        rate_code = phy.rate_code,
        samples = stereo.len(),
        path = %output.display(),
        "wrote passband clip"
    );
    Ok(())
}

fn decode(phy: &PhyConfig, input: PathBuf) -> Result<()> {
    let mut reader = hound::WavReader::open(&input)
        .wrap_err_with(|| format!("failed to open WAV file {}", input.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<std::result::Result<_, _>>()?
        }
    };
    // Any stereo stagger is only a capture-timing aid; decoding needs just
    // one rail, so take the first channel of each frame.
    let mono: Vec<f32> = samples.chunks(channels).map(|frame| frame[0]).collect();

    let mut receiver = StreamingReceiver::new(phy.clone());
    let mut telemetry = TelemetryAggregator::new();

    const CHUNK: usize = 4096;
    for chunk in mono.chunks(CHUNK) {
        for frame in receiver.process(chunk) {
            telemetry.record(&frame.outcome);
            println!("{}", frame_decoder::report_line(&frame));
        }
    }

    println!("{}", telemetry.summary());
    Ok(())
}
