//! pixcal command-line interface.
//!
//! Builds calibrated prompt hits from LArPix source chunks.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

mod run_file;

use clap::{Parser, Subcommand};
use pixcal_algorithms::{CalibHitBuilder, SourceChunk};
use pixcal_core::{
    charge::energy_from_charge,
    ChannelCalibration, ChannelKey, RecordStore, Resources,
};
use pixcal_io::{read_chunks_json, MemoryStore};
use pixcal_larpix::{CalibrationTables, TileGeometry};
use run_file::RunFile;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid run file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    PixcalIo(#[from] pixcal_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] pixcal_core::Error),

    #[error("Calibration error: {0}")]
    Larpix(#[from] pixcal_larpix::Error),

    #[error("Hit building error: {0}")]
    Algorithms(#[from] pixcal_algorithms::Error),

    #[cfg(not(feature = "hdf5"))]
    #[error("HDF5 output requires building with the `hdf5` feature")]
    Hdf5Disabled,
}

/// Calibrated prompt-hit builder for LArPix charge data.
#[derive(Parser)]
#[command(name = "pixcal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging (debug level unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build calibrated hits from a chunk file
    Process {
        /// Input chunk file (JSON)
        input: PathBuf,

        /// Run configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Tile geometry file
        #[arg(short, long)]
        geometry: PathBuf,

        /// Output HDF5 file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source event dataset name. When it equals the configured events
        /// dataset, a single event -> hit reference table is written.
        #[arg(long, default_value = "charge/events")]
        source: String,
    },

    /// Show the calibration constants resolved for one channel
    Resolve {
        /// Run configuration file
        #[arg(short, long)]
        config: PathBuf,

        io_group: u8,
        io_channel: u8,
        chip_id: u8,
        channel_id: u8,
    },

    /// Convert a dataword to charge and energy
    Charge {
        /// Raw ADC count
        dataword: u8,

        #[arg(long, default_value_t = pixcal_larpix::calibration::DEFAULT_VREF_MV)]
        vref_mv: f64,

        #[arg(long, default_value_t = pixcal_larpix::calibration::DEFAULT_VCM_MV)]
        vcm_mv: f64,

        #[arg(long, default_value_t = pixcal_larpix::calibration::DEFAULT_PEDESTAL_MV)]
        pedestal_mv: f64,
    },

    /// Show information about a chunk file
    Info {
        /// Input chunk file (JSON)
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli.command) {
        log::error!("{err}");
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Process {
            input,
            config,
            geometry,
            output,
            source,
        } => {
            let run_file = RunFile::from_file(&config)?;
            let geometry = TileGeometry::from_file(&geometry)?;
            let chunks = read_chunks_json(&input)?;
            log::info!(
                "{} chunks, {} tiles, {} pixels",
                chunks.len(),
                geometry.n_tiles(),
                geometry.n_pixels()
            );

            let resources = Resources::new(&geometry, &run_file.run, &run_file.drift);
            let builder = CalibHitBuilder::new(run_file.stage, &run_file.run)?;

            let start = Instant::now();
            let (n_events, n_hits) = match output {
                Some(path) => process_to_file(&builder, &source, &chunks, &resources, &path)?,
                None => {
                    let mut store = MemoryStore::new();
                    process_chunks(&builder, &source, &chunks, &mut store, &resources)?
                }
            };

            println!(
                "Processed {} chunks in {:.2}s",
                chunks.len(),
                start.elapsed().as_secs_f64()
            );
            println!("Total events: {}", n_events);
            println!("Total hits: {}", n_hits);
        }

        Commands::Resolve {
            config,
            io_group,
            io_channel,
            chip_id,
            channel_id,
        } => {
            let run_file = RunFile::from_file(&config)?;
            let tables = CalibrationTables::load(
                run_file.stage.pedestal_file(),
                run_file.stage.configuration_file(),
                run_file.run.is_mc,
            )?;

            let key = ChannelKey::new(io_group, io_channel, chip_id, channel_id);
            let calib = tables.resolve(&key);
            let explicit_ped = tables.pedestal.get_explicit(&key).is_some();
            let explicit_adc = tables.configuration.get_explicit(&key).is_some();

            println!("Channel: {} (unique id {})", key, key.unique_id()?);
            println!(
                "vref: {} mV, vcm: {} mV{}",
                calib.vref_mv,
                calib.vcm_mv,
                if explicit_adc { "" } else { " (default)" }
            );
            println!(
                "pedestal: {} mV{}",
                calib.pedestal_mv,
                if explicit_ped { "" } else { " (default)" }
            );
        }

        Commands::Charge {
            dataword,
            vref_mv,
            vcm_mv,
            pedestal_mv,
        } => {
            let q = ChannelCalibration::new(vref_mv, vcm_mv, pedestal_mv).charge(dataword);
            println!("Q: {:.4} ke-", q);
            println!("E: {:.6e} MeV", energy_from_charge(q));
        }

        Commands::Info { input } => {
            let chunks = read_chunks_json(&input)?;
            let n_events: usize = chunks.iter().map(SourceChunk::len).sum();
            let n_packets: usize = chunks.iter().map(SourceChunk::n_data_packets).sum();
            let n_raw: usize = chunks.iter().map(SourceChunk::n_valid_raw_hits).sum();

            println!("File: {}", input.display());
            for (i, chunk) in chunks.iter().enumerate() {
                println!(
                    "  chunk {}: events {:?}, {} data packets, {} raw hits",
                    i,
                    chunk.source_slice(),
                    chunk.n_data_packets(),
                    chunk.n_valid_raw_hits()
                );
            }
            println!("Chunks: {}", chunks.len());
            println!("Events: {}", n_events);
            println!("Data packets: {}", n_packets);
            println!("Valid raw hits: {}", n_raw);

            let first = chunks.iter().map(|c| c.source_start).min();
            let last = chunks.iter().map(|c| c.source_slice().end).max();
            if let (Some(first), Some(last)) = (first, last) {
                println!("Source range: {} - {}", first, last);
            }
            if n_packets != n_raw {
                println!("Warning: data packets and raw hits differ");
            }
        }
    }

    Ok(())
}

fn process_chunks<S: RecordStore + ?Sized>(
    builder: &CalibHitBuilder,
    source: &str,
    chunks: &[SourceChunk],
    store: &mut S,
    resources: &Resources<'_>,
) -> Result<(usize, u64)> {
    builder.init(source, store)?;

    let mut n_events = 0;
    let mut n_hits = 0;
    for chunk in chunks {
        let summary = builder.run(source, chunk, store, resources)?;
        n_events += summary.n_events;
        n_hits += summary.n_hits();
    }
    Ok((n_events, n_hits))
}

#[cfg(feature = "hdf5")]
fn process_to_file(
    builder: &CalibHitBuilder,
    source: &str,
    chunks: &[SourceChunk],
    resources: &Resources<'_>,
    path: &Path,
) -> Result<(usize, u64)> {
    let mut store = pixcal_io::Hdf5Store::create(path, pixcal_io::Hdf5WriteOptions::default())?;
    let totals = process_chunks(builder, source, chunks, &mut store, resources)?;
    store.flush()?;
    log::info!("wrote {}", path.display());
    Ok(totals)
}

#[cfg(not(feature = "hdf5"))]
fn process_to_file(
    _builder: &CalibHitBuilder,
    _source: &str,
    _chunks: &[SourceChunk],
    _resources: &Resources<'_>,
    _path: &Path,
) -> Result<(usize, u64)> {
    Err(CliError::Hdf5Disabled)
}
