use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::LevelFilter;
use serde::Serialize;

use pcd_core::pointcloud::buffer::PointBuffer;
use pcd_core::pointcloud::metadata::{BoundingVolume, Metadata};
use pcd_core::stage::{SequentialIterator, Stage};
use pcd_parser::{LasReader, ReaderOptions};
use pcd_transformer::{Stats, StatsOptions};

#[derive(Parser, Debug)]
#[command(
    name = "pcdpipe",
    about = "Streams LAS point clouds through filter stages",
    author = "MIERUNE Inc.",
    version = "0.0.1"
)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print header metadata and the default schema
    Info {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Summarize dimensions and print the result as JSON
    Stats {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// JSON file with stats options (num_bins, sample_size, ...)
        #[arg(long, value_name = "FILE")]
        options: Option<PathBuf>,

        /// Restrict to these dimensions
        #[arg(short, long, value_delimiter = ',')]
        dimensions: Vec<String>,

        #[arg(long, default_value_t = 65536)]
        buffer_size: usize,
    },
}

#[derive(Serialize)]
struct Info<'a> {
    stage: &'a str,
    num_points: u64,
    bounds: Option<BoundingVolume>,
    dimensions: Vec<&'a str>,
    metadata: Metadata,
}

fn info(input: PathBuf) -> pcd_core::Result<()> {
    let reader = LasReader::new(&ReaderOptions {
        filename: Some(input),
    })?;
    let schema = reader.schema();
    let report = Info {
        stage: reader.name(),
        num_points: reader.num_points(),
        bounds: reader.bounds(),
        dimensions: schema
            .dimensions()
            .iter()
            .map(|d| d.dimension.name())
            .collect(),
        metadata: reader.metadata(),
    };
    print_json(&report)
}

fn stats(
    input: PathBuf,
    options: Option<PathBuf>,
    dimensions: Vec<String>,
    buffer_size: usize,
) -> pcd_core::Result<()> {
    let mut stats_options = match options {
        Some(path) => {
            let text = fs::read_to_string(&path)?;
            serde_json::from_str(&text).map_err(|e| {
                pcd_core::Error::Config(format!("{}: {}", path.display(), e))
            })?
        }
        None => StatsOptions::default(),
    };
    if !dimensions.is_empty() {
        stats_options.dimensions = dimensions;
    }
    log::debug!("stats options: {:?}", stats_options);

    let reader = LasReader::new(&ReaderOptions {
        filename: Some(input),
    })?;
    let filter = Stats::new(&reader, stats_options)?;

    let start = std::time::Instant::now();
    let mut buffer = PointBuffer::new(filter.schema(), buffer_size.max(1));
    let mut iter = filter.sequential_iterator()?;
    let mut total = 0u64;
    loop {
        let n = iter.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        total += n as u64;
    }
    log::info!("read {} points in {:?}", total, start.elapsed());

    print_json(&filter.results())
}

fn print_json<T: Serialize>(value: &T) -> pcd_core::Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| pcd_core::Error::Config(format!("failed to render JSON: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn main() -> ExitCode {
    let args = Cli::parse();

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(
            None,
            if args.verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
        )
        .init();

    let result = match args.command {
        Command::Info { input } => info(input),
        Command::Stats {
            input,
            options,
            dimensions,
            buffer_size,
        } => stats(input, options, dimensions, buffer_size),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
