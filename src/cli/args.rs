use crate::utils::filename::parse_row_count;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "brc-datagen")]
#[command(about = "Generate and verify billion-row temperature measurement datasets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Only log warnings and errors, hide progress bars"
    )]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Settings file [default: brc.toml if present]"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a measurements file and its results table
    Generate {
        #[arg(
            value_parser = parse_rows,
            help = "Number of rows, e.g. 1000000, 10m or 1b [default: 1b]"
        )]
        rows: Option<u64>,

        #[arg(short, long, default_value_t = num_cpus::get())]
        workers: usize,

        #[arg(long, help = "Station catalog (.json or name;mean text)")]
        catalog: Option<PathBuf>,

        #[arg(
            short,
            long,
            help = "Output data file [default: data/measurements-{rows}.txt]"
        )]
        output: Option<PathBuf>,

        #[arg(
            short,
            long,
            help = "Results table path [default: results/results-{rows}.csv]"
        )]
        results: Option<PathBuf>,

        #[arg(long, help = "Skip writing the results table")]
        no_results: bool,

        #[arg(long, help = "Seed for reproducible output")]
        seed: Option<u64>,

        #[arg(long)]
        batch_size: Option<usize>,

        #[arg(long)]
        pool_size: Option<usize>,

        #[arg(long, default_value = "pooled", help = "pooled or independent")]
        sampling: String,
    },

    /// Verify measurement files against their results tables
    Verify {
        #[arg(
            value_parser = parse_rows,
            required_unless_present = "all",
            help = "Dataset size to verify, e.g. 1m"
        )]
        size: Option<u64>,

        #[arg(long, help = "Verify every dataset found in the data directory")]
        all: bool,

        #[arg(short, long, help = "Allowed difference in degrees [default: 0.1]")]
        tolerance: Option<f64>,

        #[arg(short, long, default_value_t = num_cpus::get())]
        workers: usize,
    },
}

fn parse_rows(value: &str) -> std::result::Result<u64, String> {
    parse_row_count(value).map_err(|e| e.to_string())
}
