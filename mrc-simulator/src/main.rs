use clap::{Parser, Subcommand};
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::process::ExitCode;

use ghost_cache::{CapacitySweep, GhostCacheConfig};
use mrc_simulator::compare::compare_files;
use mrc_simulator::generator::{GeneratorConfig, TraceGenerator};
use mrc_simulator::models::{FormatProfile, ReportFormat, SimulationConfig};
use mrc_simulator::runner::SimulationRunner;
use mrc_simulator::SimError;
use tracing::error;

/// Multi-tenant miss-rate curve simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the CLI
#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace and write one MRC history per tenant
    Simulate {
        /// Trace layout
        #[arg(value_enum)]
        profile: FormatProfile,

        /// Trace file to replay
        trace: PathBuf,

        /// Directory receiving the per-tenant reports
        #[arg(short, long, default_value = "mrc")]
        output_dir: PathBuf,

        /// Trace-time distance between checkpoints
        #[arg(short, long, default_value = "3600")]
        interval: NonZeroU64,

        /// Trace time checkpoints are aligned to
        #[arg(long, default_value = "0")]
        origin: u64,

        /// Capacity step, in entries
        #[arg(long, default_value = "64")]
        step: usize,

        /// Smallest capacity reported, in entries
        #[arg(long, default_value = "64")]
        min: usize,

        /// Largest capacity simulated, in entries
        #[arg(long, default_value = "1024")]
        max: usize,

        /// Keep one key in 2^N
        #[arg(long, default_value = "1")]
        sample_shift: u32,

        /// Report encoding
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,

        /// Export a per-tenant summary to this CSV file
        #[arg(long, value_name = "PATH")]
        summary_csv: Option<PathBuf>,
    },

    /// Print the hit-rate error between two JSON reports, per checkpoint
    Compare {
        /// Reference report
        a: PathBuf,

        /// Report to compare against the reference
        b: PathBuf,
    },

    /// Write a deterministic synthetic trace in the twitter layout
    Generate {
        /// Number of tenants
        #[arg(long, default_value = "4")]
        tenants: NonZeroU64,

        /// Distinct keys per tenant
        #[arg(long, default_value = "1000")]
        keys: usize,

        /// Records to write
        #[arg(long, default_value = "100000")]
        requests: u64,

        /// Records per unit of trace time
        #[arg(long, default_value = "100")]
        rate: NonZeroU64,

        /// Zipf exponent of key popularity
        #[arg(long, default_value = "0.9")]
        skew: f64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output file
        #[arg(short, long, default_value = "trace.csv")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // --help and --version are reported through the same path
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing();

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<(), SimError> {
    match command {
        Commands::Simulate {
            profile,
            trace,
            output_dir,
            interval,
            origin,
            step,
            min,
            max,
            sample_shift,
            format,
            summary_csv,
        } => {
            let sweep = CapacitySweep::new(step, min, max)?;
            let config = SimulationConfig {
                trace,
                profile,
                output_dir,
                interval,
                origin,
                engine: GhostCacheConfig::new(sweep, sample_shift)?,
                format,
                summary_csv,
            };

            println!("MRC Simulation");
            println!("==============");
            println!("Trace: {} ({})", config.trace.display(), config.profile);
            println!("Output directory: {}", config.output_dir.display());
            println!("Interval: {} (origin {})", config.interval, config.origin);
            println!(
                "Capacities: {}..={} step {}, sampling 1/{}",
                min,
                max,
                step,
                1u64 << sample_shift
            );

            let summary = SimulationRunner::new(config).run()?;
            summary.print_summary();
            Ok(())
        }

        Commands::Compare { a, b } => {
            compare_files(&a, &b)?.print();
            Ok(())
        }

        Commands::Generate {
            tenants,
            keys,
            requests,
            rate,
            skew,
            seed,
            output,
        } => {
            let generator = TraceGenerator::new(GeneratorConfig {
                tenants,
                keys,
                requests,
                rate,
                skew,
                seed,
            })?;
            let written = generator.write_file(&output)?;
            println!("Wrote {written} records to {}", output.display());
            Ok(())
        }
    }
}
