//! Night-session scheduler.
//!
//! ```text
//! scheduler <input_file> <output_file> [--config <toml>] [--seed <u64>] [--format text|json]
//! ```
//!
//! Exit status: 0 on success, 254 when the input cannot be read or its
//! header is bad, 255 for any other fatal error.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use env_logger::{Env, Target};

use sky_schedule::config::SchedulerConfig;
use sky_schedule::emit::OutputFormat;
use sky_schedule::input::read_input;
use sky_schedule::pipeline::{run_parsed, RunOverrides};
use sky_schedule::SchedulerError;

#[derive(Parser)]
#[command(name = "scheduler", version, about = "Schedule one observing session")]
struct Cli {
    /// Session input file
    input: PathBuf,

    /// Schedule output file
    output: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed (overrides search.seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Output format (overrides output.format)
    #[arg(long)]
    format: Option<OutputFormat>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("scheduler: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn execute(cli: &Cli) -> Result<(), SchedulerError> {
    let config = match &cli.config {
        Some(path) => SchedulerConfig::from_file(path)?,
        None => SchedulerConfig::default(),
    };

    let parsed = read_input(&cli.input, &config.duration_model())?;
    init_logging(&parsed.session.log_path);
    parsed.log_rejections();

    let overrides = RunOverrides {
        seed: cli.seed,
        format: cli.format,
    };
    run_parsed(&parsed, &cli.output, &config, overrides)?;
    Ok(())
}

/// Sends log output to the session log file, or stderr when the header
/// names `-` or the file cannot be opened.
fn init_logging(log_path: &Path) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    let mut fallback = None;
    if log_path != Path::new("-") {
        match OpenOptions::new().create(true).append(true).open(log_path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => fallback = Some(e),
        }
    }
    builder.init();
    if let Some(e) = fallback {
        log::warn!("cannot open log file {}: {e}, logging to stderr", log_path.display());
    }
}
