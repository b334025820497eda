//! End-to-end run: input file in, schedule file out.

use std::path::Path;

use log::info;

use crate::config::SchedulerConfig;
use crate::emit::{emit, OutputFormat, ScheduleDocument};
use crate::error::Result;
use crate::input::{read_input, ParsedInput};
use crate::scheduler::{ScheduleOutcome, ScheduleRequest};

/// Command-line overrides of configuration values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOverrides {
    /// Replaces `search.seed`.
    pub seed: Option<u64>,
    /// Replaces `output.format`.
    pub format: Option<OutputFormat>,
}

/// What one run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: ScheduleOutcome,
    /// The document that was written.
    pub document: ScheduleDocument,
    pub format: OutputFormat,
    /// Number of skipped input lines.
    pub rejected_lines: usize,
}

/// Reads `input`, schedules it and writes `output`.
pub fn run(
    input: &Path,
    output: &Path,
    config: &SchedulerConfig,
    overrides: RunOverrides,
) -> Result<RunSummary> {
    let parsed = read_input(input, &config.duration_model())?;
    parsed.log_rejections();
    run_parsed(&parsed, output, config, overrides)
}

/// Schedules already parsed input and writes `output`.
pub fn run_parsed(
    parsed: &ParsedInput,
    output: &Path,
    config: &SchedulerConfig,
    overrides: RunOverrides,
) -> Result<RunSummary> {
    let horizon = config.horizon_table()?;
    let locator = config.locator();

    let mut scheduler = config.night_scheduler();
    if let Some(seed) = overrides.seed {
        let mut ga = config.search.ga.clone();
        ga.seed = seed;
        scheduler = scheduler.with_ga_config(ga);
    }

    let request = ScheduleRequest::new(&parsed.session, &parsed.catalog, &locator, &horizon);
    let outcome = scheduler.schedule(&request);

    let document = ScheduleDocument::new(
        &outcome.schedule,
        &outcome.fitness,
        &parsed.catalog,
        &parsed.session,
    );
    let format = overrides.format.unwrap_or(config.output.format);
    emit(output, format, &document)?;
    info!(
        "wrote {} instances to {} ({format})",
        document.instances.len(),
        output.display()
    );

    Ok(RunSummary {
        outcome,
        document,
        format,
        rejected_lines: parsed.rejected.len(),
    })
}
