//! Schedule output.
//!
//! # Text format
//!
//! The executor format: the score with six decimals and a trailing space
//! (no newline, so the first record shares its line), then one record per
//! line in time order. Times are Julian Dates with six decimals.
//!
//! | Type | Record |
//! |------|--------|
//! | Dark / Flat | `<id> <Type> <Type> <start>` |
//! | Time_Seq | `<id> Time_Seq <target> <start> <end>` |
//! | Script / Quick | `<id> <Type> <target> <start>` |
//!
//! # JSON format
//!
//! A pretty-printed [`ScheduleDocument`].

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::models::{ActionCatalog, ActionId, ActionType, CandidateSchedule, Session};
use crate::scheduler::ScheduleFitness;

/// Output file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{other}' (expected text or json)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// One scheduled instance, in absolute time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: ActionId,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub target: Option<String>,
    pub start_jd: f64,
    pub end_jd: f64,
    pub duration_seconds: i64,
}

/// A finished schedule ready for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDocument {
    /// Schedule fitness value.
    pub score: f64,
    pub idle_seconds: i64,
    /// Instances in time order.
    pub instances: Vec<InstanceRecord>,
}

impl ScheduleDocument {
    /// Resolves a schedule against its catalog and session.
    pub fn new(
        schedule: &CandidateSchedule,
        fitness: &ScheduleFitness,
        catalog: &ActionCatalog,
        session: &Session,
    ) -> Self {
        let instances = schedule
            .instances()
            .iter()
            .filter_map(|inst| {
                let action = catalog.get(inst.action_id)?;
                Some(InstanceRecord {
                    id: action.id,
                    action_type: action.action_type,
                    target: action.target.clone(),
                    start_jd: session.jd_at(inst.start),
                    end_jd: session.jd_at(inst.end()),
                    duration_seconds: inst.duration,
                })
            })
            .collect();
        Self {
            score: fitness.value,
            idle_seconds: fitness.idle_seconds,
            instances,
        }
    }
}

/// Writes the text format.
pub fn write_text<W: Write>(out: &mut W, doc: &ScheduleDocument) -> io::Result<()> {
    write!(out, "{:.6} ", doc.score)?;
    for rec in &doc.instances {
        let kind = rec.action_type.as_str();
        let target = rec.target.as_deref().unwrap_or(kind);
        match rec.action_type {
            ActionType::Dark | ActionType::Flat => {
                writeln!(out, "{} {kind} {kind} {:.6}", rec.id, rec.start_jd)?
            }
            ActionType::TimeSeq => writeln!(
                out,
                "{} {kind} {target} {:.6} {:.6}",
                rec.id, rec.start_jd, rec.end_jd
            )?,
            ActionType::Script | ActionType::Quick => {
                writeln!(out, "{} {kind} {target} {:.6}", rec.id, rec.start_jd)?
            }
        }
    }
    Ok(())
}

/// Writes the JSON format.
pub fn write_json<W: Write>(out: &mut W, doc: &ScheduleDocument) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, doc)?;
    writeln!(out).map_err(serde_json::Error::io)?;
    Ok(())
}

/// Creates `path` and writes the schedule in `format`.
pub fn emit(path: &Path, format: OutputFormat, doc: &ScheduleDocument) -> Result<()> {
    let output_error = |source| SchedulerError::Output {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(output_error)?;
    let mut out = BufWriter::new(file);
    match format {
        OutputFormat::Text => write_text(&mut out, doc).map_err(output_error)?,
        OutputFormat::Json => write_json(&mut out, doc)?,
    }
    out.flush().map_err(output_error)
}
