//! Session input file parsing.
//!
//! # Format
//!
//! ```text
//! <session_start_jd> <session_stop_jd> <logfile_path>
//! <id> Dark <priority>
//! <id> Flat <priority>
//! <id> Script <priority> <target>
//! <id> Quick <priority> <target> <cadence_seconds>
//! <id> Time_Seq <priority> <target> <window_start_jd> <window_end_jd>
//! ```
//!
//! A bad header is fatal. A bad action line is collected as a
//! [`LineError`] and skipped, so one typo never loses the whole night.
//! Blank lines and `#` comment lines are ignored.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::duration::DurationModel;
use crate::error::{Result, SchedulerError};
use crate::models::{ActionCatalog, ActionId, ActionType, ObservingAction, Session};
use crate::validation::{validate_action, ValidationErrorKind};

/// Why an action line was skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LineErrorKind {
    #[error("invalid input line")]
    Malformed,
    #[error("invalid type '{0}'")]
    UnknownType(String),
    #[error("invalid field count ({action_type}): expected {expected}, found {found}")]
    FieldCount {
        action_type: ActionType,
        expected: usize,
        found: usize,
    },
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("window end must be after window start")]
    InvalidWindow,
    #[error("duplicate id {0}")]
    DuplicateId(ActionId),
    #[error("priority {0} must not be negative")]
    NegativePriority(f64),
    #[error("cadence {0} must be positive")]
    NonPositiveCadence(f64),
    #[error("duration {0}s must be positive")]
    InvalidDuration(f64),
}

/// A skipped action line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("line {line_no}: {kind}: {line}")]
pub struct LineError {
    /// 1-based line number.
    pub line_no: usize,
    pub kind: LineErrorKind,
    /// The offending line, trimmed.
    pub line: String,
}

/// Result of reading one input file.
#[derive(Debug, Clone)]
pub struct ParsedInput {
    pub session: Session,
    pub catalog: ActionCatalog,
    /// Skipped lines, in file order.
    pub rejected: Vec<LineError>,
}

impl ParsedInput {
    /// Logs every skipped line at `warn`.
    pub fn log_rejections(&self) {
        for err in &self.rejected {
            warn!("{err}");
        }
        info!(
            "read {} actions ({} lines skipped)",
            self.catalog.len(),
            self.rejected.len()
        );
    }
}

/// Parses the session header line.
pub fn parse_header(line: &str) -> Result<Session> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 3 {
        return Err(SchedulerError::Header(format!(
            "expected '<start_jd> <stop_jd> <logfile>', found {} fields",
            fields.len()
        )));
    }
    let start = parse_jd(fields[0])?;
    let stop = parse_jd(fields[1])?;
    Session::new(start, stop, fields[2])
}

fn parse_jd(token: &str) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| SchedulerError::Header(format!("invalid Julian Date '{token}'")))
}

fn number<T: std::str::FromStr>(token: &str) -> std::result::Result<T, LineErrorKind> {
    token
        .parse()
        .map_err(|_| LineErrorKind::InvalidNumber(token.to_string()))
}

/// Parses one action line and assigns its duration from `durations`.
pub fn parse_action_line(
    line: &str,
    durations: &DurationModel,
) -> std::result::Result<ObservingAction, LineErrorKind> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(LineErrorKind::Malformed);
    }
    let id: ActionId = number(fields[0])?;
    let action_type: ActionType = fields[1]
        .parse()
        .map_err(|_| LineErrorKind::UnknownType(fields[1].to_string()))?;
    let priority: f64 = number(fields[2])?;

    let expected = action_type.field_count();
    if fields.len() != expected {
        return Err(LineErrorKind::FieldCount {
            action_type,
            expected,
            found: fields.len(),
        });
    }

    let action = match action_type {
        ActionType::Dark => ObservingAction::dark(id, priority),
        ActionType::Flat => ObservingAction::flat(id, priority),
        ActionType::Script => ObservingAction::script(id, priority, fields[3], 0.0),
        ActionType::Quick => ObservingAction::quick(id, priority, fields[3], number(fields[4])?),
        ActionType::TimeSeq => ObservingAction::time_seq(
            id,
            priority,
            fields[3],
            number(fields[4])?,
            number(fields[5])?,
        ),
    };
    let action = durations.resolve(action);

    match validate_action(&action) {
        Ok(()) => Ok(action),
        // An inverted window also yields a negative duration; report the window.
        Err(errors) => Err(match errors
            .iter()
            .map(|e| e.kind)
            .min_by_key(|kind| *kind == ValidationErrorKind::InvalidDuration)
            .unwrap_or(ValidationErrorKind::InvalidDuration)
        {
            ValidationErrorKind::InvalidPriority => {
                LineErrorKind::NegativePriority(action.priority)
            }
            ValidationErrorKind::InvalidCadence => {
                LineErrorKind::NonPositiveCadence(action.cadence_seconds.unwrap_or(0.0))
            }
            ValidationErrorKind::InvalidWindow => LineErrorKind::InvalidWindow,
            ValidationErrorKind::InvalidDuration => {
                LineErrorKind::InvalidDuration(action.duration_seconds)
            }
            ValidationErrorKind::DuplicateId => LineErrorKind::DuplicateId(id),
            ValidationErrorKind::MissingTarget => LineErrorKind::Malformed,
        }),
    }
}

/// Parses a whole input file.
pub fn parse_input(text: &str, durations: &DurationModel) -> Result<ParsedInput> {
    let lines = text.lines().enumerate().map(|(idx, raw)| RawLine {
        line_no: idx + 1,
        text: Cow::Borrowed(raw),
        decoded: true,
    });
    parse_lines(lines, durations)
}

/// Parses raw file bytes. An action line that is not valid UTF-8 is
/// skipped as malformed; an undecodable header is fatal.
pub fn parse_input_bytes(bytes: &[u8], durations: &DurationModel) -> Result<ParsedInput> {
    let lines = bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .map(|(idx, raw)| match std::str::from_utf8(raw) {
            Ok(text) => RawLine {
                line_no: idx + 1,
                text: Cow::Borrowed(text),
                decoded: true,
            },
            Err(_) => RawLine {
                line_no: idx + 1,
                text: String::from_utf8_lossy(raw),
                decoded: false,
            },
        });
    parse_lines(lines, durations)
}

/// Reads and parses an input file.
pub fn read_input(path: impl AsRef<Path>, durations: &DurationModel) -> Result<ParsedInput> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| SchedulerError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    parse_input_bytes(&bytes, durations)
}

struct RawLine<'a> {
    line_no: usize,
    text: Cow<'a, str>,
    /// `false` when `text` is a lossy decode.
    decoded: bool,
}

fn parse_lines<'a>(
    lines: impl Iterator<Item = RawLine<'a>>,
    durations: &DurationModel,
) -> Result<ParsedInput> {
    let mut lines = lines.filter(|raw| {
        let line = raw.text.trim();
        !line.is_empty() && !line.starts_with('#')
    });

    let session = match lines.next() {
        Some(header) if header.decoded => parse_header(header.text.trim())?,
        Some(header) => {
            return Err(SchedulerError::Header(format!(
                "line {}: header is not valid UTF-8",
                header.line_no
            )))
        }
        None => return Err(SchedulerError::Header("input has no session header".into())),
    };

    let mut actions = Vec::new();
    let mut rejected = Vec::new();
    let mut seen = HashSet::new();
    for raw in lines {
        let line = raw.text.trim();
        let parsed = if raw.decoded {
            parse_action_line(line, durations).and_then(|action| {
                if seen.insert(action.id) {
                    Ok(action)
                } else {
                    Err(LineErrorKind::DuplicateId(action.id))
                }
            })
        } else {
            Err(LineErrorKind::Malformed)
        };
        match parsed {
            Ok(action) => actions.push(action),
            Err(kind) => rejected.push(LineError {
                line_no: raw.line_no,
                kind,
                line: line.to_string(),
            }),
        }
    }

    let catalog = ActionCatalog::new(actions).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        SchedulerError::Catalog(messages.join("; "))
    })?;

    Ok(ParsedInput {
        session,
        catalog,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "2460000.5 2460000.75 /tmp/session.log";

    fn parse(body: &str) -> ParsedInput {
        parse_input(&format!("{HEADER}\n{body}"), &DurationModel::default()).unwrap()
    }

    #[test]
    fn test_header() {
        let session = parse_header(HEADER).unwrap();
        assert_eq!(session.duration_seconds(), 21_600);
        assert_eq!(session.log_path, Path::new("/tmp/session.log"));
    }

    #[test]
    fn test_bad_headers() {
        assert!(matches!(parse_header("2460000.5 2460000.75"), Err(SchedulerError::Header(_))));
        assert!(matches!(parse_header("start stop log"), Err(SchedulerError::Header(_))));
        assert!(matches!(
            parse_header("2460000.75 2460000.5 log"),
            Err(SchedulerError::Header(_))
        ));
        assert!(matches!(
            parse_input("", &DurationModel::default()),
            Err(SchedulerError::Header(_))
        ));
    }

    #[test]
    fn test_all_action_types() {
        let input = parse(
            "1 Dark 1.0\n\
             2 Flat 0.5\n\
             3 Script 2.0 RZ-Cas\n\
             4 Quick 1.5 M42 900\n\
             5 Time_Seq 3.0 V1 2460000.55 2460000.6\n\
             6 TimeSeq 1.0 V2 2460000.6 2460000.7\n",
        );
        assert!(input.rejected.is_empty());
        assert_eq!(input.catalog.len(), 6);

        let quick = input.catalog.get(4).unwrap();
        assert_eq!(quick.cadence_seconds, Some(900.0));
        assert_eq!(quick.duration_seconds, 300.0);

        let ts = input.catalog.get(5).unwrap();
        assert_eq!(ts.window_jd, Some((2460000.55, 2460000.6)));
        assert!((ts.duration_seconds - 4320.0).abs() < 1e-3);

        assert_eq!(input.catalog.get(3).unwrap().duration_seconds, 600.0);
        assert_eq!(input.catalog.get(1).unwrap().duration_seconds, 1800.0);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let input = parse("\n# calibration\n1 Dark 1.0\n   \n");
        assert_eq!(input.catalog.len(), 1);
        assert!(input.rejected.is_empty());
    }

    #[test]
    fn test_rejected_lines() {
        let input = parse(
            "1 Dark\n\
             2 Bias 1.0\n\
             3 Script 1.0\n\
             4 Quick 1.0 M42 often\n\
             5 Time_Seq 1.0 V1 2460000.6 2460000.55\n\
             6 Quick 1.0 M42 0\n\
             7 Script -1.0 M31\n\
             8 Dark 1.0\n\
             8 Flat 1.0\n\
             x Dark 1.0\n",
        );
        let kinds: Vec<_> = input.rejected.iter().map(|e| e.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                LineErrorKind::Malformed,
                LineErrorKind::UnknownType("Bias".into()),
                LineErrorKind::FieldCount {
                    action_type: ActionType::Script,
                    expected: 4,
                    found: 3
                },
                LineErrorKind::InvalidNumber("often".into()),
                LineErrorKind::InvalidWindow,
                LineErrorKind::NonPositiveCadence(0.0),
                LineErrorKind::NegativePriority(-1.0),
                LineErrorKind::DuplicateId(8),
                LineErrorKind::InvalidNumber("x".into()),
            ]
        );
        assert_eq!(input.rejected[0].line_no, 2);
        assert_eq!(input.catalog.len(), 1);
        assert_eq!(input.catalog.get(8).unwrap().action_type, ActionType::Dark);
    }

    #[test]
    fn test_line_error_display() {
        let err = LineError {
            line_no: 4,
            kind: LineErrorKind::UnknownType("Bias".into()),
            line: "2 Bias 1.0".into(),
        };
        assert_eq!(err.to_string(), "line 4: invalid type 'Bias': 2 Bias 1.0");
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_input("/nonexistent/session.txt", &DurationModel::default()).unwrap_err();
        assert!(matches!(err, SchedulerError::Input { .. }));
        assert_eq!(err.exit_code(), 254);
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");
        fs::write(&path, format!("{HEADER}\n1 Flat 1.0\n")).unwrap();
        let input = read_input(&path, &DurationModel::default()).unwrap();
        assert_eq!(input.catalog.len(), 1);
    }

    #[test]
    fn test_undecodable_action_line_is_skipped() {
        let mut bytes = format!("{HEADER}\n1 Dark 1.0\n").into_bytes();
        bytes.extend_from_slice(b"2 Script 1.0 M\xe9ra\r\n3 Flat 1.0\n");
        let input = parse_input_bytes(&bytes, &DurationModel::default()).unwrap();

        assert_eq!(input.catalog.len(), 2);
        assert!(input.catalog.get(3).is_some());
        assert_eq!(input.rejected.len(), 1);
        assert_eq!(input.rejected[0].line_no, 3);
        assert_eq!(input.rejected[0].kind, LineErrorKind::Malformed);
        assert!(input.rejected[0].line.starts_with("2 Script 1.0 M"));
    }

    #[test]
    fn test_undecodable_header_is_fatal() {
        let bytes = b"2460000.5 2460000.75 /tmp/s\xe9ssion.log\n1 Dark 1.0\n";
        let err = parse_input_bytes(bytes, &DurationModel::default()).unwrap_err();
        assert!(matches!(err, SchedulerError::Header(_)));
        assert_eq!(err.exit_code(), 254);
    }

    #[test]
    fn test_read_file_with_latin1_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");
        let mut bytes = format!("{HEADER}\n1 Dark 1.0\n").into_bytes();
        bytes.extend_from_slice(b"2 Script 1.0 M\xe9ra\n3 Flat 1.0\n");
        fs::write(&path, bytes).unwrap();

        let input = read_input(&path, &DurationModel::default()).unwrap();
        assert_eq!(input.catalog.len(), 2);
        assert_eq!(input.rejected.len(), 1);
    }
}
