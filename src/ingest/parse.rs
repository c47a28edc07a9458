// src/ingest/parse.rs
//
// TSV line -> FlowRecord. A per-line parse failure is never fatal to the
// batch: callers log and skip it.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::FlowRecord;

const MIN_FIELDS: usize = 12;
const ABSENT: &str = "-";

#[derive(Debug, Error, PartialEq)]
pub enum ParseLineError {
    #[error("directive or blank line")]
    Skip,
    #[error("field count {0} below minimum {MIN_FIELDS}")]
    TooFewFields(usize),
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// Parse one conn.log line. Directive (`#...`) and blank lines return
/// `Err(ParseLineError::Skip)` — distinguishable from a real parse failure
/// so the caller can skip silently instead of logging a warning.
pub fn parse_line(line: &str) -> Result<FlowRecord, ParseLineError> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.trim().is_empty() {
        return Err(ParseLineError::Skip);
    }

    let fields: Vec<&str> = trimmed.split('\t').collect();
    if fields.len() < MIN_FIELDS {
        return Err(ParseLineError::TooFewFields(fields.len()));
    }

    let ts = parse_timestamp(fields[0])?;
    let uid = fields[1].to_string();
    let id_orig_h = fields[2].to_string();
    let id_orig_p = parse_optional(fields[3], "id_orig_p")?;
    let id_resp_h = fields[4].to_string();
    let id_resp_p = parse_optional(fields[5], "id_resp_p")?;
    let proto = fields[6].to_string();
    let service = parse_optional_string(fields[7]);
    let duration = parse_optional(fields[8], "duration")?;
    let orig_bytes = parse_optional(fields[9], "orig_bytes")?;
    let resp_bytes = parse_optional(fields[10], "resp_bytes")?;
    let conn_state = fields[11].to_string();

    Ok(FlowRecord {
        ts,
        uid,
        id_orig_h,
        id_orig_p,
        id_resp_h,
        id_resp_p,
        proto,
        service,
        duration,
        orig_bytes,
        resp_bytes,
        conn_state,
    })
}

fn parse_timestamp(field: &str) -> Result<DateTime<Utc>, ParseLineError> {
    let secs: f64 = field.parse().map_err(|_| ParseLineError::InvalidField {
        field: "ts",
        value: field.to_string(),
    })?;
    let micros = (secs * 1_000_000.0).round() as i64;
    DateTime::from_timestamp_micros(micros).ok_or(ParseLineError::InvalidField {
        field: "ts",
        value: field.to_string(),
    })
}

fn parse_optional_string(field: &str) -> Option<String> {
    if field == ABSENT {
        None
    } else {
        Some(field.to_string())
    }
}

fn parse_optional<T: std::str::FromStr>(
    field: &str,
    name: &'static str,
) -> Result<Option<T>, ParseLineError> {
    if field == ABSENT {
        return Ok(None);
    }
    field
        .parse::<T>()
        .map(Some)
        .map_err(|_| ParseLineError::InvalidField {
            field: name,
            value: field.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_line_with_extra_trailing_fields() {
        let line = "1700000000.5\tU1\t10.0.0.1\t1234\t10.0.0.2\t80\ttcp\t-\t-\t100\t200\tSF\textra1\textra2";
        let rec = parse_line(line).unwrap();
        assert_eq!(rec.uid, "U1");
        assert_eq!(rec.id_orig_h, "10.0.0.1");
        assert_eq!(rec.id_orig_p, Some(1234));
        assert_eq!(rec.id_resp_h, "10.0.0.2");
        assert_eq!(rec.id_resp_p, Some(80));
        assert_eq!(rec.proto, "tcp");
        assert_eq!(rec.service, None);
        assert_eq!(rec.duration, None);
        assert_eq!(rec.orig_bytes, Some(100));
        assert_eq!(rec.resp_bytes, Some(200));
        assert_eq!(rec.conn_state, "SF");
        assert_eq!(rec.ts.timestamp(), 1_700_000_000);
    }

    #[test]
    fn comment_and_blank_lines_are_skipped() {
        assert_eq!(parse_line("#fields\tts\tuid"), Err(ParseLineError::Skip));
        assert_eq!(parse_line(""), Err(ParseLineError::Skip));
        assert_eq!(parse_line("   "), Err(ParseLineError::Skip));
    }

    #[test]
    fn too_few_fields_is_rejected() {
        let line = "1700000000.5\tU1\t10.0.0.1";
        assert_eq!(parse_line(line), Err(ParseLineError::TooFewFields(3)));
    }

    #[test]
    fn invalid_numeric_field_is_rejected() {
        let line = "1700000000.5\tU1\t10.0.0.1\tnotaport\t10.0.0.2\t80\ttcp\t-\t-\t100\t200\tSF";
        let err = parse_line(line).unwrap_err();
        assert!(matches!(err, ParseLineError::InvalidField { field: "id_orig_p", .. }));
    }

    #[test]
    fn dash_is_absent_for_service() {
        let line = "1.0\tU1\ta\t1\tb\t2\ttcp\t-\t1.5\t10\t20\tSF";
        let rec = parse_line(line).unwrap();
        assert_eq!(rec.service, None);
        assert_eq!(rec.duration, Some(1.5));
    }
}
