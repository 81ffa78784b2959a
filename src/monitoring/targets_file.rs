//! Loader for the CSV targets file.
//!
//! One record per line:
//! `name, method, target, http_method, timeout_secs, allow_redirects, max_redirects, check_body[, verify_ssl]`
use csv::{ReaderBuilder, StringRecord, Trim};
use reqwest::Method;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use super::target::{CheckMethod, Target};

const MIN_FIELDS: usize = 8;

#[derive(Error, Debug)]
pub enum TargetsFileError {
    #[error("Failed to read targets file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Expected at least 8 fields, found {0}")]
    TooFewFields(usize),
    #[error("Missing target name")]
    MissingName,
    #[error("Invalid HTTP method: {0}")]
    InvalidHttpMethod(String),
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("Invalid max redirects: {0}")]
    InvalidMaxRedirects(String),
}

/// Loads every valid target from the file at `path`.
///
/// Bad records are logged and skipped. Only a failure to open the file aborts
/// the load.
pub fn load_targets(path: impl AsRef<Path>) -> Result<Vec<Target>, TargetsFileError> {
    let path = path.as_ref();
    info!(path = ?path, "Loading targets.");
    let file = File::open(path).map_err(|e| {
        error!(path = ?path, error = %e, "Failed to open targets file.");
        TargetsFileError::Read(e)
    })?;
    let targets = parse_targets(file);
    info!(path = ?path, count = targets.len(), "Targets loaded.");
    Ok(targets)
}

/// Parses targets from any reader, skipping comments and malformed records.
pub fn parse_targets<R: Read>(reader: R) -> Vec<Target> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut targets = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let line = index + 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(line, error = %e, "Skipping unreadable record.");
                continue;
            }
        };

        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.get(0).is_some_and(|first| first.starts_with('#')) {
            warn!(line, record = %join_record(&record), "Skipping commented record.");
            continue;
        }

        match parse_record(&record) {
            Ok(target) => targets.push(target),
            Err(e) => warn!(line, error = %e, record = %join_record(&record), "Skipping malformed record."),
        }
    }
    targets
}

fn parse_record(record: &StringRecord) -> Result<Target, TargetsFileError> {
    if record.len() < MIN_FIELDS {
        return Err(TargetsFileError::TooFewFields(record.len()));
    }
    let field = |i: usize| record.get(i).unwrap_or_default();

    let name = field(0);
    if name.is_empty() {
        return Err(TargetsFileError::MissingName);
    }
    let method = CheckMethod::parse(field(1));

    let http_method = match (&method, field(3)) {
        (CheckMethod::Http, "") => Method::GET,
        (CheckMethod::Http, raw) => Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
            .map_err(|_| TargetsFileError::InvalidHttpMethod(raw.to_string()))?,
        _ => Method::GET,
    };

    let timeout = field(4)
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| TargetsFileError::InvalidTimeout(field(4).to_string()))?;

    let max_redirects = field(6)
        .parse::<usize>()
        .map_err(|_| TargetsFileError::InvalidMaxRedirects(field(6).to_string()))?;

    Ok(Target {
        name: name.to_string(),
        method,
        address: field(2).to_string(),
        http_method,
        timeout,
        allow_redirects: parse_flag(field(5)),
        max_redirects,
        check_body: parse_flag(field(7)),
        verify_ssl: record.get(8).map(parse_flag).unwrap_or(false),
    })
}

fn parse_flag(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}

fn join_record(record: &StringRecord) -> String {
    record.iter().collect::<Vec<_>>().join(", ")
}
