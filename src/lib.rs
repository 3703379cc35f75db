//! anomalyscan -- batch anomaly detection for CPU utilization and
//! login-attempt logs.
//!
//! A run loads a delimited log file, labels every record with one of two
//! fixed-threshold detectors, writes the annotated records back out and
//! reports how many were anomalous.

pub mod config;
pub mod dataset;
pub mod detect;
pub mod report;
pub mod runner;

use std::path::PathBuf;

use anyhow::Result;

use crate::config::AppConfig;
use crate::detect::DetectorKind;
use crate::runner::RunRequest;

/// Build a run request for `kind` reading `input`, with the output path and
/// delimiter taken from `config`.
pub fn request(config: &AppConfig, kind: DetectorKind, input: PathBuf) -> Result<RunRequest> {
    Ok(RunRequest {
        kind,
        input,
        output: config.output.destination(kind),
        csv: config.csv.options()?,
    })
}
