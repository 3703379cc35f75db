//! Anomaly detectors and record annotation.

pub mod cpu;
pub mod login;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;

/// CPU utilization (percent) above which a sample is anomalous.
pub const CPU_THRESHOLD: f64 = 90.0;

/// CPU utilization (percent) above which an anomalous sample is critical.
pub const CPU_CRITICAL_THRESHOLD: f64 = 95.0;

/// Consecutive login failures at which a record is flagged.
pub const LOGIN_FAILURE_THRESHOLD: u64 = 3;

/// Severity tag attached to every CPU sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertLevel {
    Normal,
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Normal => "Normal",
            AlertLevel::Warning => "Warning",
            AlertLevel::Critical => "Critical",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which detector a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Cpu,
    Login,
}

impl DetectorKind {
    /// Columns the input must carry for this detector.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            DetectorKind::Cpu => &[cpu::TIMESTAMP, cpu::CPU_USAGE],
            DetectorKind::Login => &[login::TIMESTAMP, login::STATUS],
        }
    }

    /// Columns appended to every output row, in output order.
    pub fn computed_columns(self) -> &'static [&'static str] {
        match self {
            DetectorKind::Cpu => cpu::CpuLabel::COLUMNS,
            DetectorKind::Login => login::LoginLabel::COLUMNS,
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorKind::Cpu => f.write_str("cpu"),
            DetectorKind::Login => f.write_str("login"),
        }
    }
}

/// Per-record output of a detector.
pub trait Annotation {
    /// Names of the computed columns, in the order `cells` returns them.
    const COLUMNS: &'static [&'static str];

    /// Every value `category` can return, in reporting order.
    const CATEGORIES: &'static [&'static str];

    fn is_anomaly(&self) -> bool;

    /// Cell text for the computed columns.
    fn cells(&self) -> Vec<String>;

    /// Bucket this record is counted under in a run breakdown.
    fn category(&self) -> &'static str;
}

/// Boolean cell text. Matches the `True`/`False` spelling of the files the
/// tool has always produced so downstream readers keep working.
pub(crate) fn bool_cell(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}

/// A dataset paired with one label per record.
///
/// A computed column whose name already appears in the input replaces that
/// column in place; the others are appended after the input columns.
#[derive(Debug)]
pub struct Annotated<'a, A> {
    dataset: &'a Dataset,
    labels: Vec<A>,
    /// Input column index each computed column overwrites, if any.
    placement: Vec<Option<usize>>,
}

impl<'a, A: Annotation> Annotated<'a, A> {
    /// Pair `labels` with the records of `dataset`.
    ///
    /// # Panics
    ///
    /// Panics if the label count differs from the record count; detectors
    /// always emit exactly one label per record.
    pub fn new(dataset: &'a Dataset, labels: Vec<A>) -> Self {
        assert_eq!(
            dataset.len(),
            labels.len(),
            "detector must emit one label per record"
        );
        let placement = A::COLUMNS
            .iter()
            .map(|c| dataset.headers().iter().position(|h| h == c))
            .collect();
        Self {
            dataset,
            labels,
            placement,
        }
    }

    pub fn labels(&self) -> &[A] {
        &self.labels
    }

    pub fn anomaly_count(&self) -> u64 {
        self.labels.iter().filter(|l| l.is_anomaly()).count() as u64
    }

    /// Record count per category. Every category is present, even at zero.
    pub fn breakdown(&self) -> BTreeMap<String, u64> {
        let mut counts: BTreeMap<String, u64> =
            A::CATEGORIES.iter().map(|c| (c.to_string(), 0)).collect();
        for label in &self.labels {
            *counts.entry(label.category().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Input headers, then the computed columns not already among them.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = self.dataset.headers().to_vec();
        for (column, slot) in A::COLUMNS.iter().zip(&self.placement) {
            if slot.is_none() {
                headers.push(column.to_string());
            }
        }
        headers
    }

    /// Output rows laid out to match [`Annotated::headers`].
    pub fn rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.dataset
            .records()
            .iter()
            .zip(&self.labels)
            .map(move |(record, label)| {
                let mut row = record.fields().to_vec();
                for (cell, slot) in label.cells().into_iter().zip(&self.placement) {
                    match slot {
                        Some(idx) if *idx < row.len() => row[*idx] = cell,
                        Some(_) => {}
                        None => row.push(cell),
                    }
                }
                row
            })
    }
}
