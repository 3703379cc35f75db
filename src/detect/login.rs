//! Login-failure streak detector.
//!
//! Records are scanned strictly in input order. The input is split into
//! maximal runs of equal `failed` flags and each record's streak is the
//! number of failures seen so far within its run, so a failure run counts
//! 1, 2, 3, ... and a success run stays at 0.

use serde::Serialize;

use super::{bool_cell, Annotation, LOGIN_FAILURE_THRESHOLD};

pub const TIMESTAMP: &str = "timestamp";
pub const STATUS: &str = "status";

/// The only status value treated as a failed attempt.
pub const FAILURE_STATUS: &str = "failure";

/// Labels computed for one login record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoginLabel {
    pub failed: bool,
    pub fail_streak: u64,
    pub is_anomaly: bool,
}

impl Annotation for LoginLabel {
    const COLUMNS: &'static [&'static str] = &["failed", "fail_streak", "is_anomaly"];
    const CATEGORIES: &'static [&'static str] = &["normal", "anomalous"];

    fn is_anomaly(&self) -> bool {
        self.is_anomaly
    }

    fn cells(&self) -> Vec<String> {
        vec![
            bool_cell(self.failed),
            self.fail_streak.to_string(),
            bool_cell(self.is_anomaly),
        ]
    }

    fn category(&self) -> &'static str {
        if self.is_anomaly {
            "anomalous"
        } else {
            "normal"
        }
    }
}

pub fn is_failure(status: &str) -> bool {
    status == FAILURE_STATUS
}

/// Running failure count within each run of equal `failed` values.
pub fn fail_streaks(failed: &[bool]) -> Vec<u64> {
    let mut streaks = Vec::with_capacity(failed.len());
    let mut run: Option<bool> = None;
    let mut count = 0u64;

    for &f in failed {
        if run != Some(f) {
            run = Some(f);
            count = 0;
        }
        count += u64::from(f);
        streaks.push(count);
    }
    streaks
}

/// Label every record from its `status` value, preserving order.
pub fn detect<I, S>(statuses: I) -> Vec<LoginLabel>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let failed: Vec<bool> = statuses
        .into_iter()
        .map(|s| is_failure(s.as_ref()))
        .collect();

    fail_streaks(&failed)
        .into_iter()
        .zip(failed)
        .map(|(fail_streak, failed)| LoginLabel {
            failed,
            fail_streak,
            is_anomaly: fail_streak >= LOGIN_FAILURE_THRESHOLD,
        })
        .collect()
}
