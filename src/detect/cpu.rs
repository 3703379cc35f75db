//! CPU utilization threshold detector.
//!
//! Each sample is judged on its own value; there is no history.

use serde::Serialize;

use super::{bool_cell, AlertLevel, Annotation, CPU_CRITICAL_THRESHOLD, CPU_THRESHOLD};

pub const TIMESTAMP: &str = "timestamp";
pub const CPU_USAGE: &str = "cpu_usage";

/// Labels computed for one CPU sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CpuLabel {
    pub is_anomaly: bool,
    pub alert_level: AlertLevel,
}

impl CpuLabel {
    pub fn classify(cpu_usage: f64) -> Self {
        Self {
            is_anomaly: cpu_usage > CPU_THRESHOLD,
            alert_level: alert_level(cpu_usage),
        }
    }
}

impl Annotation for CpuLabel {
    const COLUMNS: &'static [&'static str] = &["is_anomaly", "alert_level"];
    const CATEGORIES: &'static [&'static str] = &["Normal", "Warning", "Critical"];

    fn is_anomaly(&self) -> bool {
        self.is_anomaly
    }

    fn cells(&self) -> Vec<String> {
        vec![bool_cell(self.is_anomaly), self.alert_level.to_string()]
    }

    fn category(&self) -> &'static str {
        self.alert_level.as_str()
    }
}

/// Both boundaries are strict: 90 is Normal and 95 is Warning.
/// NaN compares false everywhere and lands on Normal.
pub fn alert_level(cpu_usage: f64) -> AlertLevel {
    if cpu_usage > CPU_CRITICAL_THRESHOLD {
        AlertLevel::Critical
    } else if cpu_usage > CPU_THRESHOLD {
        AlertLevel::Warning
    } else {
        AlertLevel::Normal
    }
}

/// Label every sample, preserving order.
pub fn detect(cpu_usage: &[f64]) -> Vec<CpuLabel> {
    cpu_usage.iter().copied().map(CpuLabel::classify).collect()
}
