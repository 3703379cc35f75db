//! Human-readable run summaries.

use crate::detect::DetectorKind;
use crate::runner::RunReport;

/// One-line completion message, e.g. `3 anomalies saved to cpu_anomaly_output.csv`.
pub fn format_summary(report: &RunReport) -> String {
    let noun = match report.detector {
        DetectorKind::Cpu => "anomalies",
        DetectorKind::Login => "suspicious events",
    };
    format!(
        "{} {} saved to {}",
        report.anomalies,
        noun,
        report.output.display()
    )
}

/// Multi-line summary: the completion message followed by the per-label breakdown.
pub fn format_details(report: &RunReport) -> String {
    let mut out = format!(
        "{}\n{} record{} scanned from {} ({} detector, run {})\n",
        format_summary(report),
        report.records,
        if report.records == 1 { "" } else { "s" },
        report.input.display(),
        report.detector,
        report.id,
    );
    for (label, count) in &report.breakdown {
        out.push_str(&format!("  {:<10} {}\n", label, count));
    }
    out
}
