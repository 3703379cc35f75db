//! Detection runs: load -> detect -> annotate -> emit.
//!
//! A run is a one-shot batch job. [`run`] executes it on the calling thread;
//! [`spawn`] moves it onto a tokio blocking worker so the caller is free
//! while the file is processed. Runs share no state with each other.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::dataset::{self, CsvOptions, Dataset, DatasetError};
use crate::detect::{cpu, login, Annotated, Annotation, DetectorKind};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("{kind} worker did not complete: {source}")]
    Worker {
        kind: DetectorKind,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Everything a run needs: what to detect, where to read, where to write.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub kind: DetectorKind,
    pub input: PathBuf,
    pub output: PathBuf,
    pub csv: CsvOptions,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub id: Uuid,
    pub detector: DetectorKind,
    pub input: PathBuf,
    pub output: PathBuf,
    pub records: u64,
    pub anomalies: u64,
    /// Record count per category: alert level for CPU runs, `normal` /
    /// `anomalous` for login runs.
    pub breakdown: BTreeMap<String, u64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Execute one run to completion on the current thread.
pub fn run(req: &RunRequest) -> Result<RunReport, DatasetError> {
    let id = Uuid::new_v4();
    let span = info_span!("run", %id, detector = %req.kind);
    let _guard = span.enter();
    let started_at = Utc::now();

    info!(input = %req.input.display(), "starting detection run");
    let data = dataset::load(&req.input, req.kind.required_columns(), &req.csv)?;

    let (anomalies, breakdown) = match req.kind {
        DetectorKind::Cpu => {
            let labels = cpu::detect(&data.numeric_column(cpu::CPU_USAGE)?);
            emit(&data, labels, &req.output, &req.csv)?
        }
        DetectorKind::Login => {
            let labels = login::detect(data.text_column(login::STATUS)?);
            emit(&data, labels, &req.output, &req.csv)?
        }
    };

    let report = RunReport {
        id,
        detector: req.kind,
        input: req.input.clone(),
        output: req.output.clone(),
        records: data.len() as u64,
        anomalies,
        breakdown,
        started_at,
        finished_at: Utc::now(),
    };
    info!(
        records = report.records,
        anomalies = report.anomalies,
        output = %report.output.display(),
        "detection run complete"
    );
    Ok(report)
}

/// Attach `labels` to `data`, write the result to `dest`, and return the
/// anomaly count with the per-category breakdown.
fn emit<A: Annotation>(
    data: &Dataset,
    labels: Vec<A>,
    dest: &Path,
    csv: &CsvOptions,
) -> Result<(u64, BTreeMap<String, u64>), DatasetError> {
    let annotated = Annotated::new(data, labels);
    if let Some(dir) = dest.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| DatasetError::io(dir, e))?;
    }
    dataset::write_atomic(dest, &annotated.headers(), annotated.rows(), csv)?;
    Ok((annotated.anomaly_count(), annotated.breakdown()))
}

/// Run `req` on a blocking worker. The handle resolves to the run's result.
pub fn spawn(req: RunRequest) -> JoinHandle<Result<RunReport, DatasetError>> {
    tokio::task::spawn_blocking(move || {
        let result = run(&req);
        if let Err(e) = &result {
            warn!(detector = %req.kind, error = %e, "detection run failed");
        }
        result
    })
}

/// Run every request concurrently, one worker each, and collect the
/// results in request order.
pub async fn run_all(requests: Vec<RunRequest>) -> Vec<Result<RunReport, RunError>> {
    let handles: Vec<_> = requests
        .into_iter()
        .map(|req| (req.kind, spawn(req)))
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (kind, handle) in handles {
        let result = match handle.await {
            Ok(r) => r.map_err(RunError::from),
            Err(source) => Err(RunError::Worker { kind, source }),
        };
        results.push(result);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ErrorKind;

    fn request(kind: DetectorKind, dir: &Path, input: &str) -> RunRequest {
        let src = dir.join("input.csv");
        std::fs::write(&src, input).unwrap();
        RunRequest {
            kind,
            input: src,
            output: dir.join("out.csv"),
            csv: CsvOptions::default(),
        }
    }

    #[test]
    fn test_cpu_run() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(
            DetectorKind::Cpu,
            dir.path(),
            "timestamp,cpu_usage\nt0,50\nt1,92\nt2,99\nt3,90\n",
        );
        let report = run(&req).unwrap();
        assert_eq!(report.records, 4);
        assert_eq!(report.anomalies, 2);
        assert_eq!(report.breakdown["Normal"], 2);
        assert_eq!(report.breakdown["Warning"], 1);
        assert_eq!(report.breakdown["Critical"], 1);

        let out = std::fs::read_to_string(&req.output).unwrap();
        assert_eq!(
            out,
            "timestamp,cpu_usage,is_anomaly,alert_level\n\
             t0,50,False,Normal\n\
             t1,92,True,Warning\n\
             t2,99,True,Critical\n\
             t3,90,False,Normal\n"
        );
    }

    #[test]
    fn test_login_run() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(
            DetectorKind::Login,
            dir.path(),
            "timestamp,user,status\nt0,alice,success\nt1,bob,failure\nt2,bob,failure\nt3,bob,failure\nt4,bob,success\n",
        );
        let report = run(&req).unwrap();
        assert_eq!(report.anomalies, 1);
        assert_eq!(report.breakdown["anomalous"], 1);
        assert_eq!(report.breakdown["normal"], 4);

        let out = std::fs::read_to_string(&req.output).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "timestamp,user,status,failed,fail_streak,is_anomaly");
        assert_eq!(lines[4], "t3,bob,failure,True,3,True");
        assert_eq!(lines[5], "t4,bob,success,False,0,False");
    }

    #[test]
    fn test_empty_input_is_zero_count() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(DetectorKind::Login, dir.path(), "timestamp,status\n");
        let report = run(&req).unwrap();
        assert_eq!(report.records, 0);
        assert_eq!(report.anomalies, 0);
        assert_eq!(
            std::fs::read_to_string(&req.output).unwrap(),
            "timestamp,status,failed,fail_streak,is_anomaly\n"
        );
    }

    #[test]
    fn test_breakdown_sums_to_record_count() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(DetectorKind::Cpu, dir.path(), "timestamp,cpu_usage\n");
        let report = run(&req).unwrap();
        assert_eq!(
            report.breakdown.keys().collect::<Vec<_>>(),
            ["Critical", "Normal", "Warning"]
        );
        assert!(report.breakdown.values().all(|&n| n == 0));

        let req = request(
            DetectorKind::Login,
            dir.path(),
            "timestamp,status\nt0,failure\nt1,failure\nt2,failure\nt3,failure\n",
        );
        let report = run(&req).unwrap();
        assert_eq!(report.breakdown["anomalous"], report.anomalies);
        assert_eq!(report.breakdown.values().sum::<u64>(), report.records);
    }

    #[test]
    fn test_bad_number_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(
            DetectorKind::Cpu,
            dir.path(),
            "timestamp,cpu_usage\nt0,50\nt1,n/a\n",
        );
        let err = run(&req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(!req.output.exists());
    }

    #[tokio::test]
    async fn test_spawn_delivers_report() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(DetectorKind::Cpu, dir.path(), "timestamp,cpu_usage\nt0,96\n");
        let report = spawn(req).await.unwrap().unwrap();
        assert_eq!(report.anomalies, 1);
    }

    #[tokio::test]
    async fn test_run_all_keeps_request_order() {
        let cpu_dir = tempfile::tempdir().unwrap();
        let login_dir = tempfile::tempdir().unwrap();
        let requests = vec![
            request(DetectorKind::Cpu, cpu_dir.path(), "timestamp,cpu_usage\nt0,91\n"),
            request(DetectorKind::Login, login_dir.path(), "timestamp,cpu_usage\nt0,91\n"),
        ];
        let results = run_all(requests).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().detector, DetectorKind::Cpu);
        match &results[1] {
            Err(RunError::Dataset(e)) => assert_eq!(e.kind(), ErrorKind::Schema),
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
