//! TOML configuration for anomalyscan.
//!
//! Layered lookup: an explicit path, then the `ANOMALYSCAN_CONFIG`
//! environment variable, then `./anomalyscan.toml`, then compiled-in
//! defaults. Detection thresholds are fixed and not configurable here.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dataset::CsvOptions;
use crate::detect::DetectorKind;

pub const CONFIG_ENV: &str = "ANOMALYSCAN_CONFIG";
pub const LOCAL_CONFIG: &str = "anomalyscan.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub csv: CsvConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.csv.options()?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration. An explicit path must load; the environment
    /// variable and local file fall back to defaults with a warning.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "{CONFIG_ENV} set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Where annotated files are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the output files. Created if missing.
    pub dir: PathBuf,
    pub cpu_file: String,
    pub login_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            cpu_file: "cpu_anomaly_output.csv".to_string(),
            login_file: "login_anomaly_output.csv".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn destination(&self, kind: DetectorKind) -> PathBuf {
        match kind {
            DetectorKind::Cpu => self.dir.join(&self.cpu_file),
            DetectorKind::Login => self.dir.join(&self.login_file),
        }
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// Single ASCII field delimiter used for both input and output.
    pub delimiter: String,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
        }
    }
}

impl CsvConfig {
    pub fn options(&self) -> Result<CsvOptions> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(CsvOptions { delimiter: *b }),
            _ => bail!(
                "csv.delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.output.dir, PathBuf::from("."));
        assert_eq!(
            cfg.output.destination(DetectorKind::Cpu),
            PathBuf::from("./cpu_anomaly_output.csv")
        );
        assert_eq!(
            cfg.output.destination(DetectorKind::Login),
            PathBuf::from("./login_anomaly_output.csv")
        );
        assert_eq!(cfg.csv.options().unwrap(), CsvOptions::default());
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[output]
dir = "/var/lib/anomalyscan"
cpu_file = "cpu.csv"
login_file = "login.csv"

[csv]
delimiter = ";"

[logging]
level = "debug"
format = "json"
"#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            cfg.output.destination(DetectorKind::Cpu),
            PathBuf::from("/var/lib/anomalyscan/cpu.csv")
        );
        assert_eq!(cfg.csv.options().unwrap().delimiter, b';');
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("[output]\ndir = \"out\"\n").unwrap();
        assert_eq!(cfg.output.dir, PathBuf::from("out"));
        assert_eq!(cfg.output.cpu_file, "cpu_anomaly_output.csv");
        assert_eq!(cfg.csv.delimiter, ",");
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_bad_delimiter_rejected() {
        let cfg = CsvConfig {
            delimiter: "||".to_string(),
        };
        assert!(cfg.options().is_err());
        let cfg = CsvConfig {
            delimiter: "é".to_string(),
        };
        assert!(cfg.options().is_err());
    }

    #[test]
    fn test_explicit_path_must_load() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::resolve(Some(&dir.path().join("missing.toml"))).is_err());

        let path = dir.path().join("cfg.toml");
        std::fs::write(&path, "[csv]\ndelimiter = \"\\t\"\n").unwrap();
        let cfg = AppConfig::resolve(Some(&path)).unwrap();
        assert_eq!(cfg.csv.options().unwrap().delimiter, b'\t');
    }
}
