//! Atomic tabular output.
//!
//! Rows are written to a temporary file next to the destination and renamed
//! over it only once the whole batch has been flushed to disk. A failed run
//! therefore never leaves a truncated file behind under the destination name.
//! The staged file takes the mode of the file it replaces, or 0644 when the
//! destination is new, so it stays readable the way a plain write would be.

use std::fs::Permissions;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use super::{CsvOptions, DatasetError};

/// Write `headers` followed by every row in `rows` to `dest`.
///
/// Returns the number of data rows written.
pub fn write_atomic<R>(
    dest: &Path,
    headers: &[String],
    rows: R,
    options: &CsvOptions,
) -> Result<u64, DatasetError>
where
    R: IntoIterator<Item = Vec<String>>,
{
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tmp = tempfile::Builder::new()
        .prefix(".anomalyscan-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| DatasetError::io(dest, e))?;
    debug!(tmp = %tmp.path().display(), dest = %dest.display(), "staging output");

    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(tmp);

    writer
        .write_record(headers)
        .map_err(|e| DatasetError::from_csv(dest, e))?;

    let mut written = 0u64;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| DatasetError::from_csv(dest, e))?;
        written += 1;
    }

    let mut tmp = writer
        .into_inner()
        .map_err(|e| DatasetError::io(dest, e.into_error()))?;
    tmp.flush().map_err(|e| DatasetError::io(dest, e))?;
    if let Some(perms) = output_permissions(dest) {
        tmp.as_file()
            .set_permissions(perms)
            .map_err(|e| DatasetError::io(dest, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| DatasetError::io(dest, e))?;

    // Dropping the temp file on any earlier return removes it.
    tmp.persist(dest)
        .map_err(|e| DatasetError::io(dest, e.error))?;

    info!(dest = %dest.display(), rows = written, "wrote output");
    Ok(written)
}

/// Permissions for the staged file: those of an existing destination,
/// otherwise the platform default for a freshly written output.
fn output_permissions(dest: &Path) -> Option<Permissions> {
    match std::fs::metadata(dest) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}
