//! Record loader: reads a delimited file with a header row into a [`Dataset`].

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::{debug, info};

use super::{CsvOptions, Dataset, DatasetError, Record};

/// Read `path` and check that every column in `required` is present.
///
/// Nothing is returned unless the whole file parses; a malformed row
/// anywhere aborts the load.
pub fn load(path: &Path, required: &[&str], options: &CsvOptions) -> Result<Dataset, DatasetError> {
    let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DatasetError::from_csv(path, e))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            // Spreadsheet exports often lead with a UTF-8 BOM.
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();
    debug!(path = %path.display(), ?headers, "read header row");

    for column in required {
        if !headers.iter().any(|h| h == column) {
            return Err(DatasetError::Schema {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| DatasetError::from_csv(path, e))?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        records.push(Record::new(line, row.iter().map(String::from).collect()));
    }

    info!(path = %path.display(), rows = records.len(), "loaded dataset");
    Ok(Dataset::new(path.to_path_buf(), headers, records))
}
