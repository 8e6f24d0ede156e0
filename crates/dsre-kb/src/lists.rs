//! Plain id list files

use std::collections::HashSet;
use std::path::Path;

use dsre_core::{read_to_string, DsreError, Result};

/// Load a stop-id list: the first whitespace-delimited token of each line.
///
/// A missing file means no stop ids.
pub fn load_stop_list(path: impl AsRef<Path>) -> Result<HashSet<String>> {
    let path = path.as_ref();
    if !path.is_file() {
        tracing::warn!("Stop list {} not found, no ids will be skipped", path.display());
        return Ok(HashSet::new());
    }

    let content = read_to_string(path)?;
    Ok(content
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect())
}

/// Load one column of a tab-delimited file as an id set
pub fn load_id_list(path: impl AsRef<Path>, column: usize) -> Result<HashSet<String>> {
    let path = path.as_ref();
    let content = read_to_string(path)?;
    let mut ids = HashSet::new();

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let id = line
            .split('\t')
            .nth(column)
            .ok_or_else(|| DsreError::MalformedRecord {
                path: path.to_path_buf(),
                line: line_no + 1,
                message: format!("missing column {column}"),
            })?;
        ids.insert(id.to_string());
    }

    Ok(ids)
}
