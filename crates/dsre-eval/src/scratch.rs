//! Per-fold scratch directories

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use dsre_core::{DsreError, Result};

/// `fold<i>-<UTC timestamp>`
pub fn scratch_dir_name(fold_index: usize, timestamp: DateTime<Utc>) -> String {
    format!("fold{}-{}", fold_index, timestamp.format("%Y%m%dT%H%M%S%.6fZ"))
}

/// Create a fresh scratch directory for a fold under `root`
pub fn prepare_scratch_dir(root: impl AsRef<Path>, fold_index: usize) -> Result<PathBuf> {
    prepare_scratch_dir_at(root, fold_index, Utc::now())
}

/// Create the scratch directory for a given timestamp, replacing any
/// leftover directory at the same path
pub fn prepare_scratch_dir_at(
    root: impl AsRef<Path>,
    fold_index: usize,
    timestamp: DateTime<Utc>,
) -> Result<PathBuf> {
    let dir = root.as_ref().join(scratch_dir_name(fold_index, timestamp));
    if dir.exists() {
        tracing::debug!("Removing stale scratch directory {}", dir.display());
        std::fs::remove_dir_all(&dir).map_err(|e| DsreError::io(&dir, e))?;
    }
    std::fs::create_dir_all(&dir).map_err(|e| DsreError::io(&dir, e))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_name_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(scratch_dir_name(3, ts), "fold3-20240305T070809.000000Z");
    }

    #[test]
    fn test_stale_directory_replaced() {
        let root = tempfile::tempdir().unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let dir = prepare_scratch_dir_at(root.path(), 0, ts).unwrap();
        std::fs::write(dir.join("checkpoint"), "old").unwrap();

        let again = prepare_scratch_dir_at(root.path(), 0, ts).unwrap();
        assert_eq!(again, dir);
        assert!(again.is_dir());
        assert!(!again.join("checkpoint").exists());
    }
}
