use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Writes an assembled table to `path`.
///
/// The bytes go to `<path>.tmp` first, which is fsynced and then atomically
/// renamed over `path`. A crash mid-write leaves only the temp file behind.
pub fn write_table(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)
        .with_context(|| format!("creating {}", tmp_path.display()))?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {} into place", tmp_path.display()))?;

    // The rename is only durable once the directory entry is synced.
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    debug!(path = %path.display(), bytes = bytes.len(), "wrote table");
    Ok(())
}
