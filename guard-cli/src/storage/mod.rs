use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use miette::{Context, IntoDiagnostic, Result};
use tempfile::NamedTempFile;

pub mod fs_storage;

pub use fs_storage::FileSystemStorage;

/// Writes `contents` to a fresh temp file beside `path` and renames it into
/// place, so readers see either the old file or the new one. Every call gets
/// its own temp file; overlapping writers end up last-writer-wins.
async fn write_atomic(path: &Utf8Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_owned(),
        _ => Utf8PathBuf::from("."),
    };
    let path = path.to_owned();
    let contents = contents.to_vec();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&dir)
            .into_diagnostic()
            .wrap_err_with(|| format!("creating temp file in {}", dir))?;
        tmp.write_all(&contents)
            .into_diagnostic()
            .wrap_err_with(|| format!("writing {}", path))?;
        tmp.persist(&path)
            .into_diagnostic()
            .wrap_err_with(|| format!("moving {} into place", path))?;
        Ok(())
    })
    .await
    .into_diagnostic()?
}
