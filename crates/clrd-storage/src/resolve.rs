use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{StorageError, StorageResult};

fn name_matches(name: &std::ffi::OsStr, identifier: &str) -> bool {
    name.to_str()
        .map(|name| name.starts_with(identifier))
        .unwrap_or(false)
}

/// Walk `root` for the first regular file whose base name starts with `identifier`.
///
/// Unreadable entries are skipped, except when the failing entry's own name
/// matches the identifier: that error is returned instead of a miss. Blocking;
/// call from `spawn_blocking`.
pub(crate) fn find_by_prefix(root: &Path, identifier: &str) -> StorageResult<Option<PathBuf>> {
    if identifier.is_empty() || !root.is_dir() {
        return Ok(None);
    }

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let is_candidate = err
                    .path()
                    .and_then(Path::file_name)
                    .map(|name| name_matches(name, identifier))
                    .unwrap_or(false);

                if err.depth() == 0 || is_candidate {
                    return Err(StorageError::ResolveFailed(format!(
                        "Failed to read {}: {}",
                        err.path()
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| root.display().to_string()),
                        err
                    )));
                }

                tracing::debug!(error = %err, "Skipping unreadable entry during resolve");
                continue;
            }
        };

        if entry.file_type().is_file() && name_matches(entry.file_name(), identifier) {
            return Ok(Some(entry.into_path()));
        }
    }

    Ok(None)
}
