use std::path::{Path, PathBuf};

use folio_shared::{
    log::{info, trace, warn},
    walkdir::WalkDir,
};

use crate::common::extract_extension_from_path;

/// Collects all files below `root` whose lowercase extension is in `extensions`.
///
/// The files are returned in a stable order (sorted by file name per directory).
/// Returns `None` if `root` doesn't exist.
pub(crate) fn collect_files(root: &Path, extensions: &[String]) -> Option<Vec<PathBuf>> {
    if !root.is_dir() {
        info!("Directory not found: {}", root.display());
        return None;
    }

    info!("Running inventory in path: {}", root.display());
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Failed to read directory entry below '{}': {err}", root.display());
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(extension) = extract_extension_from_path(entry.path()) else {
            trace!("Ignoring file without extension: {}", entry.path().display());
            continue;
        };
        if !extensions.iter().any(|candidate| candidate.eq_ignore_ascii_case(&extension)) {
            continue;
        }

        files.push(entry.into_path());
    }

    trace!("Found {} candidate files in '{}'", files.len(), root.display());
    Some(files)
}
