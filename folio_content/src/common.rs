use std::{
    fs, io,
    path::{Path, PathBuf},
    process::ExitStatus,
    result,
    time::SystemTime,
};

use folio_shared::thiserror;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
    #[error("IoError: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to decode image: {0}")]
    ImageError(#[from] image::ImageError),
    #[error("Failed to encode WebP: {0}")]
    WebPEncoding(String),
    #[error("External tool not found: {0}")]
    ToolNotFound(String),
    #[error("'{program}' exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("The compression did not produce the output file: {0}")]
    MissingOutput(PathBuf),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to parse the configuration: {0}")]
    ConfigParse(#[from] folio_shared::serde_yaml::Error),
}

/// Lowercase extension of the path without the dot.
pub(crate) fn extract_extension_from_path(path: &Path) -> Result<String> {
    Ok(path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_lowercase())
        .ok_or(Error::InvalidPath(path.to_owned()))?
        .to_owned())
}

pub(crate) fn extract_file_name_from_path(path: &Path) -> Result<String> {
    Ok(path
        .file_name()
        .and_then(|file_name| file_name.to_str())
        .ok_or(Error::InvalidPath(path.to_owned()))?
        .to_owned())
}

pub(crate) fn extract_file_stem_from_path(path: &Path) -> Result<String> {
    Ok(path
        .file_stem()
        .and_then(|file_stem| file_stem.to_str())
        .ok_or(Error::InvalidPath(path.to_owned()))?
        .to_owned())
}

pub(crate) fn modified_system_time(path: &Path) -> Option<SystemTime> {
    path.metadata().ok().and_then(|metadata| metadata.modified().ok())
}

/// Returns `true` if `derived` exists and was modified strictly after `source`.
pub(crate) fn is_up_to_date(source: &Path, derived: &Path) -> bool {
    let Some(source_modified) = modified_system_time(source) else {
        return false;
    };
    let Some(derived_modified) = modified_system_time(derived) else {
        return false;
    };
    derived_modified > source_modified
}

/// Writes `content` to a staging file next to `path` and renames it into place
/// so that readers never observe a partially written file.
pub(crate) fn write_staged(path: &Path, content: &[u8]) -> Result<()> {
    let file_name = extract_file_name_from_path(path)?;
    let staging_path = path.with_file_name(format!(".{file_name}.partial"));
    if let Err(err) = fs::write(&staging_path, content) {
        let _ = fs::remove_file(&staging_path);
        return Err(err.into());
    }
    fs::rename(&staging_path, path).map_err(|err| {
        let _ = fs::remove_file(&staging_path);
        Error::from(err)
    })
}
