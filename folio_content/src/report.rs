use std::{
    fmt,
    path::{Path, PathBuf},
};

use folio_shared::{
    format_bytes,
    log::{error, info},
};

/// Why a file was not converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The file is an output of an earlier run.
    AlreadyDerived,
    /// The file is on the exclusion list.
    Excluded,
    /// The derived file is newer than the source.
    UpToDate,
    /// The format gains nothing from reprocessing.
    UnsupportedFormat,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyDerived => write!(f, "already compressed"),
            SkipReason::Excluded => write!(f, "quality loss"),
            SkipReason::UpToDate => write!(f, "already optimized"),
            SkipReason::UnsupportedFormat => write!(f, "unsupported format"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Converted { input_size: u64, output_size: u64 },
    Skipped(SkipReason),
    Failed(String),
}

/// Result of processing a single file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub input: PathBuf,
    /// Path of the derived file. `None` if the input has no derived counterpart.
    pub output: Option<PathBuf>,
    pub outcome: Outcome,
}

impl FileReport {
    pub fn converted(input: impl Into<PathBuf>, output: impl Into<PathBuf>, input_size: u64, output_size: u64) -> Self {
        Self {
            input: input.into(),
            output: Some(output.into()),
            outcome: Outcome::Converted { input_size, output_size },
        }
    }

    pub fn skipped(input: impl Into<PathBuf>, output: Option<PathBuf>, reason: SkipReason) -> Self {
        Self {
            input: input.into(),
            output,
            outcome: Outcome::Skipped(reason),
        }
    }

    pub fn failed(input: impl Into<PathBuf>, output: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output,
            outcome: Outcome::Failed(message.into()),
        }
    }

    /// Percentage of bytes saved by the conversion. Negative if the output grew.
    pub fn savings_percent(&self) -> Option<f64> {
        match self.outcome {
            Outcome::Converted { input_size, output_size } => Some(savings_percent(input_size, output_size)),
            _ => None,
        }
    }

    /// Logs the outcome in the same one-line format for every operation.
    pub(crate) fn log(&self) {
        let input_name = file_name(&self.input);
        match &self.outcome {
            Outcome::Converted { input_size, output_size } => {
                let output_name = self.output.as_deref().map(file_name).unwrap_or_default();
                info!(
                    "{input_name} -> {output_name} ({} -> {}, -{:.1}%)",
                    format_bytes(*input_size),
                    format_bytes(*output_size),
                    savings_percent(*input_size, *output_size)
                );
            }
            Outcome::Skipped(reason) => info!("Skipping ({reason}): {input_name}"),
            Outcome::Failed(message) => error!("Error processing {}: {message}", self.input.display()),
        }
    }
}

/// Outcome of a whole run over one directory tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub root: PathBuf,
    /// `false` if the root directory didn't exist. The run is a no-op then.
    pub root_found: bool,
    pub files: Vec<FileReport>,
}

impl Report {
    pub(crate) fn new(root: impl Into<PathBuf>, root_found: bool) -> Self {
        Self {
            root: root.into(),
            root_found,
            files: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, file_report: FileReport) {
        file_report.log();
        self.files.push(file_report);
    }

    pub fn converted(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|file| matches!(file.outcome, Outcome::Converted { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|file| matches!(file.outcome, Outcome::Skipped(_)))
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|file| matches!(file.outcome, Outcome::Failed(_)))
    }

    /// Returns the report of the file at `input`.
    pub fn get(&self, input: impl AsRef<Path>) -> Option<&FileReport> {
        self.files.iter().find(|file| file.input == input.as_ref())
    }

    /// Sum of input and output sizes over all converted files.
    pub fn total_sizes(&self) -> (u64, u64) {
        self.converted().fold((0, 0), |(input_total, output_total), file| match file.outcome {
            Outcome::Converted { input_size, output_size } => (input_total + input_size, output_total + output_size),
            _ => (input_total, output_total),
        })
    }

    pub fn log_summary(&self) {
        let (input_total, output_total) = self.total_sizes();
        info!(
            "{}: {} converted, {} skipped, {} failed ({} -> {})",
            self.root.display(),
            self.converted().count(),
            self.skipped().count(),
            self.failed().count(),
            format_bytes(input_total),
            format_bytes(output_total),
        );
    }
}

/// `(1 - output / input) * 100`. An empty input saves nothing.
pub fn savings_percent(input_size: u64, output_size: u64) -> f64 {
    if input_size == 0 {
        return 0.0;
    }
    (1.0 - output_size as f64 / input_size as f64) * 100.0
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
