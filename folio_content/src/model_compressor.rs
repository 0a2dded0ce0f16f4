use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use folio_shared::log::{info, warn};

use crate::{
    common::{extract_extension_from_path, extract_file_name_from_path, extract_file_stem_from_path, is_up_to_date},
    inventory::collect_files,
    FileReport, GltfTransformCli, MeshCompressor, ModelCompressionConfig, Report, Result, SkipReason,
};

/// Writes a Draco compressed sibling `<base>-draco.<ext>` for every model below the configured root.
pub struct ModelCompressor {
    config: ModelCompressionConfig,
    mesh_compressor: Box<dyn MeshCompressor>,
}

impl ModelCompressor {
    /// Creates a [`ModelCompressor`] that compresses with the `gltf-transform` command line tool.
    pub fn new(config: ModelCompressionConfig) -> Self {
        Self::with_mesh_compressor(config, Box::new(GltfTransformCli::new()))
    }

    /// Creates a [`ModelCompressor`] with a custom compression transform.
    pub fn with_mesh_compressor(config: ModelCompressionConfig, mesh_compressor: Box<dyn MeshCompressor>) -> Self {
        Self { config, mesh_compressor }
    }

    pub fn config(&self) -> &ModelCompressionConfig {
        &self.config
    }

    /// Compresses all models below the configured root. Never fails as a whole:
    /// per-file failures are logged and recorded in the [`Report`].
    pub fn run(&self) -> Report {
        let root = &self.config.root;
        info!("Starting Draco compression of the models in '{}'", root.display());

        let Some(files) = collect_files(root, &self.config.extensions) else {
            return Report::new(root, false);
        };

        let mut report = Report::new(root, true);
        for file in files {
            report.push(self.compress_model(&file));
        }
        report
    }

    /// Path of the compressed sibling: `models/room.glb` -> `models/room-draco.glb`.
    pub fn derived_path(&self, input: &Path) -> Result<PathBuf> {
        let stem = extract_file_stem_from_path(input)?;
        let extension = extract_extension_from_path(input)?;
        Ok(input.with_file_name(format!("{stem}{}.{extension}", self.config.derived_marker)))
    }

    /// Returns `true` if the file at `path` is an output of an earlier run.
    pub fn is_derived(&self, path: &Path) -> bool {
        extract_file_name_from_path(path)
            .map(|file_name| file_name.contains(&self.config.derived_marker))
            .unwrap_or(false)
    }

    /// Compresses a single model unless one of the skip rules applies.
    pub fn compress_model(&self, input: &Path) -> FileReport {
        let file_name = match extract_file_name_from_path(input) {
            Ok(file_name) => file_name,
            Err(err) => return FileReport::failed(input, None, err.to_string()),
        };

        if self.is_derived(input) {
            return FileReport::skipped(input, None, SkipReason::AlreadyDerived);
        }

        if self.config.excluded_files.contains(&file_name) {
            return FileReport::skipped(input, None, SkipReason::Excluded);
        }

        let output = match self.derived_path(input) {
            Ok(output) => output,
            Err(err) => return FileReport::failed(input, None, err.to_string()),
        };

        if self.config.skip_up_to_date && is_up_to_date(input, &output) {
            return FileReport::skipped(input, Some(output), SkipReason::UpToDate);
        }

        info!("Compressing: {file_name} ({})...", self.mesh_compressor.name());
        let previous_output = OutputState::of(&output);
        match self.compress_into(input, &output) {
            Ok((input_size, output_size)) => FileReport::converted(input, output, input_size, output_size),
            Err(err) => {
                if OutputState::of(&output) != previous_output {
                    remove_partial_output(&output);
                }
                FileReport::failed(input, Some(output), err.to_string())
            }
        }
    }

    fn compress_into(&self, input: &Path, output: &Path) -> Result<(u64, u64)> {
        let input_size = fs::metadata(input)?.len();
        self.mesh_compressor.compress(input, output)?;
        let output_size = fs::metadata(output)
            .map_err(|_| crate::Error::MissingOutput(output.to_owned()))?
            .len();
        Ok((input_size, output_size))
    }
}

/// Size and modification time of a file, `None` if it doesn't exist. A failed
/// compression only removes output that changed during the attempt.
#[derive(Debug, PartialEq, Eq)]
struct OutputState(Option<(u64, Option<SystemTime>)>);

impl OutputState {
    fn of(path: &Path) -> Self {
        Self(
            fs::metadata(path)
                .ok()
                .map(|metadata| (metadata.len(), metadata.modified().ok())),
        )
    }
}

fn remove_partial_output(output: &Path) {
    if !output.exists() {
        return;
    }
    if let Err(err) = fs::remove_file(output) {
        warn!("Failed to remove the partial output '{}': {err}", output.display());
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        fs,
        path::{Path, PathBuf},
        rc::Rc,
    };

    use folio_test::{setup_logger, write_sized_file};
    use tempdir::TempDir;

    use super::*;
    use crate::{Error, Outcome};

    /// Halves the model and records every invocation.
    #[derive(Default, Clone)]
    struct HalvingCompressor {
        calls: Rc<RefCell<Vec<PathBuf>>>,
        fail_for: Option<String>,
    }

    impl MeshCompressor for HalvingCompressor {
        fn name(&self) -> &str {
            "halving"
        }

        fn compress(&self, input: &Path, output: &Path) -> Result<()> {
            self.calls.borrow_mut().push(input.to_owned());
            if self.fail_for.as_deref() == input.file_name().and_then(|name| name.to_str()) {
                // Simulates a tool that crashes after starting to write.
                fs::write(output, b"partial")?;
                return Err(Error::InvalidPath(input.to_owned()));
            }
            let content = fs::read(input)?;
            fs::write(output, &content[..content.len() / 2])?;
            Ok(())
        }
    }

    fn config(root: &Path) -> ModelCompressionConfig {
        ModelCompressionConfig {
            root: root.to_owned(),
            ..ModelCompressionConfig::default()
        }
    }

    #[test]
    fn derived_path() {
        let compressor = ModelCompressor::new(ModelCompressionConfig::default());
        assert_eq!(
            compressor.derived_path(Path::new("public/models/room.glb")).unwrap(),
            PathBuf::from("public/models/room-draco.glb")
        );
        assert_eq!(
            compressor.derived_path(Path::new("scene.gltf")).unwrap(),
            PathBuf::from("scene-draco.gltf")
        );
    }

    #[test]
    fn compresses_and_skips_derived() {
        setup_logger();
        let root = TempDir::new("models").unwrap();
        write_sized_file(root.path().join("a.glb"), 200_000);
        write_sized_file(root.path().join("a-draco.glb"), 1_000);

        let mesh_compressor = HalvingCompressor::default();
        let compressor = ModelCompressor::with_mesh_compressor(config(root.path()), Box::new(mesh_compressor.clone()));
        let report = compressor.run();

        assert!(report.root_found);
        assert_eq!(*mesh_compressor.calls.borrow(), vec![root.path().join("a.glb")]);
        assert_eq!(
            report.get(root.path().join("a.glb")).unwrap().outcome,
            Outcome::Converted {
                input_size: 200_000,
                output_size: 100_000
            }
        );
        assert_eq!(
            report.get(root.path().join("a-draco.glb")).unwrap().outcome,
            Outcome::Skipped(SkipReason::AlreadyDerived)
        );
        assert!(!root.path().join("a-draco-draco.glb").exists());
        assert_eq!(fs::metadata(root.path().join("a-draco.glb")).unwrap().len(), 100_000);
        assert_eq!(fs::metadata(root.path().join("a.glb")).unwrap().len(), 200_000);
    }

    #[test]
    fn rerun_creates_no_new_files() {
        setup_logger();
        let root = TempDir::new("models").unwrap();
        write_sized_file(root.path().join("room.glb"), 4_000);
        write_sized_file(root.path().join("nested/desk.gltf"), 2_000);

        let compressor = ModelCompressor::with_mesh_compressor(config(root.path()), Box::new(HalvingCompressor::default()));
        compressor.run();
        let count_files = || {
            folio_shared::walkdir::WalkDir::new(root.path())
                .into_iter()
                .filter(|entry| entry.as_ref().unwrap().file_type().is_file())
                .count()
        };
        let after_first_run = count_files();
        assert_eq!(after_first_run, 4);

        let report = compressor.run();
        assert_eq!(count_files(), after_first_run);
        assert_eq!(report.skipped().count(), 2);
        assert!(report
            .skipped()
            .all(|file| file.outcome == Outcome::Skipped(SkipReason::AlreadyDerived)));
    }

    #[test]
    fn excluded_models_never_reach_the_transform() {
        setup_logger();
        let root = TempDir::new("models").unwrap();
        write_sized_file(root.path().join("nit.glb"), 1_000);
        write_sized_file(root.path().join("sub/scrn.glb"), 1_000);
        write_sized_file(root.path().join("room.glb"), 1_000);

        let mesh_compressor = HalvingCompressor::default();
        let compressor = ModelCompressor::with_mesh_compressor(config(root.path()), Box::new(mesh_compressor.clone()));
        let report = compressor.run();

        assert_eq!(*mesh_compressor.calls.borrow(), vec![root.path().join("room.glb")]);
        assert_eq!(
            report.get(root.path().join("nit.glb")).unwrap().outcome,
            Outcome::Skipped(SkipReason::Excluded)
        );
        assert_eq!(
            report.get(root.path().join("sub/scrn.glb")).unwrap().outcome,
            Outcome::Skipped(SkipReason::Excluded)
        );
        assert!(!root.path().join("nit-draco.glb").exists());
    }

    #[test]
    fn failure_does_not_abort_the_run() {
        setup_logger();
        let root = TempDir::new("models").unwrap();
        write_sized_file(root.path().join("a.glb"), 1_000);
        write_sized_file(root.path().join("b.glb"), 1_000);
        write_sized_file(root.path().join("c.glb"), 1_000);

        let mesh_compressor = HalvingCompressor {
            fail_for: Some("b.glb".to_owned()),
            ..HalvingCompressor::default()
        };
        let compressor = ModelCompressor::with_mesh_compressor(config(root.path()), Box::new(mesh_compressor.clone()));
        let report = compressor.run();

        assert_eq!(mesh_compressor.calls.borrow().len(), 3);
        assert_eq!(report.converted().count(), 2);
        assert_eq!(report.failed().count(), 1);
        assert!(matches!(report.get(root.path().join("b.glb")).unwrap().outcome, Outcome::Failed(_)));
        assert!(!root.path().join("b-draco.glb").exists());
        assert!(root.path().join("b.glb").exists());
        assert!(root.path().join("c-draco.glb").exists());
    }

    #[test]
    fn failed_rerun_keeps_the_previous_output() {
        struct UnavailableCompressor;
        impl MeshCompressor for UnavailableCompressor {
            fn name(&self) -> &str {
                "unavailable"
            }
            fn compress(&self, _input: &Path, _output: &Path) -> Result<()> {
                Err(Error::ToolNotFound("gltf-transform".to_owned()))
            }
        }

        setup_logger();
        let root = TempDir::new("models").unwrap();
        write_sized_file(root.path().join("a.glb"), 2_000);
        ModelCompressor::with_mesh_compressor(config(root.path()), Box::new(HalvingCompressor::default())).run();
        let derived = root.path().join("a-draco.glb");
        let previous = fs::read(&derived).unwrap();

        let report = ModelCompressor::with_mesh_compressor(config(root.path()), Box::new(UnavailableCompressor)).run();

        assert!(matches!(
            report.get(root.path().join("a.glb")).unwrap().outcome,
            Outcome::Failed(_)
        ));
        assert_eq!(fs::read(&derived).unwrap(), previous);
    }

    #[test]
    fn missing_output_is_a_failure() {
        struct SilentCompressor;
        impl MeshCompressor for SilentCompressor {
            fn name(&self) -> &str {
                "silent"
            }
            fn compress(&self, _input: &Path, _output: &Path) -> Result<()> {
                Ok(())
            }
        }

        let root = TempDir::new("models").unwrap();
        write_sized_file(root.path().join("a.glb"), 10);
        let compressor = ModelCompressor::with_mesh_compressor(config(root.path()), Box::new(SilentCompressor));
        let report = compressor.run();
        assert_eq!(report.failed().count(), 1);
    }

    #[test]
    fn up_to_date_models_are_skipped_when_enabled() {
        setup_logger();
        let root = TempDir::new("models").unwrap();
        write_sized_file(root.path().join("a.glb"), 1_000);
        write_sized_file(root.path().join("a-draco.glb"), 300);
        folio_test::set_modified_ago(root.path().join("a.glb"), 60);

        let mesh_compressor = HalvingCompressor::default();
        let config = ModelCompressionConfig {
            skip_up_to_date: true,
            ..config(root.path())
        };
        let compressor = ModelCompressor::with_mesh_compressor(config, Box::new(mesh_compressor.clone()));
        let report = compressor.run();

        assert!(mesh_compressor.calls.borrow().is_empty());
        assert_eq!(
            report.get(root.path().join("a.glb")).unwrap().outcome,
            Outcome::Skipped(SkipReason::UpToDate)
        );
    }

    #[test]
    fn missing_root_is_a_no_op() {
        setup_logger();
        let root = TempDir::new("models").unwrap();
        let mesh_compressor = HalvingCompressor::default();
        let compressor =
            ModelCompressor::with_mesh_compressor(config(&root.path().join("missing")), Box::new(mesh_compressor.clone()));
        let report = compressor.run();
        assert!(!report.root_found);
        assert!(report.files.is_empty());
        assert!(mesh_compressor.calls.borrow().is_empty());
    }
}
