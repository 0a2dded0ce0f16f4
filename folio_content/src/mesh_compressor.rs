use std::{
    io,
    path::{Path, PathBuf},
    process::Command,
};

use folio_shared::log::{info, trace};

use crate::{Error, Result};

/// Mesh-geometry compression transform that turns the model at `input` into a
/// Draco compressed model at `output`.
pub trait MeshCompressor {
    /// Name for log messages.
    fn name(&self) -> &str;

    /// Writes the compressed model to `output`. Must not modify `input`.
    fn compress(&self, input: &Path, output: &Path) -> Result<()>;
}

/// How the `gltf-transform` command line tool is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// `npx gltf-transform ...` which uses the version installed in the site's `node_modules`.
    Npx(PathBuf),
    /// A `gltf-transform` executable.
    Executable(PathBuf),
}

/// [`MeshCompressor`] that runs `gltf-transform draco <input> <output>`.
///
/// The launcher is looked up on every call when none is given, so that a
/// missing tool only fails the files that actually need compression.
#[derive(Debug, Clone, Default)]
pub struct GltfTransformCli {
    launcher: Option<Launcher>,
}

impl GltfTransformCli {
    /// Creates a [`GltfTransformCli`] that looks up `npx` and then `gltf-transform` in the `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a [`GltfTransformCli`] that always uses the given launcher.
    pub fn with_launcher(launcher: Launcher) -> Self {
        Self { launcher: Some(launcher) }
    }

    /// Finds a way to start `gltf-transform`. `npx` is preferred.
    pub fn locate() -> Result<Launcher> {
        if let Ok(npx) = which::which("npx") {
            return Ok(Launcher::Npx(npx));
        }
        if let Ok(executable) = which::which("gltf-transform") {
            return Ok(Launcher::Executable(executable));
        }
        Err(Error::ToolNotFound(
            "neither 'npx' nor 'gltf-transform' was found in the PATH".to_owned(),
        ))
    }

    /// Builds the command line for compressing `input` into `output`.
    pub fn command(launcher: &Launcher, input: &Path, output: &Path) -> Command {
        let mut command = match launcher {
            Launcher::Npx(npx) => {
                let mut command = Command::new(npx);
                command.arg("gltf-transform");
                command
            }
            Launcher::Executable(executable) => Command::new(executable),
        };
        command.arg("draco").arg(input).arg(output);
        command
    }
}

impl MeshCompressor for GltfTransformCli {
    fn name(&self) -> &str {
        "gltf-transform"
    }

    fn compress(&self, input: &Path, output: &Path) -> Result<()> {
        let launcher = match &self.launcher {
            Some(launcher) => launcher.clone(),
            None => Self::locate()?,
        };
        let mut command = Self::command(&launcher, input, output);
        let program = program_name(&command);
        trace!("Running: {command:?}");

        let result = command.output().map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::ToolNotFound(program.clone()),
            _ => Error::IoError(err),
        })?;
        if !result.status.success() {
            return Err(Error::ToolFailed {
                program,
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_owned(),
            });
        }

        info!("{program} compressed '{}' into '{}'", input.display(), output.display());
        Ok(())
    }
}

fn program_name(command: &Command) -> String {
    command.get_program().to_string_lossy().into_owned()
}
