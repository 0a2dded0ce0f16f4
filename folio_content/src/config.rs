use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use folio_shared::{log::info, serde_yaml};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default directory of the models relative to the site root.
pub const DEFAULT_MODELS_DIRECTORY: &str = "public/models";

/// Default directory of the images relative to the site root.
pub const DEFAULT_IMAGES_DIRECTORY: &str = "public/images";

/// Configuration of the [`ModelCompressor`](crate::ModelCompressor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCompressionConfig {
    /// Directory that is searched recursively for models.
    pub root: PathBuf,
    /// Suffix that is appended to the file stem of a compressed model. Files
    /// containing it are outputs of an earlier run and never compressed again.
    pub derived_marker: String,
    /// Extensions (lowercase, without the dot) of the files that are compressed.
    pub extensions: Vec<String>,
    /// File names that are never compressed because their textures or
    /// animations degrade under Draco.
    pub excluded_files: BTreeSet<String>,
    /// Skips a model when its compressed sibling is newer than the model.
    pub skip_up_to_date: bool,
}

impl Default for ModelCompressionConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_MODELS_DIRECTORY),
            derived_marker: "-draco".to_owned(),
            extensions: vec!["glb".to_owned(), "gltf".to_owned()],
            excluded_files: ["nit.glb", "scrn.glb"].into_iter().map(str::to_owned).collect(),
            skip_up_to_date: false,
        }
    }
}

/// Configuration of the [`ImageOptimizer`](crate::ImageOptimizer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptimizationConfig {
    /// Directory that is searched recursively for images.
    pub root: PathBuf,
    /// WebP quality between 0 and 100.
    pub quality: u8,
    /// Wider images are downscaled to this width. Narrower images are never upscaled.
    pub max_width: u32,
    /// Extensions (lowercase, without the dot) of the images that are converted.
    pub source_extensions: Vec<String>,
    /// Extensions of formats that gain nothing from reprocessing.
    pub skipped_extensions: Vec<String>,
}

impl Default for ImageOptimizationConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_IMAGES_DIRECTORY),
            quality: 85,
            max_width: 1920,
            source_extensions: vec!["png".to_owned(), "jpg".to_owned(), "jpeg".to_owned()],
            skipped_extensions: vec!["webp".to_owned(), "svg".to_owned(), "gif".to_owned()],
        }
    }
}

/// Configuration of both pipeline operations.
///
/// Every field has a default, so a configuration file only has to contain the
/// values that differ:
///
/// ```rust
/// use folio_content::PipelineConfig;
/// let config = PipelineConfig::from_yaml_str("images:\n  quality: 70\n").unwrap();
/// assert_eq!(config.images.quality, 70);
/// assert_eq!(config.images.max_width, 1920);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub models: ModelCompressionConfig,
    pub images: ImageOptimizationConfig,
}

impl PipelineConfig {
    /// Parses and validates a configuration from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the configuration file at `path`.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading pipeline configuration from '{}'", path.display());
        let yaml = fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Checks the ranges that the type system doesn't.
    pub fn validate(&self) -> Result<()> {
        if self.images.quality > 100 {
            return Err(Error::InvalidConfig(format!(
                "images.quality must be between 0 and 100 but is {}",
                self.images.quality
            )));
        }
        if self.images.max_width == 0 {
            return Err(Error::InvalidConfig("images.max_width must be greater than 0".to_owned()));
        }
        if self.models.derived_marker.is_empty() {
            return Err(Error::InvalidConfig("models.derived_marker must not be empty".to_owned()));
        }
        Ok(())
    }
}
