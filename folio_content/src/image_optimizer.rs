use std::{
    fs,
    path::{Path, PathBuf},
};

use folio_shared::log::{info, trace};
use image::{imageops::FilterType, DynamicImage, GenericImageView};

use crate::{
    common::{extract_extension_from_path, is_up_to_date, write_staged},
    inventory::collect_files,
    Error, FileReport, ImageOptimizationConfig, Report, Result, SkipReason,
};

/// Extension of the optimized images.
pub const OPTIMIZED_EXTENSION: &str = "webp";

/// Writes a downscaled WebP sibling for every PNG and JPEG image below the configured root.
///
/// The source images are kept as a fallback for clients without WebP support.
pub struct ImageOptimizer {
    config: ImageOptimizationConfig,
}

impl ImageOptimizer {
    pub fn new(config: ImageOptimizationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImageOptimizationConfig {
        &self.config
    }

    /// Optimizes all images below the configured root. Never fails as a whole:
    /// per-file failures are logged and recorded in the [`Report`].
    pub fn run(&self) -> Report {
        let root = &self.config.root;
        info!("Starting image optimization in '{}'", root.display());

        let Some(files) = collect_files(root, &self.config.source_extensions) else {
            return Report::new(root, false);
        };

        let mut report = Report::new(root, true);
        for file in files {
            report.push(self.optimize_image(&file));
        }
        report
    }

    /// Path of the optimized sibling: `images/hero.png` -> `images/hero.webp`.
    pub fn optimized_path(&self, input: &Path) -> PathBuf {
        input.with_extension(OPTIMIZED_EXTENSION)
    }

    /// Optimizes a single image unless it's skipped or its WebP sibling is up to date.
    pub fn optimize_image(&self, input: &Path) -> FileReport {
        let extension = match extract_extension_from_path(input) {
            Ok(extension) => extension,
            Err(err) => return FileReport::failed(input, None, err.to_string()),
        };

        let is_skipped_format = self.config.skipped_extensions.iter().any(|skipped| skipped.eq_ignore_ascii_case(&extension));
        let is_source_format = self.config.source_extensions.iter().any(|source| source.eq_ignore_ascii_case(&extension));
        if is_skipped_format || !is_source_format {
            return FileReport::skipped(input, None, SkipReason::UnsupportedFormat);
        }

        let output = self.optimized_path(input);
        if is_up_to_date(input, &output) {
            return FileReport::skipped(input, Some(output), SkipReason::UpToDate);
        }

        match self.convert(input, &output) {
            Ok((input_size, output_size)) => FileReport::converted(input, output, input_size, output_size),
            Err(err) => FileReport::failed(input, Some(output), err.to_string()),
        }
    }

    fn convert(&self, input: &Path, output: &Path) -> Result<(u64, u64)> {
        let input_size = fs::metadata(input)?.len();

        let image = image::open(input)?;
        let image = downscale_to_width(image, self.config.max_width);
        trace!("Encoding '{}' with {}x{} pixels", input.display(), image.width(), image.height());

        let rgba = image.to_rgba8();
        let encoded = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
            .encode_simple(false, self.config.quality as f32)
            .map_err(|err| Error::WebPEncoding(format!("{err:?}")))?;

        write_staged(output, &encoded)?;
        Ok((input_size, encoded.len() as u64))
    }
}

/// Downscales `image` to `max_width` keeping the aspect ratio. Never upscales.
pub fn downscale_to_width(image: DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width <= max_width {
        return image;
    }
    let scaled_height = ((height as u64 * max_width as u64 + width as u64 / 2) / width as u64).max(1) as u32;
    image.resize_exact(max_width, scaled_height, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use folio_test::{assert_looks_like, diff_output, gradient_image, noise_image, open_image, save_image, setup_logger};
    use image::GenericImageView;
    use tempdir::TempDir;

    use super::*;
    use crate::Outcome;

    fn optimizer(root: &Path) -> ImageOptimizer {
        ImageOptimizer::new(ImageOptimizationConfig {
            root: root.to_owned(),
            ..ImageOptimizationConfig::default()
        })
    }

    #[test]
    fn optimized_path_swaps_the_extension() {
        let optimizer = ImageOptimizer::new(ImageOptimizationConfig::default());
        assert_eq!(
            optimizer.optimized_path(Path::new("public/images/hero.png")),
            PathBuf::from("public/images/hero.webp")
        );
        assert_eq!(
            optimizer.optimized_path(Path::new("photo.JPEG")),
            PathBuf::from("photo.webp")
        );
    }

    #[test]
    fn downscale_keeps_aspect_ratio_and_never_upscales() {
        let wide = DynamicImage::ImageRgb8(gradient_image(3840, 2160));
        assert_eq!(downscale_to_width(wide, 1920).dimensions(), (1920, 1080));

        let narrow = DynamicImage::ImageRgb8(gradient_image(640, 480));
        assert_eq!(downscale_to_width(narrow, 1920).dimensions(), (640, 480));
    }

    #[test]
    fn converts_png_to_capped_webp() {
        setup_logger();
        let root = TempDir::new("images").unwrap();
        let photo = root.path().join("photo.png");
        save_image(noise_image(2400, 300, 42), &photo);

        let report = optimizer(root.path()).run();

        let webp_path = root.path().join("photo.webp");
        assert!(webp_path.exists());
        assert!(photo.exists());
        let webp = open_image(&webp_path);
        assert_eq!(webp.dimensions(), (1920, 240));

        let file_report = report.get(&photo).unwrap();
        assert!(matches!(file_report.outcome, Outcome::Converted { .. }));
        assert!(file_report.savings_percent().unwrap() >= 0.0);
    }

    #[test]
    fn small_images_keep_their_size_and_look() {
        setup_logger();
        let root = TempDir::new("images").unwrap();
        let source = gradient_image(64, 48);
        save_image(source.clone(), root.path().join("nested/icon.png"));

        let report = optimizer(root.path()).run();
        assert_eq!(report.converted().count(), 1);

        let webp = open_image(root.path().join("nested/icon.webp")).into_rgb8();
        assert_eq!(webp.dimensions(), (64, 48));
        assert_looks_like(&source, &webp, 0.6, &diff_output!());
    }

    #[test]
    fn newer_webp_is_not_rewritten() {
        setup_logger();
        let root = TempDir::new("images").unwrap();
        let photo = root.path().join("photo.png");
        save_image(gradient_image(32, 32), &photo);
        folio_test::set_modified_ago(&photo, 60);
        let webp_path = root.path().join("photo.webp");
        fs::write(&webp_path, b"existing").unwrap();

        let report = optimizer(root.path()).run();

        assert_eq!(fs::read(&webp_path).unwrap(), b"existing");
        assert_eq!(
            report.get(&photo).unwrap().outcome,
            Outcome::Skipped(SkipReason::UpToDate)
        );
    }

    #[test]
    fn older_webp_is_regenerated() {
        setup_logger();
        let root = TempDir::new("images").unwrap();
        let photo = root.path().join("photo.jpg");
        let webp_path = root.path().join("photo.webp");
        fs::write(&webp_path, b"stale").unwrap();
        folio_test::set_modified_ago(&webp_path, 60);
        save_image(gradient_image(32, 32), &photo);

        let report = optimizer(root.path()).run();

        assert!(matches!(report.get(&photo).unwrap().outcome, Outcome::Converted { .. }));
        assert_ne!(fs::read(&webp_path).unwrap(), b"stale");
    }

    #[test]
    fn corrupt_image_does_not_abort_the_run() {
        setup_logger();
        let root = TempDir::new("images").unwrap();
        fs::write(root.path().join("a_broken.png"), b"this is not a png").unwrap();
        save_image(gradient_image(16, 16), root.path().join("b_fine.png"));

        let report = optimizer(root.path()).run();

        assert!(matches!(
            report.get(root.path().join("a_broken.png")).unwrap().outcome,
            Outcome::Failed(_)
        ));
        assert!(!root.path().join("a_broken.webp").exists());
        assert!(root.path().join("b_fine.webp").exists());
        let leftovers = fs::read_dir(root.path())
            .unwrap()
            .filter(|entry| entry.as_ref().unwrap().file_name().to_string_lossy().ends_with(".partial"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn other_formats_are_left_alone() {
        setup_logger();
        let root = TempDir::new("images").unwrap();
        fs::write(root.path().join("logo.svg"), b"<svg/>").unwrap();
        fs::write(root.path().join("loader.gif"), b"GIF89a").unwrap();

        let optimizer = optimizer(root.path());
        let report = optimizer.run();
        assert!(report.files.is_empty());

        let direct = optimizer.optimize_image(&root.path().join("logo.svg"));
        assert_eq!(direct.outcome, Outcome::Skipped(SkipReason::UnsupportedFormat));
        assert!(!root.path().join("logo.webp").exists());
    }

    #[test]
    fn missing_root_is_a_no_op() {
        let root = TempDir::new("images").unwrap();
        let report = optimizer(&root.path().join("missing")).run();
        assert!(!report.root_found);
        assert!(report.files.is_empty());
    }
}
