use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Once,
    time::{Duration, SystemTime},
};

use image::{DynamicImage, ImageBuffer, ImageError, Rgb, Rgb32FImage, RgbImage};
use rand::{rngs::StdRng, Rng, SeedableRng};

pub use folio_shared;

/// Creates a [`DiffOutput`] named after the test function in which the macro is executed.
#[macro_export]
macro_rules! diff_output {
    () => {{
        let test_name = $crate::folio_shared::function_name!().replace("::", ".");
        $crate::DiffOutput::for_test(&test_name)
    }};
}

/// Installs a logger for the test binary. Can be called from every test.
pub fn setup_logger() {
    static LOGGER: Once = Once::new();
    LOGGER.call_once(|| {
        simple_logger::SimpleLogger::new()
            .with_level(folio_shared::log::LevelFilter::Trace)
            .init()
            .expect("failed to initialize the test logger");
    });
}

/// Folder that receives the images of a failed comparison.
pub struct DiffOutput {
    pub folder: PathBuf,
}

impl DiffOutput {
    const ROOT: &'static str = "test_results";

    pub fn for_test(test_name: &str) -> Self {
        Self {
            folder: Path::new(Self::ROOT).join(test_name),
        }
    }

    fn write(&self, name: &str, image: &RgbImage) {
        save_image(image.clone(), self.folder.join(name));
    }
}

/// Writes a file of exactly `size` bytes. Used as a stand-in for binary model files.
pub fn write_sized_file(path: impl AsRef<Path>, size: usize) {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create the parent directory");
    }
    let content = (0..size).map(|index| (index % 251) as u8).collect::<Vec<_>>();
    fs::write(path, content).unwrap_or_else(|err| panic!("Failed to write \"{}\": {err}", path.display()));
}

/// Sets the modification time of the file at `path` to `seconds` before now.
pub fn set_modified_ago(path: impl AsRef<Path>, seconds: u64) {
    let file = File::options()
        .write(true)
        .open(path.as_ref())
        .expect("Failed to open the file to set its modification time");
    let time = SystemTime::now() - Duration::from_secs(seconds);
    file.set_modified(time).expect("Failed to set the modification time");
}

/// Creates an image with seeded random pixels. Noise is expensive to store losslessly.
pub fn noise_image(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    ImageBuffer::from_fn(width, height, |_, _| Rgb([rng.gen(), rng.gen(), rng.gen()]))
}

/// Creates an image with a smooth diagonal gradient.
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        let r = (255 * x / width.max(1)) as u8;
        let g = (255 * y / height.max(1)) as u8;
        Rgb([r, g, 128])
    })
}

/// Opens the given image and expects the path to be correct.
pub fn open_image(path: impl AsRef<Path>) -> DynamicImage {
    let f = |err: ImageError| {
        let err = err.to_string();
        let path_str = path
            .as_ref()
            .canonicalize()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or(path.as_ref().to_string_lossy().into_owned());
        let cwd = PathBuf::from(".")
            .canonicalize()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or("unknown".to_owned());
        panic!("Could not find test image at path \"{path_str}\" (cwd: \"{cwd}\") due to the following error: {err}")
    };
    image::open(&path).unwrap_or_else(f)
}

/// Save the given image and expect the operation to succeed.
pub fn save_image(image: RgbImage, path: impl AsRef<Path>) {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent).expect("Failed to create the parent directory");
    }
    image
        .save(&path)
        .unwrap_or_else(|_| panic!("Failed to save image to path \"{}\"", path.as_ref().to_string_lossy()));
}

/// Maps the per-channel similarity of a comparison into a viewable image.
fn similarity_to_rgb8(similarity: &Rgb32FImage) -> RgbImage {
    ImageBuffer::from_fn(similarity.width(), similarity.height(), |x, y| {
        Rgb(similarity.get_pixel(x, y).0.map(|value| (255.0 * value.clamp(0.0, 1.0)) as u8))
    })
}

/// Asserts that `actual` looks like `expected` with a hybrid similarity score of at least `min_score`.
///
/// On failure both images and the similarity map are written to the [`DiffOutput`] folder.
pub fn assert_looks_like(expected: &RgbImage, actual: &RgbImage, min_score: f64, output: &DiffOutput) {
    assert_eq!(expected.dimensions(), actual.dimensions(), "images have different dimensions");
    let result = image_compare::rgb_hybrid_compare(expected, actual).expect("Images have different dimensions");
    if result.score < min_score {
        println!("Writing the compared images to {}", output.folder.display());
        output.write("expected.png", expected);
        output.write("actual.png", actual);
        output.write("similarity.png", &similarity_to_rgb8(&result.image));
    }
    assert!(
        result.score >= min_score,
        "the similarity {:.3} is below the expected {min_score}",
        result.score
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic]
    fn image_not_found() {
        open_image("the/wrong/path/to/the/image");
    }

    #[test]
    fn identical_images_look_alike() {
        let image = gradient_image(32, 32);
        assert_looks_like(&image, &image, 0.99, &diff_output!());
    }

    #[test]
    #[should_panic(expected = "below the expected")]
    fn noise_does_not_look_like_a_gradient() {
        assert_looks_like(&gradient_image(32, 32), &noise_image(32, 32, 7), 0.99, &diff_output!());
    }

    #[test]
    fn diff_output_is_named_after_the_test() {
        let output = diff_output!();
        assert!(output.folder.starts_with(DiffOutput::ROOT));
        let name = output.folder.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("diff_output_is_named_after_the_test"), "{name}");
    }

    #[test]
    fn similarity_map_is_white_for_identical_pixels() {
        let similarity = Rgb32FImage::from_pixel(2, 2, Rgb([1.0, 1.0, 1.0]));
        let rgb = similarity_to_rgb8(&similarity);
        assert!(rgb.pixels().all(|pixel| *pixel == Rgb([255, 255, 255])));
    }

    #[test]
    fn noise_is_deterministic_per_seed() {
        assert_eq!(noise_image(8, 8, 1), noise_image(8, 8, 1));
        assert_ne!(noise_image(8, 8, 1), noise_image(8, 8, 2));
    }
}
