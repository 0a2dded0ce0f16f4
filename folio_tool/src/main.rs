use std::{io, path::PathBuf};

use clap::Parser;
use color_eyre as ey;
use ey::eyre::Context;
use folio_adaptive::{classify, quality_settings, DeviceProfile, PerformanceTier, QualitySettings};
use folio_content::{ImageOptimizer, ModelCompressor, PipelineConfig, Report};
use folio_shared::{
    log::{self, error, info},
    pathdiff, serde_yaml,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CommandLineArguments {
    /// YAML file with the pipeline configuration. Omitted fields keep their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Writes a Draco compressed `-draco` sibling for every glTF model
    CompressModels {
        /// Directory that is searched recursively for models
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
    /// Writes a downscaled WebP sibling for every PNG and JPEG image
    OptimizeImages {
        /// Directory that is searched recursively for images
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
    /// Compresses the models and then optimizes the images
    OptimizeAll,
    /// Prints the performance tier and quality settings for a device
    Classify(Classify),
}

#[derive(Parser, Debug)]
struct Classify {
    /// Device memory in GB. Detection is skipped when omitted
    #[arg(short, long)]
    memory: Option<f32>,

    /// Number of logical cores. Detected when omitted
    #[arg(long)]
    cores: Option<u32>,

    #[arg(short, long, default_value = "")]
    user_agent: String,

    #[arg(long)]
    reduced_motion: bool,

    #[arg(short, long, default_value = "1")]
    device_pixel_ratio: f32,
}

#[derive(Serialize)]
struct ClassifyOutput {
    tier: PerformanceTier,
    rule: Option<&'static str>,
    pixel_ratio: f32,
    settings: QualitySettings,
}

fn main() -> ey::Result<()> {
    color_eyre::install()?;

    // Setup logging
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                folio_shared::chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(io::stdout())
        .apply()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

    let command_line_arguments = CommandLineArguments::parse();
    let mut config = match &command_line_arguments.config {
        Some(path) => PipelineConfig::from_yaml_file(path).wrap_err_with(|| format!("Failed to load the configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match command_line_arguments.command {
        Command::CompressModels { root } => {
            if let Some(root) = root {
                config.models.root = root;
            }
            compress_models(&config);
        }
        Command::OptimizeImages { root } => {
            if let Some(root) = root {
                config.images.root = root;
            }
            optimize_images(&config);
        }
        Command::OptimizeAll => {
            compress_models(&config);
            optimize_images(&config);
        }
        Command::Classify(arguments) => {
            let output = classify_device(arguments);
            let yaml = serde_yaml::to_string(&output).wrap_err("Failed to serialize the classification")?;
            println!("{yaml}");
        }
    }
    Ok(())
}

fn compress_models(config: &PipelineConfig) {
    let report = ModelCompressor::new(config.models.clone()).run();
    finish(&report);
    info!("Model compression complete");
    info!("Note: Update your model imports to use -draco.glb files.");
    info!("Also ensure the Draco decoder is configured in the glTF loader.");
}

fn optimize_images(config: &PipelineConfig) {
    let report = ImageOptimizer::new(config.images.clone()).run();
    finish(&report);
    info!("Image optimization complete");
    info!("Note: Update your image imports to use .webp files for better performance.");
    info!("You can keep the original files as fallbacks for older browsers.");
}

/// Failed files don't change the exit code. They are listed once more at the end of the run.
fn finish(report: &Report) {
    report.log_summary();
    for file in report.failed() {
        let path = pathdiff::diff_paths(&file.input, &report.root).unwrap_or_else(|| file.input.clone());
        error!("Not converted: {}", path.display());
    }
}

fn classify_device(arguments: Classify) -> ClassifyOutput {
    let native = DeviceProfile::detect_native();
    let profile = DeviceProfile {
        memory_gb: arguments.memory,
        logical_cores: arguments.cores.or(native.logical_cores),
        user_agent: arguments.user_agent,
        prefers_reduced_motion: arguments.reduced_motion,
    };
    let classification = classify(&profile);
    let settings = quality_settings(classification.tier);
    ClassifyOutput {
        tier: classification.tier,
        rule: classification.rule,
        pixel_ratio: settings.pixel_ratio(arguments.device_pixel_ratio),
        settings,
    }
}
