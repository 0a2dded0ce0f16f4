use serde::Serialize;

use crate::PerformanceTier;

/// How the renderer derives its pixel ratio from the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelRatio {
    /// The device pixel ratio, but never more than the given value.
    Capped(f32),
    /// Always the given value regardless of the device.
    Fixed(f32),
}

/// Rendering parameters for one [`PerformanceTier`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualitySettings {
    pub particle_count: u32,
    pub shadow_map_size: u32,
    pub antialias: bool,
    pub postprocessing: bool,
    pub pixel_ratio: PixelRatio,
    pub bloom_intensity: f32,
}

impl QualitySettings {
    /// Pixel ratio the renderer should use on a device with `device_pixel_ratio`.
    pub fn pixel_ratio(&self, device_pixel_ratio: f32) -> f32 {
        match self.pixel_ratio {
            PixelRatio::Capped(cap) => device_pixel_ratio.min(cap),
            PixelRatio::Fixed(ratio) => ratio,
        }
    }
}

const HIGH: QualitySettings = QualitySettings {
    particle_count: 50,
    shadow_map_size: 2048,
    antialias: true,
    postprocessing: true,
    pixel_ratio: PixelRatio::Capped(2.0),
    bloom_intensity: 1.0,
};

const MEDIUM: QualitySettings = QualitySettings {
    particle_count: 25,
    shadow_map_size: 1024,
    antialias: true,
    postprocessing: true,
    pixel_ratio: PixelRatio::Capped(1.5),
    bloom_intensity: 0.7,
};

const LOW: QualitySettings = QualitySettings {
    particle_count: 10,
    shadow_map_size: 512,
    antialias: false,
    postprocessing: false,
    pixel_ratio: PixelRatio::Fixed(1.0),
    bloom_intensity: 0.5,
};

/// Maps a tier to its rendering parameters.
pub fn quality_settings(tier: PerformanceTier) -> QualitySettings {
    match tier {
        PerformanceTier::High => HIGH,
        PerformanceTier::Medium => MEDIUM,
        PerformanceTier::Low => LOW,
    }
}

/// Maps a tier name to its rendering parameters. Unknown names get the medium settings.
pub fn quality_settings_for_name(name: &str) -> QualitySettings {
    quality_settings(PerformanceTier::from_name_or_medium(name))
}
