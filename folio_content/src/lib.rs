//! # Overview
//!
//! Offline processing of the assets that the portfolio site serves from its
//! `public` directory. There are two batch operations:
//!
//! * the [`ModelCompressor`] walks the model directory and writes a Draco
//!   compressed sibling for every glTF model, and
//! * the [`ImageOptimizer`] walks the image directory and writes a downscaled
//!   WebP sibling for every PNG and JPEG image.
//!
//! Both write derived files *next to* their input and never touch the input
//! itself. The naming convention of the derived files is the only contract
//! with the run time, which requests assets by path:
//!
//! ```text
//! public/
//! ├─ models/
//! │  ├─ room.glb
//! │  ├─ room-draco.glb      <- ModelCompressor
//! ├─ images/
//! │  ├─ hero.png
//! │  ├─ hero.webp           <- ImageOptimizer
//! ```
//!
//! A run never aborts because of a single file. Every file ends up in the
//! [`Report`] as converted, skipped (with a [`SkipReason`]) or failed.

mod common;
mod config;
mod image_optimizer;
mod inventory;
mod mesh_compressor;
mod model_compressor;
mod report;

pub use common::{Error, Result};
pub use config::*;
pub use image_optimizer::*;
pub use mesh_compressor::*;
pub use model_compressor::*;
pub use report::*;
