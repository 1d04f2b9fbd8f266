//! # rasterpipe
//!
//! Lazy image processing pipeline: one fit-mode resize, a chain of pixel
//! filters, a single rasterization.
//!
//! ## Overview
//!
//! rasterpipe turns a heterogeneous source (encoded bytes, decoded pixels,
//! SVG text, URL-like tokens) into an RGBA raster or an encoded png/jpeg/webp
//! buffer. Work is recorded up front and executed once:
//!
//! - **Geometry planning** for five fit modes (cover, contain, fill,
//!   max-fit, min-fit) with padding and no-enlargement handling
//! - **Strategy selection** that keeps large sources inside browser-like
//!   raster memory limits (direct, chunked, stepped, tiled backends)
//! - **Filter plugins** (brightness, contrast, blur, sharpen, emboss, edge
//!   detection and friends) behind a runtime registry
//! - **Unified errors** with stable codes and process-wide counters
//!
//! ## Resize and encode
//!
//! ```no_run
//! use rasterpipe::{OutputFormat, Pipeline, ResizeConfig};
//!
//! let bytes: Vec<u8> = Vec::new(); // your encoded image
//! let mut pipeline = Pipeline::from_bytes(bytes);
//! pipeline.resize(ResizeConfig::cover(1200, 630))?;
//! pipeline.sharpen(40.0)?;
//! let (jpeg, meta) = pipeline.to_encoded(OutputFormat::Jpeg, Some(0.85))?;
//! println!("{}x{} in {:.1} ms", meta.width, meta.height, meta.processing_time_ms);
//! # Ok::<(), rasterpipe::EngineError>(())
//! ```
//!
//! ## Work with pixels directly
//!
//! ```no_run
//! use rasterpipe::{Pipeline, Raster};
//!
//! let raster = Raster::new(640, 480)?;
//! let mut pipeline = Pipeline::from_raster(raster);
//! pipeline.max_width(320)?.grayscale()?;
//! let (thumb, _meta) = pipeline.to_raster()?;
//! assert_eq!(thumb.width(), 320);
//! # Ok::<(), rasterpipe::EngineError>(())
//! ```
//!
//! ## What this crate does NOT do
//!
//! - **No network or file IO**: URL sources go through a caller-provided
//!   [`SourceResolver`].
//! - **No SVG rendering**: vector sources are measured and percent-encoded
//!   here, rasterized by a caller-provided [`VectorRasterizer`].
//! - **No animation**: first frame only for GIF.
//! - **No color management**: pixels are treated as sRGB throughout.

#![forbid(unsafe_code)]

mod codecs;
mod config;
mod error;
mod features;
mod format;
mod limits;
mod pipeline;
mod raster;
mod resize;
mod source;
mod svg;

pub mod filters;
pub mod geometry;
pub mod observe;
pub mod strategy;

// Re-exports
pub use config::EngineConfig;
pub use error::{EngineError, ErrorCode, ErrorContext};
pub use features::Features;
pub use format::{ImageFormat, OutputFormat};
pub use geometry::{Fit, GeometryPlan, Padding, ResizeConfig};
pub use limits::{Limits, Stop};
pub use pipeline::{process_image, Metadata, Pipeline};
pub use raster::Raster;
pub use resize::ProgressFn;
pub use source::{SourceResolver, SourceToken, VectorRasterizer};
pub use strategy::{Quality, Strategy};
pub use svg::{intrinsic_size as svg_intrinsic_size, to_data_url as svg_to_data_url};
