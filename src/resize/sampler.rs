//! Resampling kernel wrapper.
//!
//! All backends funnel through `scale_region` so tiles and whole-image draws
//! use identical sampling coordinates: a fractional crop box over the source
//! mapped onto an integer destination grid.

use fast_image_resize::images::{Image, ImageRef};
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};

use crate::error::{EngineError, ErrorCode};
use crate::raster::Raster;
use crate::strategy::Quality;

/// Fractional source region, in source pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CropBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CropBox {
    pub fn full(raster: &Raster) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: f64::from(raster.width()),
            height: f64::from(raster.height()),
        }
    }
}

pub(crate) fn resize_alg(quality: Quality) -> ResizeAlg {
    match quality {
        Quality::Fast => ResizeAlg::Nearest,
        Quality::Balanced => ResizeAlg::Convolution(FilterType::Bilinear),
        Quality::High => ResizeAlg::Convolution(FilterType::CatmullRom),
    }
}

/// Scale `crop` of `src` to exactly (dst_width, dst_height).
pub(crate) fn scale_region(
    src: &Raster,
    crop: CropBox,
    dst_width: u32,
    dst_height: u32,
    quality: Quality,
) -> Result<Raster, EngineError> {
    let view = ImageRef::new(src.width(), src.height(), src.as_bytes(), PixelType::U8x4)
        .map_err(|e| {
            EngineError::new(ErrorCode::ResizeFailed, "source view creation failed")
                .with_source(e)
                .with_dimensions(src.width(), src.height())
        })?;
    let mut dst = Image::new(dst_width, dst_height, PixelType::U8x4);

    let options = ResizeOptions::new()
        .resize_alg(resize_alg(quality))
        .crop(crop.left, crop.top, crop.width, crop.height);

    let mut resizer = Resizer::new();
    resizer.resize(&view, &mut dst, Some(&options)).map_err(|e| {
        EngineError::new(ErrorCode::ResizeFailed, "resample failed")
            .with_source(e)
            .with_dimensions(dst_width, dst_height)
    })?;

    Raster::from_rgba8(dst_width, dst_height, dst.into_vec())
}

/// Whole-source scale to (dst_width, dst_height).
pub(crate) fn scale_full(
    src: &Raster,
    dst_width: u32,
    dst_height: u32,
    quality: Quality,
) -> Result<Raster, EngineError> {
    if (dst_width, dst_height) == src.dimensions() {
        return Ok(src.clone());
    }
    scale_region(src, CropBox::full(src), dst_width, dst_height, quality)
}
