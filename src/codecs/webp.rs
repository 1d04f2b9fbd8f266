//! WebP codec adapter: decode via the image crate, lossy encode via libwebp
//! bindings.

use crate::error::EngineError;
use crate::raster::Raster;

pub(crate) fn decode(data: &[u8]) -> Result<Raster, EngineError> {
    super::decode_via_image(data, image::ImageFormat::WebP, "webp")
}

pub(crate) fn encode(raster: &Raster, quality: f32) -> Result<Vec<u8>, EngineError> {
    let encoder = webp::Encoder::from_rgba(raster.as_bytes(), raster.width(), raster.height());
    let memory = encoder.encode(quality * 100.0);
    Ok(memory.to_vec())
}
