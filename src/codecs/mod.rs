//! Codec adapters: decode any accepted raster format to RGBA8, encode the
//! final raster to the caller-chosen container.

mod bitmaps;
mod jpeg;
mod png;
#[cfg(feature = "webp")]
mod webp;

use crate::error::{EngineError, ErrorCode};
use crate::format::{ImageFormat, OutputFormat};
use crate::raster::Raster;

/// Decode encoded bytes of a known raster format to RGBA8.
pub(crate) fn decode(data: &[u8], format: ImageFormat) -> Result<Raster, EngineError> {
    match format {
        ImageFormat::Png => png::decode(data),
        ImageFormat::Jpeg => jpeg::decode(data),
        #[cfg(feature = "webp")]
        ImageFormat::WebP => webp::decode(data),
        #[cfg(not(feature = "webp"))]
        ImageFormat::WebP => Err(unsupported(format)),
        ImageFormat::Gif | ImageFormat::Bmp | ImageFormat::Ico => bitmaps::decode(data, format),
        // Vector sources never reach the raster codecs
        ImageFormat::Svg => Err(unsupported(format)),
    }
}

/// Encode a raster. Quality is on the 0.0–1.0 scale and applies to lossy
/// containers only; out-of-range values are clamped with a warning.
pub(crate) fn encode(
    raster: &Raster,
    format: OutputFormat,
    quality: Option<f32>,
) -> Result<Vec<u8>, EngineError> {
    let quality = match quality {
        Some(q) if !(0.0..=1.0).contains(&q) => {
            let clamped = q.clamp(0.0, 1.0);
            log::warn!("quality {q} out of [0, 1], clamping to {clamped}");
            clamped
        }
        Some(q) => q,
        None => OutputFormat::DEFAULT_QUALITY,
    };

    match format {
        OutputFormat::Png => png::encode(raster),
        OutputFormat::Jpeg => jpeg::encode(raster, quality),
        #[cfg(feature = "webp")]
        OutputFormat::WebP => webp::encode(raster, quality),
        #[cfg(not(feature = "webp"))]
        OutputFormat::WebP => {
            log::warn!("webp encoder not compiled in, falling back to png");
            png::encode(raster)
        }
    }
}

fn unsupported(format: ImageFormat) -> EngineError {
    EngineError::new(
        ErrorCode::UnsupportedFormat,
        format!("no decoder for {} data", format.name()),
    )
}

/// Shared decode path through the image crate.
pub(crate) fn decode_via_image(
    data: &[u8],
    format: image::ImageFormat,
    name: &'static str,
) -> Result<Raster, EngineError> {
    let decoded = image::load_from_memory_with_format(data, format).map_err(|e| {
        let mut err = EngineError::new(
            ErrorCode::SourceLoadFailed,
            format!("{name} decode failed"),
        )
        .with_source(e);
        let mut context = err.context().clone();
        context.format = Some(name);
        context.operation = Some("decode");
        err = err.with_context(context);
        err
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Raster::from_rgba8(width, height, rgba.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Raster {
        let mut raster = Raster::new(5, 3).unwrap();
        for y in 0..3u32 {
            for x in 0..5u32 {
                let i = ((y * 5 + x) * 4) as usize;
                raster.as_bytes_mut()[i..i + 4]
                    .copy_from_slice(&[x as u8 * 40, y as u8 * 70, 9, 255]);
            }
        }
        raster
    }

    #[test]
    fn png_round_trip_preserves_pixels() {
        let original = sample();
        let bytes = encode(&original, OutputFormat::Png, None).unwrap();
        assert_eq!(ImageFormat::detect(&bytes), Some(ImageFormat::Png));
        let decoded = decode(&bytes, ImageFormat::Png).unwrap();
        assert_eq!(decoded.dimensions(), original.dimensions());
        assert_eq!(decoded.as_bytes(), original.as_bytes());
    }

    #[test]
    fn jpeg_output_is_jpeg() {
        let bytes = encode(&sample(), OutputFormat::Jpeg, Some(0.9)).unwrap();
        assert_eq!(ImageFormat::detect(&bytes), Some(ImageFormat::Jpeg));
        let decoded = decode(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (5, 3));
    }

    #[cfg(feature = "webp")]
    #[test]
    fn webp_round_trip_dimensions() {
        let bytes = encode(&sample(), OutputFormat::WebP, Some(0.8)).unwrap();
        assert_eq!(ImageFormat::detect(&bytes), Some(ImageFormat::WebP));
        let decoded = decode(&bytes, ImageFormat::WebP).unwrap();
        assert_eq!(decoded.dimensions(), (5, 3));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode(&[0u8; 64], ImageFormat::Png).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SourceLoadFailed);
    }

    #[test]
    fn quality_is_clamped() {
        // Must not error, only clamp
        let bytes = encode(&sample(), OutputFormat::Jpeg, Some(7.5)).unwrap();
        assert!(!bytes.is_empty());
    }
}
