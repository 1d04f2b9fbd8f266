//! JPEG codec adapter using the image crate.

use crate::error::{EngineError, ErrorCode};
use crate::raster::Raster;

pub(crate) fn decode(data: &[u8]) -> Result<Raster, EngineError> {
    super::decode_via_image(data, image::ImageFormat::Jpeg, "jpeg")
}

/// Encode to JPEG. Transparency is composited over opaque black first, the
/// way a canvas export behaves, since JPEG has no alpha channel.
pub(crate) fn encode(raster: &Raster, quality: f32) -> Result<Vec<u8>, EngineError> {
    let q = (quality * 100.0).round().clamp(1.0, 100.0) as u8;

    let rgba = raster.as_bytes();
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let a = u16::from(px[3]);
        rgb.push(((u16::from(px[0]) * a + 127) / 255) as u8);
        rgb.push(((u16::from(px[1]) * a + 127) / 255) as u8);
        rgb.push(((u16::from(px[2]) * a + 127) / 255) as u8);
    }

    let mut output = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, q);
    encoder
        .encode(
            &rgb,
            raster.width(),
            raster.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| {
            let mut err =
                EngineError::new(ErrorCode::OutputFailed, "jpeg encode failed").with_source(e);
            let mut context = err.context().clone();
            context.format = Some("jpeg");
            context.operation = Some("encode");
            context.dimensions = Some(raster.dimensions());
            err = err.with_context(context);
            err
        })?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    #[test]
    fn round_trip_keeps_dimensions_and_tone() {
        let original = Raster::filled(
            16,
            8,
            RGBA8 {
                r: 200,
                g: 100,
                b: 50,
                a: 255,
            },
        )
        .unwrap();
        let bytes = encode(&original, 0.9).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (16, 8));
        let [r, g, b, a] = decoded.pixel(8, 4);
        assert!((i32::from(r) - 200).abs() < 16);
        assert!((i32::from(g) - 100).abs() < 16);
        assert!((i32::from(b) - 50).abs() < 16);
        assert_eq!(a, 255);
    }

    #[test]
    fn transparency_composites_to_black() {
        let transparent = Raster::filled(
            8,
            8,
            RGBA8 {
                r: 255,
                g: 255,
                b: 255,
                a: 0,
            },
        )
        .unwrap();
        let bytes = encode(&transparent, 0.9).unwrap();
        let decoded = decode(&bytes).unwrap();
        let [r, g, b, _] = decoded.pixel(4, 4);
        assert!(r < 8 && g < 8 && b < 8, "expected near-black, got {r},{g},{b}");
    }

    #[test]
    fn lower_quality_is_smaller() {
        // Noisy content so entropy coding has something to discard
        let mut noisy = Raster::new(64, 64).unwrap();
        for (i, b) in noisy.as_bytes_mut().iter_mut().enumerate() {
            *b = if i % 4 == 3 {
                255
            } else {
                (i.wrapping_mul(97) % 251) as u8
            };
        }
        let high = encode(&noisy, 0.95).unwrap();
        let low = encode(&noisy, 0.2).unwrap();
        assert!(low.len() < high.len());
    }
}
