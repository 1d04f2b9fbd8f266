//! PNG codec adapter using the png crate.

use std::io::Cursor;

use crate::error::{EngineError, ErrorCode};
use crate::raster::Raster;

fn decode_error(e: impl std::error::Error + Send + Sync + 'static) -> EngineError {
    let mut err =
        EngineError::new(ErrorCode::SourceLoadFailed, "png decode failed").with_source(e);
    let mut context = err.context().clone();
    context.format = Some("png");
    context.operation = Some("decode");
    err = err.with_context(context);
    err
}

/// Decode PNG bytes to RGBA8, expanding palette/gray/16-bit inputs.
pub(crate) fn decode(data: &[u8]) -> Result<Raster, EngineError> {
    let mut decoder = png::Decoder::new(Cursor::new(data));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);

    let mut reader = decoder.read_info().map_err(decode_error)?;

    let info = reader.info();
    let width = info.width;
    let height = info.height;

    let buffer_size = reader.output_buffer_size().ok_or_else(|| {
        EngineError::new(
            ErrorCode::SourceLoadFailed,
            "cannot determine png output buffer size",
        )
    })?;
    let mut pixels = vec![0u8; buffer_size];

    let output_info = reader.next_frame(&mut pixels).map_err(decode_error)?;
    pixels.truncate(output_info.buffer_size());

    let (color_type, _bit_depth) = reader.output_color_type();
    let rgba = match color_type {
        png::ColorType::Rgba => pixels,
        png::ColorType::Rgb => expand(&pixels, 3, |px| [px[0], px[1], px[2], 255]),
        png::ColorType::Grayscale => expand(&pixels, 1, |px| [px[0], px[0], px[0], 255]),
        png::ColorType::GrayscaleAlpha => expand(&pixels, 2, |px| [px[0], px[0], px[0], px[1]]),
        png::ColorType::Indexed => {
            // EXPAND converts palettes; reaching here means it didn't apply
            return Err(EngineError::new(
                ErrorCode::ConversionFailed,
                "indexed png was not expanded",
            ));
        }
    };

    Raster::from_rgba8(width, height, rgba)
}

fn expand(pixels: &[u8], src_channels: usize, f: impl Fn(&[u8]) -> [u8; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len() / src_channels * 4);
    for px in pixels.chunks_exact(src_channels) {
        out.extend_from_slice(&f(px));
    }
    out
}

/// Encode RGBA8 pixels to PNG (always lossless).
pub(crate) fn encode(raster: &Raster) -> Result<Vec<u8>, EngineError> {
    let mut output = Vec::new();
    let mut encoder = png::Encoder::new(&mut output, raster.width(), raster.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let encode_error = |e: png::EncodingError| {
        let mut err =
            EngineError::new(ErrorCode::OutputFailed, "png encode failed").with_source(e);
        let mut context = err.context().clone();
        context.format = Some("png");
        context.operation = Some("encode");
        context.dimensions = Some(raster.dimensions());
        err = err.with_context(context);
        err
    };

    let mut writer = encoder.write_header().map_err(encode_error)?;
    writer
        .write_image_data(raster.as_bytes())
        .map_err(encode_error)?;
    drop(writer);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    #[test]
    fn encode_then_decode_with_alpha() {
        let mut original = Raster::filled(
            4,
            4,
            RGBA8 {
                r: 10,
                g: 20,
                b: 30,
                a: 255,
            },
        )
        .unwrap();
        // One semi-transparent pixel
        original.as_bytes_mut()[3] = 100;

        let bytes = encode(&original).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.as_bytes(), original.as_bytes());
    }

    #[test]
    fn truncated_data_fails_cleanly() {
        let original = Raster::new(8, 8).unwrap();
        let bytes = encode(&original).unwrap();
        let err = decode(&bytes[..20]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SourceLoadFailed);
    }

    #[test]
    fn rgb_png_gains_opaque_alpha() {
        // Encode an RGB png via the png crate directly, then decode
        let mut data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut data, 2, 1);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[1, 2, 3, 4, 5, 6]).unwrap();
        }
        let decoded = decode(&data).unwrap();
        assert_eq!(decoded.pixel(0, 0), [1, 2, 3, 255]);
        assert_eq!(decoded.pixel(1, 0), [4, 5, 6, 255]);
    }
}
