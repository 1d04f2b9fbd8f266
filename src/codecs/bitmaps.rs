//! Bitmap-family decoders: GIF (first frame), BMP, ICO.

use crate::error::{EngineError, ErrorCode};
use crate::format::ImageFormat;
use crate::raster::Raster;

pub(crate) fn decode(data: &[u8], format: ImageFormat) -> Result<Raster, EngineError> {
    let (image_format, name) = match format {
        ImageFormat::Gif => (image::ImageFormat::Gif, "gif"),
        ImageFormat::Bmp => (image::ImageFormat::Bmp, "bmp"),
        ImageFormat::Ico => (image::ImageFormat::Ico, "ico"),
        other => {
            return Err(EngineError::new(
                ErrorCode::UnsupportedFormat,
                format!("{} is not a bitmap-family format", other.name()),
            ))
        }
    };
    super::decode_via_image(data, image_format, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid 1x1 opaque-white GIF87a
    const TINY_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x37, 0x61, // GIF87a
        0x01, 0x00, 0x01, 0x00, // 1x1
        0x80, 0x00, 0x00, // GCT: 2 entries
        0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, // white, black
        0x2C, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, // image descriptor
        0x02, 0x02, 0x44, 0x01, 0x00, // 1 clear-coded pixel
        0x3B, // trailer
    ];

    #[test]
    fn gif_first_frame() {
        let raster = decode(TINY_GIF, ImageFormat::Gif).unwrap();
        assert_eq!(raster.dimensions(), (1, 1));
        assert_eq!(raster.pixel(0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn malformed_bmp_fails() {
        let err = decode(b"BM broken", ImageFormat::Bmp).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SourceLoadFailed);
    }

    #[test]
    fn non_bitmap_format_rejected() {
        let err = decode(&[], ImageFormat::Png).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedFormat);
    }
}
