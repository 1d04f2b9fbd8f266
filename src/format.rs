//! Image format detection and output format selection.

/// Source image formats the pipeline accepts.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
    Gif,
    Bmp,
    Ico,
    Svg,
}

impl ImageFormat {
    /// Detect format from magic bytes. Returns None if unrecognized.
    pub fn detect(data: &[u8]) -> Option<Self> {
        // JPEG: FF D8 FF
        if data.len() >= 3 && data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
            return Some(ImageFormat::Jpeg);
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.len() >= 8 && data[..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
            return Some(ImageFormat::Png);
        }

        // GIF: "GIF87a" or "GIF89a"
        if data.len() >= 6
            && &data[..4] == b"GIF8"
            && (data[4] == b'7' || data[4] == b'9')
            && data[5] == b'a'
        {
            return Some(ImageFormat::Gif);
        }

        // WebP: "RIFF....WEBP"
        if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }

        // BMP: "BM"
        if data.len() >= 2 && &data[..2] == b"BM" {
            return Some(ImageFormat::Bmp);
        }

        // ICO: 00 00 01 00
        if data.len() >= 4 && data[..4] == [0x00, 0x00, 0x01, 0x00] {
            return Some(ImageFormat::Ico);
        }

        // SVG: text starting with an <svg> or <?xml prolog (BOM/whitespace ok)
        if looks_like_svg(data) {
            return Some(ImageFormat::Svg);
        }

        None
    }

    /// Detect format from a MIME type string.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::WebP),
            "image/gif" => Some(ImageFormat::Gif),
            "image/bmp" | "image/x-ms-bmp" => Some(ImageFormat::Bmp),
            "image/x-icon" | "image/vnd.microsoft.icon" => Some(ImageFormat::Ico),
            "image/svg+xml" => Some(ImageFormat::Svg),
            _ => None,
        }
    }

    /// Detect format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" | "jpe" | "jfif" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            "gif" => Some(ImageFormat::Gif),
            "bmp" => Some(ImageFormat::Bmp),
            "ico" => Some(ImageFormat::Ico),
            "svg" => Some(ImageFormat::Svg),
            _ => None,
        }
    }

    /// MIME type string.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Ico => "image/x-icon",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    /// Short lowercase name (matches the extension family).
    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::WebP => "webp",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Ico => "ico",
            ImageFormat::Svg => "svg",
        }
    }

    /// Whether this format can carry an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, ImageFormat::Jpeg | ImageFormat::Bmp)
    }
}

fn looks_like_svg(data: &[u8]) -> bool {
    let text = match std::str::from_utf8(&data[..data.len().min(512)]) {
        Ok(t) => t,
        Err(e) if e.valid_up_to() > 0 => {
            // A multi-byte char may be cut by the 512-byte window.
            match std::str::from_utf8(&data[..e.valid_up_to()]) {
                Ok(t) => t,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && trimmed.contains("<svg"))
}

/// Encoded output containers the pipeline produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Lossless, and the fallback for unsupported requests.
    #[default]
    Png,
    Jpeg,
    WebP,
}

impl OutputFormat {
    /// Parse a format name or MIME type leniently.
    ///
    /// Unsupported names fall back to PNG with a warning rather than failing,
    /// so a caller-provided string can never abort an otherwise valid run.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "png" | "image/png" => OutputFormat::Png,
            "jpg" | "jpeg" | "image/jpeg" | "image/jpg" => OutputFormat::Jpeg,
            "webp" | "image/webp" => OutputFormat::WebP,
            other => {
                log::warn!("unsupported output format {other:?}, falling back to png");
                OutputFormat::Png
            }
        }
    }

    /// MIME type string.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::WebP => "image/webp",
        }
    }

    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::WebP => "webp",
        }
    }

    /// Whether a quality parameter applies.
    pub fn is_lossy(self) -> bool {
        !matches!(self, OutputFormat::Png)
    }

    /// Default quality for lossy containers, on the 0.0–1.0 scale.
    pub const DEFAULT_QUALITY: f32 = 0.8;
}
