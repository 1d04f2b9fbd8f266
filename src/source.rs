//! Source adapter: normalize any accepted source into an RGBA raster plus
//! intrinsic dimensions.
//!
//! Fetching network resources and rasterizing vector documents are
//! collaborator concerns, injected through [`SourceResolver`] and
//! [`VectorRasterizer`]. The adapter never partially succeeds.

use std::sync::Arc;

use percent_encoding::percent_decode_str;

use crate::error::{EngineError, ErrorCode};
use crate::format::ImageFormat;
use crate::limits::Limits;
use crate::raster::Raster;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A heterogeneous image source, consumed once by materialization.
#[derive(Clone, Debug)]
pub enum SourceToken {
    /// Already-decoded pixels.
    Raster(Raster),
    /// A shared decoded image (bitmap-handle style); pixels are copied in.
    Shared(Arc<Raster>),
    /// Encoded bytes with an optional MIME hint.
    Bytes {
        data: Vec<u8>,
        mime: Option<String>,
    },
    /// SVG document text.
    Svg(String),
    /// A URL-like token: `data:` URLs decode inline, anything else goes
    /// through the caller's resolver.
    Url(String),
}

/// Resolves URL-like tokens to encoded bytes (network fetch, file read).
pub trait SourceResolver: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, BoxError>;
}

/// Renders an SVG data-URL to pixels at the requested size.
pub trait VectorRasterizer: Send + Sync {
    fn rasterize(&self, data_url: &str, width: u32, height: u32) -> Result<Raster, BoxError>;
}

/// Options for materialization.
#[derive(Clone, Copy, Default)]
pub(crate) struct MaterializeOptions<'a> {
    /// Cross-origin hint, recorded in error context only.
    pub cross_origin: Option<&'a str>,
    /// Decode-target size for vector sources; raster sources ignore it.
    pub element_size: Option<(u32, u32)>,
    pub resolver: Option<&'a dyn SourceResolver>,
    pub rasterizer: Option<&'a dyn VectorRasterizer>,
    pub limits: Option<&'a Limits>,
}

/// Materialize a source into `(raster, intrinsic dimensions)`.
///
/// For raster sources the intrinsic dimensions equal the raster's; for
/// vector sources they are the document's declared size.
pub(crate) fn materialize(
    token: SourceToken,
    opts: &MaterializeOptions<'_>,
) -> Result<(Raster, (u32, u32)), EngineError> {
    match token {
        SourceToken::Raster(raster) => {
            check_limits(opts, raster.dimensions())?;
            let dims = raster.dimensions();
            Ok((raster, dims))
        }
        SourceToken::Shared(shared) => {
            check_limits(opts, shared.dimensions())?;
            let dims = shared.dimensions();
            Ok(((*shared).clone(), dims))
        }
        SourceToken::Bytes { data, mime } => decode_bytes(&data, mime.as_deref(), opts),
        SourceToken::Svg(text) => materialize_svg(&text, opts),
        SourceToken::Url(url) => materialize_url(&url, opts),
    }
}

fn check_limits(opts: &MaterializeOptions<'_>, dims: (u32, u32)) -> Result<(), EngineError> {
    if let Some(limits) = opts.limits {
        limits.check_dimensions(dims.0, dims.1)?;
        limits.check_memory(u64::from(dims.0) * u64::from(dims.1) * 4)?;
    }
    Ok(())
}

fn decode_bytes(
    data: &[u8],
    mime: Option<&str>,
    opts: &MaterializeOptions<'_>,
) -> Result<(Raster, (u32, u32)), EngineError> {
    if data.is_empty() {
        return Err(EngineError::new(
            ErrorCode::InvalidSource,
            "source byte buffer is empty",
        ));
    }

    let hinted = mime.map(|m| {
        ImageFormat::from_mime(m).ok_or_else(|| {
            EngineError::new(
                ErrorCode::SourceLoadFailed,
                format!("unknown mime type {m:?}"),
            )
        })
    });
    let format = match hinted {
        Some(result) => result?,
        None => ImageFormat::detect(data).ok_or_else(|| {
            EngineError::new(
                ErrorCode::UnsupportedFormat,
                "unrecognized image data (no known signature)",
            )
        })?,
    };

    if format == ImageFormat::Svg {
        let text = std::str::from_utf8(data).map_err(|e| {
            EngineError::new(ErrorCode::SvgProcessingFailed, "svg data is not utf-8")
                .with_source(e)
        })?;
        return materialize_svg(text, opts);
    }

    let raster = crate::codecs::decode(data, format)?;
    check_limits(opts, raster.dimensions())?;
    let dims = raster.dimensions();
    Ok((raster, dims))
}

fn materialize_svg(
    text: &str,
    opts: &MaterializeOptions<'_>,
) -> Result<(Raster, (u32, u32)), EngineError> {
    if text.trim().is_empty() {
        return Err(EngineError::new(
            ErrorCode::InvalidSource,
            "svg text is empty",
        ));
    }
    if !text.contains("<svg") {
        return Err(EngineError::new(
            ErrorCode::SvgProcessingFailed,
            "no <svg> element found",
        ));
    }

    let intrinsic = crate::svg::intrinsic_size(text);
    let (render_w, render_h) = opts.element_size.unwrap_or(intrinsic);
    if let Some(limits) = opts.limits {
        limits.check_dimensions(render_w, render_h)?;
    }

    let rasterizer = opts.rasterizer.ok_or_else(|| {
        EngineError::new(
            ErrorCode::SvgLoadFailed,
            "vector sources need a rasterizer",
        )
        .with_suggestion("provide a VectorRasterizer via with_rasterizer")
    })?;

    let data_url = crate::svg::to_data_url(text);
    let raster = rasterizer
        .rasterize(&data_url, render_w.max(1), render_h.max(1))
        .map_err(|e| {
            EngineError::new(ErrorCode::SvgLoadFailed, "svg rasterization failed")
                .with_source(SourceFailure(e))
                .with_dimensions(render_w, render_h)
        })?;
    Ok((raster, intrinsic))
}

fn materialize_url(
    url: &str,
    opts: &MaterializeOptions<'_>,
) -> Result<(Raster, (u32, u32)), EngineError> {
    if url.trim().is_empty() {
        return Err(EngineError::new(
            ErrorCode::InvalidSource,
            "source url is empty",
        ));
    }

    if let Some(rest) = url.strip_prefix("data:") {
        let (data, mime) = parse_data_url(rest)?;
        return decode_bytes(&data, mime.as_deref(), opts);
    }

    let resolver = opts.resolver.ok_or_else(|| {
        EngineError::new(
            ErrorCode::SourceLoadFailed,
            format!("no resolver available for {url:?}"),
        )
        .with_suggestion("provide a SourceResolver via with_resolver")
    })?;

    let data = resolver.fetch(url).map_err(|e| {
        let mut err = EngineError::new(
            ErrorCode::SourceLoadFailed,
            format!("fetching {url:?} failed"),
        )
        .with_source(SourceFailure(e));
        if let Some(origin) = opts.cross_origin {
            let mut context = err.context().clone();
            context.detail = Some(format!("cross-origin={origin}"));
            err = err.with_context(context);
        }
        err
    })?;
    decode_bytes(&data, None, opts)
}

/// Split `mediatype[;params],payload` and percent-decode the payload.
/// Base64 payloads are not handled in-core.
fn parse_data_url(rest: &str) -> Result<(Vec<u8>, Option<String>), EngineError> {
    let comma = rest.find(',').ok_or_else(|| {
        EngineError::new(ErrorCode::InvalidSource, "malformed data url (no comma)")
    })?;
    let (meta, payload) = rest.split_at(comma);
    let payload = &payload[1..];

    if meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(EngineError::new(
            ErrorCode::SourceLoadFailed,
            "base64 data urls are not decoded in-core",
        )
        .with_suggestion("decode the payload and pass it as bytes"));
    }

    let mime = meta
        .split(';')
        .next()
        .filter(|m| !m.is_empty())
        .map(str::to_owned);
    let data: Vec<u8> = percent_decode_str(payload).collect();
    Ok((data, mime))
}

/// Adapter so boxed collaborator errors chain as a cause.
#[derive(Debug)]
struct SourceFailure(BoxError);

impl std::fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for SourceFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}
