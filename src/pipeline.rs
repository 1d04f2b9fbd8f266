//! The lazy processing pipeline.
//!
//! A pipeline records one optional resize and any number of filter ops, then
//! rasterizes exactly once when a terminal call arrives. Nothing is decoded
//! or allocated before that. Instances are single-use: after a terminal call
//! every further operation fails.

use std::sync::Arc;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::error::{EngineError, ErrorCode};
use crate::filters::{self, FilterOp, FilterParams};
use crate::format::OutputFormat;
use crate::geometry::{self, ResizeConfig};
use crate::limits::{Limits, Stop};
use crate::raster::Raster;
use crate::resize::{self, ProgressFn, RenderCtx};
use crate::source::{
    materialize, MaterializeOptions, SourceResolver, SourceToken, VectorRasterizer,
};
use crate::strategy::{self, Quality};

/// Result metadata for one pipeline execution.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Metadata {
    /// Final raster width.
    pub width: u32,
    /// Final raster height.
    pub height: u32,
    /// Milliseconds from execution start to just before encoding, monotonic.
    pub processing_time_ms: f64,
    /// Intrinsic dimensions of the source.
    pub original_size: (u32, u32),
    /// Encoded byte length, for encoded outputs.
    pub bytes_len: Option<usize>,
    /// Output container, for encoded outputs.
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PipelineState {
    Fresh,
    Resized,
    Terminal,
}

/// The recorded resize. Shortcuts that depend on the source dimensions
/// stay symbolic until execution.
#[derive(Clone, Debug, PartialEq)]
enum RecordedResize {
    Config(ResizeConfig),
    Scale { x: f64, y: f64 },
    ExactWidth(u32),
    ExactHeight(u32),
}

impl RecordedResize {
    fn resolve(&self, source: (u32, u32)) -> ResizeConfig {
        let (sw, sh) = (f64::from(source.0), f64::from(source.1));
        let dim = |v: f64| (v.round_ties_even() as u32).max(1);
        match self {
            RecordedResize::Config(config) => config.clone(),
            RecordedResize::Scale { x, y } => ResizeConfig::fill(dim(sw * x), dim(sh * y)),
            RecordedResize::ExactWidth(w) => {
                ResizeConfig::fill(*w, dim(sh * f64::from(*w) / sw))
            }
            RecordedResize::ExactHeight(h) => {
                ResizeConfig::fill(dim(sw * f64::from(*h) / sh), *h)
            }
        }
    }
}

/// Single-use builder and executor for one end-to-end transform.
///
/// # Example
///
/// ```no_run
/// use rasterpipe::{OutputFormat, Pipeline, ResizeConfig};
///
/// let bytes: Vec<u8> = Vec::new(); // your encoded image
/// let mut pipeline = Pipeline::from_bytes(bytes);
/// pipeline.resize(ResizeConfig::cover(400, 300))?;
/// pipeline.grayscale()?.blur(1.5)?;
/// let (png, meta) = pipeline.to_encoded(OutputFormat::Png, None)?;
/// println!("{}x{} -> {} bytes", meta.width, meta.height, png.len());
/// # Ok::<(), rasterpipe::EngineError>(())
/// ```
pub struct Pipeline<'a> {
    source: Option<SourceToken>,
    state: PipelineState,
    resize: Option<RecordedResize>,
    filters: Vec<FilterOp>,
    quality: Quality,
    config: EngineConfig,
    output_hint: Option<OutputFormat>,
    cross_origin: Option<String>,
    element_size: Option<(u32, u32)>,
    limits: Option<&'a Limits>,
    stop: Option<&'a dyn Stop>,
    progress: Option<&'a ProgressFn>,
    resolver: Option<&'a dyn SourceResolver>,
    rasterizer: Option<&'a dyn VectorRasterizer>,
}

impl<'a> std::fmt::Debug for Pipeline<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &self.state)
            .field("resize", &self.resize)
            .field("filters", &self.filters)
            .field("quality", &self.quality)
            .field("config", &self.config)
            .field("output_hint", &self.output_hint)
            .field("cross_origin", &self.cross_origin)
            .field("element_size", &self.element_size)
            .finish_non_exhaustive()
    }
}

/// Start a pipeline from any source token.
pub fn process_image(source: SourceToken) -> Pipeline<'static> {
    Pipeline::from_source(source)
}

impl<'a> Pipeline<'a> {
    pub fn from_source(source: SourceToken) -> Pipeline<'a> {
        Pipeline {
            source: Some(source),
            state: PipelineState::Fresh,
            resize: None,
            filters: Vec::new(),
            quality: Quality::default(),
            config: EngineConfig::default(),
            output_hint: None,
            cross_origin: None,
            element_size: None,
            limits: None,
            stop: None,
            progress: None,
            resolver: None,
            rasterizer: None,
        }
    }

    /// From encoded bytes; format is detected from magic bytes.
    pub fn from_bytes(data: Vec<u8>) -> Pipeline<'a> {
        Self::from_source(SourceToken::Bytes { data, mime: None })
    }

    /// From encoded bytes with a MIME hint.
    pub fn from_bytes_with_mime(data: Vec<u8>, mime: &str) -> Pipeline<'a> {
        Self::from_source(SourceToken::Bytes {
            data,
            mime: Some(mime.to_owned()),
        })
    }

    /// From already-decoded pixels.
    pub fn from_raster(raster: Raster) -> Pipeline<'a> {
        Self::from_source(SourceToken::Raster(raster))
    }

    /// From a shared decoded image; pixels are copied at execution.
    pub fn from_shared(raster: Arc<Raster>) -> Pipeline<'a> {
        Self::from_source(SourceToken::Shared(raster))
    }

    /// From SVG document text.
    pub fn from_svg(text: &str) -> Pipeline<'a> {
        Self::from_source(SourceToken::Svg(text.to_owned()))
    }

    /// From a URL-like token (`data:` URLs decode inline).
    pub fn from_url(url: &str) -> Pipeline<'a> {
        Self::from_source(SourceToken::Url(url.to_owned()))
    }

    // --- configuration (before recording operations) ---

    /// Resampling quality (default Balanced).
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Engine tuning knobs.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Resource limits checked at decode and canvas allocation.
    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Cancellation token, checked between tiles and pyramid steps.
    pub fn with_stop(mut self, stop: &'a dyn Stop) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Tile progress callback `(completed, total)`. Must not block.
    pub fn with_progress(mut self, progress: &'a ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Resolver for network/file URL sources.
    pub fn with_resolver(mut self, resolver: &'a dyn SourceResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Rasterizer for vector sources.
    pub fn with_rasterizer(mut self, rasterizer: &'a dyn VectorRasterizer) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// Preferred output container, used by [`to_encoded_default`](Self::to_encoded_default).
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_hint = Some(format);
        self
    }

    /// Cross-origin hint, carried into error context on fetch failures.
    pub fn with_cross_origin(mut self, hint: &str) -> Self {
        self.cross_origin = Some(hint.to_owned());
        self
    }

    /// Decode-target size for vector sources.
    pub fn with_element_size(mut self, width: u32, height: u32) -> Self {
        self.element_size = Some((width, height));
        self
    }

    // --- the one resize ---

    /// Record the resize. May be called at most once per pipeline; a second
    /// call fails without touching the recorded configuration.
    pub fn resize(&mut self, config: ResizeConfig) -> Result<&mut Self, EngineError> {
        self.ensure_active()?;
        if self.state == PipelineState::Resized {
            return Err(EngineError::new(
                ErrorCode::MultipleResizeNotAllowed,
                "resize may only be called once per pipeline",
            ));
        }
        config.validate()?;
        self.resize = Some(RecordedResize::Config(config));
        self.state = PipelineState::Resized;
        Ok(self)
    }

    fn record_resize(&mut self, recorded: RecordedResize) -> Result<&mut Self, EngineError> {
        self.ensure_active()?;
        if self.state == PipelineState::Resized {
            return Err(EngineError::new(
                ErrorCode::MultipleResizeNotAllowed,
                "resize may only be called once per pipeline",
            ));
        }
        self.resize = Some(recorded);
        self.state = PipelineState::Resized;
        Ok(self)
    }

    /// Fill the box, cropping overflow.
    pub fn cover_box(&mut self, width: u32, height: u32) -> Result<&mut Self, EngineError> {
        self.resize(ResizeConfig::cover(width, height))
    }

    /// Fit inside the box, letterboxing.
    pub fn contain_box(&mut self, width: u32, height: u32) -> Result<&mut Self, EngineError> {
        self.resize(ResizeConfig::contain(width, height))
    }

    /// Exactly this size; aspect may change.
    pub fn exact_size(&mut self, width: u32, height: u32) -> Result<&mut Self, EngineError> {
        self.resize(ResizeConfig::fill(width, height))
    }

    /// Cap the width, shrinking only.
    pub fn max_width(&mut self, width: u32) -> Result<&mut Self, EngineError> {
        self.resize(ResizeConfig::max_width(width))
    }

    /// Cap the height, shrinking only.
    pub fn max_height(&mut self, height: u32) -> Result<&mut Self, EngineError> {
        self.resize(ResizeConfig::max_height(height))
    }

    /// Raise the width, growing only.
    pub fn min_width(&mut self, width: u32) -> Result<&mut Self, EngineError> {
        self.resize(ResizeConfig::min_width(width))
    }

    /// Raise the height, growing only.
    pub fn min_height(&mut self, height: u32) -> Result<&mut Self, EngineError> {
        self.resize(ResizeConfig::min_height(height))
    }

    /// Uniform scale by `factor`.
    pub fn scale(&mut self, factor: f64) -> Result<&mut Self, EngineError> {
        check_scale(factor)?;
        self.record_resize(RecordedResize::Scale {
            x: factor,
            y: factor,
        })
    }

    /// Scale the x axis only.
    pub fn scale_x(&mut self, factor: f64) -> Result<&mut Self, EngineError> {
        check_scale(factor)?;
        self.record_resize(RecordedResize::Scale { x: factor, y: 1.0 })
    }

    /// Scale the y axis only.
    pub fn scale_y(&mut self, factor: f64) -> Result<&mut Self, EngineError> {
        check_scale(factor)?;
        self.record_resize(RecordedResize::Scale { x: 1.0, y: factor })
    }

    /// Exact width, height follows the aspect ratio.
    pub fn exact_width(&mut self, width: u32) -> Result<&mut Self, EngineError> {
        if width == 0 {
            return Err(zero_dimension());
        }
        self.record_resize(RecordedResize::ExactWidth(width))
    }

    /// Exact height, width follows the aspect ratio.
    pub fn exact_height(&mut self, height: u32) -> Result<&mut Self, EngineError> {
        if height == 0 {
            return Err(zero_dimension());
        }
        self.record_resize(RecordedResize::ExactHeight(height))
    }

    // --- filters ---

    /// Record a filter op. Parameters are validated at execution; order is
    /// significant.
    pub fn filter(&mut self, name: &str, params: FilterParams) -> Result<&mut Self, EngineError> {
        self.ensure_active()?;
        self.filters.push(FilterOp::new(name, params));
        Ok(self)
    }

    pub fn brightness(&mut self, value: f64) -> Result<&mut Self, EngineError> {
        self.filter("brightness", FilterParams::new().set("value", value))
    }

    pub fn contrast(&mut self, value: f64) -> Result<&mut Self, EngineError> {
        self.filter("contrast", FilterParams::new().set("value", value))
    }

    pub fn saturation(&mut self, value: f64) -> Result<&mut Self, EngineError> {
        self.filter("saturation", FilterParams::new().set("value", value))
    }

    pub fn grayscale(&mut self) -> Result<&mut Self, EngineError> {
        self.filter("grayscale", FilterParams::new())
    }

    pub fn sepia(&mut self, intensity: f64) -> Result<&mut Self, EngineError> {
        self.filter("sepia", FilterParams::new().set("intensity", intensity))
    }

    pub fn invert(&mut self) -> Result<&mut Self, EngineError> {
        self.filter("invert", FilterParams::new())
    }

    pub fn noise(&mut self, intensity: f64) -> Result<&mut Self, EngineError> {
        self.filter("noise", FilterParams::new().set("intensity", intensity))
    }

    pub fn vignette(&mut self, intensity: f64, size: f64, blur: f64) -> Result<&mut Self, EngineError> {
        self.filter(
            "vignette",
            FilterParams::new()
                .set("intensity", intensity)
                .set("size", size)
                .set("blur", blur),
        )
    }

    pub fn pixelate(&mut self, pixel_size: u32) -> Result<&mut Self, EngineError> {
        self.filter("pixelate", FilterParams::new().set("pixelSize", pixel_size))
    }

    pub fn posterize(&mut self, levels: u32) -> Result<&mut Self, EngineError> {
        self.filter("posterize", FilterParams::new().set("levels", levels))
    }

    pub fn blur(&mut self, radius: f64) -> Result<&mut Self, EngineError> {
        self.filter("blur", FilterParams::new().set("radius", radius))
    }

    pub fn sharpen(&mut self, amount: f64) -> Result<&mut Self, EngineError> {
        self.filter("sharpen", FilterParams::new().set("amount", amount))
    }

    pub fn emboss(&mut self, strength: f64) -> Result<&mut Self, EngineError> {
        self.filter("emboss", FilterParams::new().set("strength", strength))
    }

    pub fn edge_detection(&mut self, sensitivity: f64) -> Result<&mut Self, EngineError> {
        self.filter(
            "edgeDetection",
            FilterParams::new().set("sensitivity", sensitivity),
        )
    }

    // --- terminal operations ---

    /// Rasterize and return the pixels.
    pub fn to_raster(&mut self) -> Result<(Raster, Metadata), EngineError> {
        self.execute()
    }

    /// Rasterize and encode. `quality` is 0.0–1.0 for lossy containers
    /// (default 0.8) and ignored for PNG.
    pub fn to_encoded(
        &mut self,
        format: OutputFormat,
        quality: Option<f32>,
    ) -> Result<(Vec<u8>, Metadata), EngineError> {
        let (raster, mut metadata) = self.execute()?;
        let bytes = crate::codecs::encode(&raster, format, quality)?;
        crate::raster::pool_recycle(raster, self.config.pool_slots);
        metadata.bytes_len = Some(bytes.len());
        metadata.format = Some(format);
        Ok((bytes, metadata))
    }

    /// Rasterize and encode using the recorded output hint (PNG when none
    /// was recorded) at the default quality.
    pub fn to_encoded_default(&mut self) -> Result<(Vec<u8>, Metadata), EngineError> {
        let format = self.output_hint.unwrap_or_default();
        self.to_encoded(format, None)
    }

    fn execute(&mut self) -> Result<(Raster, Metadata), EngineError> {
        self.ensure_active()?;
        self.state = PipelineState::Terminal;
        let start = Instant::now();

        let token = self.source.take().ok_or_else(|| {
            EngineError::new(ErrorCode::InvalidSource, "pipeline has no source")
        })?;

        let options = MaterializeOptions {
            cross_origin: self.cross_origin.as_deref(),
            element_size: self.element_size,
            resolver: self.resolver,
            rasterizer: self.rasterizer,
            limits: self.limits,
        };
        let (mut raster, intrinsic) = materialize(token, &options)?;

        if let Some(recorded) = &self.resize {
            let config = recorded.resolve(raster.dimensions());
            let plan = geometry::plan(raster.width(), raster.height(), &config)?;
            let strategy = strategy::select(
                raster.dimensions(),
                (plan.draw.width, plan.draw.height),
                self.quality,
                strategy::memory_pressure(&self.config),
                &self.config,
            );
            log::debug!(
                "resize {}x{} -> {}x{} via {strategy:?}",
                raster.width(),
                raster.height(),
                plan.canvas_width,
                plan.canvas_height,
            );
            let ctx = RenderCtx {
                quality: self.quality,
                config: &self.config,
                limits: self.limits,
                stop: self.stop,
                progress: self.progress,
            };
            raster = resize::execute(raster, &plan, strategy, &ctx)?;
        }

        if !self.filters.is_empty() {
            raster = filters::apply_chain(raster, &self.filters)?;
        }

        let metadata = Metadata {
            width: raster.width(),
            height: raster.height(),
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            original_size: intrinsic,
            bytes_len: None,
            format: None,
        };
        Ok((raster, metadata))
    }

    fn ensure_active(&self) -> Result<(), EngineError> {
        if self.state == PipelineState::Terminal {
            return Err(EngineError::new(
                ErrorCode::MultipleResizeNotAllowed,
                "pipeline already executed (instances are single-use)",
            ));
        }
        Ok(())
    }
}

fn check_scale(factor: f64) -> Result<(), EngineError> {
    if factor.is_finite() && factor > 0.0 {
        Ok(())
    } else {
        Err(EngineError::new(
            ErrorCode::InvalidDimensions,
            format!("scale factor must be positive and finite, got {factor}"),
        ))
    }
}

fn zero_dimension() -> EngineError {
    EngineError::new(
        ErrorCode::InvalidDimensions,
        "target dimension must be a positive integer",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ImageFormat;

    fn gradient(w: u32, h: u32) -> Raster {
        let mut raster = Raster::new(w, h).unwrap();
        for y in 0..h {
            for x in 0..w {
                let i = ((y * w + x) * 4) as usize;
                raster.as_bytes_mut()[i] = (x * 7 % 256) as u8;
                raster.as_bytes_mut()[i + 1] = (y * 11 % 256) as u8;
                raster.as_bytes_mut()[i + 2] = 64;
                raster.as_bytes_mut()[i + 3] = 255;
            }
        }
        raster
    }

    #[test]
    fn resize_and_rasterize() {
        let mut pipeline = Pipeline::from_raster(gradient(200, 100));
        pipeline.resize(ResizeConfig::cover(100, 100)).unwrap();
        let (raster, metadata) = pipeline.to_raster().unwrap();
        assert_eq!(raster.dimensions(), (100, 100));
        assert_eq!(metadata.width, 100);
        assert_eq!(metadata.height, 100);
        assert_eq!(metadata.original_size, (200, 100));
        assert!(metadata.processing_time_ms >= 0.0);
        assert_eq!(metadata.bytes_len, None);
    }

    #[test]
    fn second_resize_rejected_but_pipeline_survives() {
        let mut pipeline = Pipeline::from_raster(gradient(200, 100));
        pipeline.resize(ResizeConfig::cover(100, 100)).unwrap();
        let err = pipeline.resize(ResizeConfig::fill(50, 50)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MultipleResizeNotAllowed);
        // The first resize is still in effect
        let (raster, _) = pipeline.to_raster().unwrap();
        assert_eq!(raster.dimensions(), (100, 100));
    }

    #[test]
    fn shortcut_occupies_the_single_resize_slot() {
        let mut pipeline = Pipeline::from_raster(gradient(10, 10));
        pipeline.scale(2.0).unwrap();
        let err = pipeline.cover_box(4, 4).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MultipleResizeNotAllowed);
    }

    #[test]
    fn pipeline_is_single_use() {
        let mut pipeline = Pipeline::from_raster(gradient(8, 8));
        pipeline.to_raster().unwrap();
        let err = pipeline.to_raster().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MultipleResizeNotAllowed);
        let err = pipeline.invert().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MultipleResizeNotAllowed);
    }

    #[test]
    fn no_ops_is_identity() {
        let source = gradient(33, 21);
        let bytes = source.as_bytes().to_vec();
        let mut pipeline = Pipeline::from_raster(source);
        let (raster, metadata) = pipeline.to_raster().unwrap();
        assert_eq!(raster.as_bytes(), &bytes[..]);
        assert_eq!(metadata.original_size, (33, 21));
    }

    #[test]
    fn filters_apply_without_resize() {
        let mut pipeline = Pipeline::from_raster(gradient(16, 16));
        pipeline.invert().unwrap();
        let (raster, _) = pipeline.to_raster().unwrap();
        assert_eq!(raster.dimensions(), (16, 16));
        // gradient(0,0) is [0, 0, 64, 255]
        assert_eq!(raster.pixel(0, 0), [255, 255, 191, 255]);
    }

    #[test]
    fn filter_order_matters() {
        let run = |first: &str, second: &str| {
            let mut pipeline = Pipeline::from_raster(gradient(24, 24));
            for op in [first, second] {
                match op {
                    "posterize" => pipeline.posterize(3).unwrap(),
                    "brightness" => pipeline.brightness(30.0).unwrap(),
                    _ => unreachable!(),
                };
            }
            pipeline.to_raster().unwrap().0
        };
        let a = run("posterize", "brightness");
        let b = run("brightness", "posterize");
        // Quantizing before vs after the shift cannot agree: b's channels
        // stay on the 3-level grid, a's are shifted off it.
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn scale_resolves_against_source() {
        let mut pipeline = Pipeline::from_raster(gradient(100, 50));
        pipeline.scale(0.5).unwrap();
        let (raster, _) = pipeline.to_raster().unwrap();
        assert_eq!(raster.dimensions(), (50, 25));
    }

    #[test]
    fn axis_scales_and_exact_dimensions() {
        let mut pipeline = Pipeline::from_raster(gradient(100, 50));
        pipeline.scale_x(2.0).unwrap();
        assert_eq!(pipeline.to_raster().unwrap().0.dimensions(), (200, 50));

        let mut pipeline = Pipeline::from_raster(gradient(100, 50));
        pipeline.exact_width(200).unwrap();
        assert_eq!(pipeline.to_raster().unwrap().0.dimensions(), (200, 100));

        let mut pipeline = Pipeline::from_raster(gradient(100, 50));
        pipeline.exact_height(25).unwrap();
        assert_eq!(pipeline.to_raster().unwrap().0.dimensions(), (50, 25));
    }

    #[test]
    fn encoded_png_round_trips_exact_dimensions() {
        let mut pipeline = Pipeline::from_raster(gradient(300, 200));
        pipeline.exact_size(123, 45).unwrap();
        let (bytes, metadata) = pipeline.to_encoded(OutputFormat::Png, None).unwrap();
        assert_eq!(metadata.format, Some(OutputFormat::Png));
        assert_eq!(metadata.bytes_len, Some(bytes.len()));
        let decoded = crate::codecs::decode(&bytes, ImageFormat::Png).unwrap();
        assert_eq!(decoded.dimensions(), (123, 45));
    }

    #[test]
    fn output_hint_drives_default_encoding() {
        let mut pipeline =
            Pipeline::from_raster(gradient(10, 10)).with_output_format(OutputFormat::Jpeg);
        let (bytes, metadata) = pipeline.to_encoded_default().unwrap();
        assert_eq!(metadata.format, Some(OutputFormat::Jpeg));
        assert_eq!(ImageFormat::detect(&bytes), Some(ImageFormat::Jpeg));

        // No hint recorded: PNG
        let mut pipeline = Pipeline::from_raster(gradient(10, 10));
        let (_, metadata) = pipeline.to_encoded_default().unwrap();
        assert_eq!(metadata.format, Some(OutputFormat::Png));
    }

    #[test]
    fn invalid_filter_params_fail_at_execution_with_index() {
        let mut pipeline = Pipeline::from_raster(gradient(8, 8));
        pipeline.invert().unwrap();
        pipeline.blur(999.0).unwrap(); // recorded fine, invalid at run time
        let err = pipeline.to_raster().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProcessingFailed);
        assert_eq!(err.context().index, Some(1));
    }

    #[test]
    fn invalid_resize_config_rejected_at_record_time() {
        let mut pipeline = Pipeline::from_raster(gradient(8, 8));
        let err = pipeline.resize(ResizeConfig::fill(0, 10)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidDimensions);
        // State is still Fresh, so a valid resize works
        pipeline.resize(ResizeConfig::fill(4, 4)).unwrap();
        assert_eq!(pipeline.to_raster().unwrap().0.dimensions(), (4, 4));
    }

    #[test]
    fn bad_scale_factors_rejected() {
        let mut pipeline = Pipeline::from_raster(gradient(8, 8));
        assert!(pipeline.scale(0.0).is_err());
        assert!(pipeline.scale(f64::NAN).is_err());
        assert!(pipeline.scale(f64::INFINITY).is_err());
        // None of those took the resize slot
        pipeline.scale(1.5).unwrap();
    }

    #[test]
    fn cancellation_surfaces_timeout() {
        use std::sync::atomic::AtomicBool;
        let stop = AtomicBool::new(true);
        // A safe dimension below the source forces the tiled backend, which
        // consults the stop token between waves.
        let config = EngineConfig::default()
            .with_max_safe_dimension(256)
            .with_tile_size(64)
            .with_tile_overlap(8);
        let mut pipeline = Pipeline::from_raster(gradient(400, 400))
            .with_config(config)
            .with_stop(&stop);
        pipeline.exact_size(100, 100).unwrap();
        let err = pipeline.to_raster().unwrap_err();
        assert_eq!(err.code(), ErrorCode::TimeoutError);
    }
}
