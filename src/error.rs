//! Unified error type for pipeline operations.

use std::fmt;

/// Stable error codes surfaced to callers.
///
/// Codes are a wire-level contract: `as_str` strings never change between
/// versions. New codes may be added, so the enum is non-exhaustive.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Source
    InvalidSource,
    UnsupportedFormat,
    SourceLoadFailed,
    SvgLoadFailed,
    SvgProcessingFailed,
    // Processing
    CanvasCreationFailed,
    CanvasContextFailed,
    ResizeFailed,
    ConversionFailed,
    BlurFailed,
    ProcessingFailed,
    SmartResizeFailed,
    // Output
    OutputFailed,
    DownloadFailed,
    FileTooLarge,
    CanvasToBlobFailed,
    BlobToArrayBufferFailed,
    BlobConversionError,
    ImageLoadFailed,
    // Dimensions / resources
    InvalidDimensions,
    DimensionTooLarge,
    MemoryError,
    TimeoutError,
    // Contract
    MultipleResizeNotAllowed,
    BrowserNotSupported,
    FeatureNotSupported,
    CanvasContextError,
}

impl ErrorCode {
    pub(crate) const COUNT: usize = 27;

    /// Stable string form of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidSource => "INVALID_SOURCE",
            ErrorCode::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorCode::SourceLoadFailed => "SOURCE_LOAD_FAILED",
            ErrorCode::SvgLoadFailed => "SVG_LOAD_FAILED",
            ErrorCode::SvgProcessingFailed => "SVG_PROCESSING_FAILED",
            ErrorCode::CanvasCreationFailed => "CANVAS_CREATION_FAILED",
            ErrorCode::CanvasContextFailed => "CANVAS_CONTEXT_FAILED",
            ErrorCode::ResizeFailed => "RESIZE_FAILED",
            ErrorCode::ConversionFailed => "CONVERSION_FAILED",
            ErrorCode::BlurFailed => "BLUR_FAILED",
            ErrorCode::ProcessingFailed => "PROCESSING_FAILED",
            ErrorCode::SmartResizeFailed => "SMART_RESIZE_FAILED",
            ErrorCode::OutputFailed => "OUTPUT_FAILED",
            ErrorCode::DownloadFailed => "DOWNLOAD_FAILED",
            ErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ErrorCode::CanvasToBlobFailed => "CANVAS_TO_BLOB_FAILED",
            ErrorCode::BlobToArrayBufferFailed => "BLOB_TO_ARRAYBUFFER_FAILED",
            ErrorCode::BlobConversionError => "BLOB_CONVERSION_ERROR",
            ErrorCode::ImageLoadFailed => "IMAGE_LOAD_FAILED",
            ErrorCode::InvalidDimensions => "INVALID_DIMENSIONS",
            ErrorCode::DimensionTooLarge => "DIMENSION_TOO_LARGE",
            ErrorCode::MemoryError => "MEMORY_ERROR",
            ErrorCode::TimeoutError => "TIMEOUT_ERROR",
            ErrorCode::MultipleResizeNotAllowed => "MULTIPLE_RESIZE_NOT_ALLOWED",
            ErrorCode::BrowserNotSupported => "BROWSER_NOT_SUPPORTED",
            ErrorCode::FeatureNotSupported => "FEATURE_NOT_SUPPORTED",
            ErrorCode::CanvasContextError => "CANVAS_CONTEXT_ERROR",
        }
    }

    /// Critical errors trigger internal cleanup (raster pool clear).
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            ErrorCode::CanvasCreationFailed
                | ErrorCode::CanvasContextFailed
                | ErrorCode::BrowserNotSupported
        )
    }

    pub(crate) fn index(self) -> usize {
        match self {
            ErrorCode::InvalidSource => 0,
            ErrorCode::UnsupportedFormat => 1,
            ErrorCode::SourceLoadFailed => 2,
            ErrorCode::SvgLoadFailed => 3,
            ErrorCode::SvgProcessingFailed => 4,
            ErrorCode::CanvasCreationFailed => 5,
            ErrorCode::CanvasContextFailed => 6,
            ErrorCode::ResizeFailed => 7,
            ErrorCode::ConversionFailed => 8,
            ErrorCode::BlurFailed => 9,
            ErrorCode::ProcessingFailed => 10,
            ErrorCode::SmartResizeFailed => 11,
            ErrorCode::OutputFailed => 12,
            ErrorCode::DownloadFailed => 13,
            ErrorCode::FileTooLarge => 14,
            ErrorCode::CanvasToBlobFailed => 15,
            ErrorCode::BlobToArrayBufferFailed => 16,
            ErrorCode::BlobConversionError => 17,
            ErrorCode::ImageLoadFailed => 18,
            ErrorCode::InvalidDimensions => 19,
            ErrorCode::DimensionTooLarge => 20,
            ErrorCode::MemoryError => 21,
            ErrorCode::TimeoutError => 22,
            ErrorCode::MultipleResizeNotAllowed => 23,
            ErrorCode::BrowserNotSupported => 24,
            ErrorCode::FeatureNotSupported => 25,
            ErrorCode::CanvasContextError => 26,
        }
    }

    pub(crate) fn from_index(i: usize) -> Option<Self> {
        const ALL: [ErrorCode; ErrorCode::COUNT] = [
            ErrorCode::InvalidSource,
            ErrorCode::UnsupportedFormat,
            ErrorCode::SourceLoadFailed,
            ErrorCode::SvgLoadFailed,
            ErrorCode::SvgProcessingFailed,
            ErrorCode::CanvasCreationFailed,
            ErrorCode::CanvasContextFailed,
            ErrorCode::ResizeFailed,
            ErrorCode::ConversionFailed,
            ErrorCode::BlurFailed,
            ErrorCode::ProcessingFailed,
            ErrorCode::SmartResizeFailed,
            ErrorCode::OutputFailed,
            ErrorCode::DownloadFailed,
            ErrorCode::FileTooLarge,
            ErrorCode::CanvasToBlobFailed,
            ErrorCode::BlobToArrayBufferFailed,
            ErrorCode::BlobConversionError,
            ErrorCode::ImageLoadFailed,
            ErrorCode::InvalidDimensions,
            ErrorCode::DimensionTooLarge,
            ErrorCode::MemoryError,
            ErrorCode::TimeoutError,
            ErrorCode::MultipleResizeNotAllowed,
            ErrorCode::BrowserNotSupported,
            ErrorCode::FeatureNotSupported,
            ErrorCode::CanvasContextError,
        ];
        ALL.get(i).copied()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured context attached at the first boundary that knows it.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct ErrorContext {
    /// Operation that failed (e.g. "decode", "plan", "tiled-resize").
    pub operation: Option<&'static str>,
    /// Dimensions relevant to the failure.
    pub dimensions: Option<(u32, u32)>,
    /// Format name relevant to the failure.
    pub format: Option<&'static str>,
    /// Position in a chain (e.g. failing filter index).
    pub index: Option<usize>,
    /// Free-form detail.
    pub detail: Option<String>,
}

impl ErrorContext {
    fn is_empty(&self) -> bool {
        self.operation.is_none()
            && self.dimensions.is_none()
            && self.format.is_none()
            && self.index.is_none()
            && self.detail.is_none()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if let Some(op) = self.operation {
            write!(f, "op={op}")?;
            sep = " ";
        }
        if let Some((w, h)) = self.dimensions {
            write!(f, "{sep}dims={w}x{h}")?;
            sep = " ";
        }
        if let Some(format) = self.format {
            write!(f, "{sep}format={format}")?;
            sep = " ";
        }
        if let Some(index) = self.index {
            write!(f, "{sep}index={index}")?;
            sep = " ";
        }
        if let Some(detail) = &self.detail {
            write!(f, "{sep}{detail}")?;
        }
        Ok(())
    }
}

/// Unified error for every fallible pipeline operation.
///
/// Carries a stable [`ErrorCode`], a human-readable message, optional
/// structured context, an optional suggestion, and the underlying cause.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct EngineError {
    code: ErrorCode,
    message: String,
    context: ErrorContext,
    suggestion: Option<&'static str>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EngineError {
    /// Create an error and record it in the process-wide counters.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let err = Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            suggestion: None,
            source: None,
        };
        crate::observe::record(&err);
        err
    }

    /// Wrap an underlying cause.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach structured context.
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    /// Shorthand for attaching only the failing operation name.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.context.operation = Some(operation);
        self
    }

    /// Shorthand for attaching relevant dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.context.dimensions = Some((width, height));
        self
    }

    /// Attach a remediation hint for the caller.
    pub fn with_suggestion(mut self, suggestion: &'static str) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn suggestion(&self) -> Option<&'static str> {
        self.suggestion
    }

    /// Full single-line rendering including context and suggestion.
    pub fn describe(&self) -> String {
        let mut s = format!("{}: {}", self.code, self.message);
        if !self.context.is_empty() {
            s.push_str(&format!(" ({})", self.context));
        }
        if let Some(hint) = self.suggestion {
            s.push_str(&format!(" — {hint}"));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_index() {
        for i in 0..ErrorCode::COUNT {
            let code = ErrorCode::from_index(i).unwrap();
            assert_eq!(code.index(), i);
        }
        assert!(ErrorCode::from_index(ErrorCode::COUNT).is_none());
    }

    #[test]
    fn stable_strings() {
        assert_eq!(
            ErrorCode::MultipleResizeNotAllowed.as_str(),
            "MULTIPLE_RESIZE_NOT_ALLOWED"
        );
        assert_eq!(ErrorCode::TimeoutError.as_str(), "TIMEOUT_ERROR");
        assert_eq!(
            ErrorCode::BlobToArrayBufferFailed.as_str(),
            "BLOB_TO_ARRAYBUFFER_FAILED"
        );
    }

    #[test]
    fn critical_set() {
        assert!(ErrorCode::CanvasCreationFailed.is_critical());
        assert!(ErrorCode::BrowserNotSupported.is_critical());
        assert!(!ErrorCode::ResizeFailed.is_critical());
    }

    #[test]
    fn describe_includes_context_and_suggestion() {
        let err = EngineError::new(ErrorCode::ResizeFailed, "scale failed")
            .with_operation("direct-resize")
            .with_dimensions(800, 600)
            .with_suggestion("reduce the target dimensions");
        let s = err.describe();
        assert!(s.contains("RESIZE_FAILED"));
        assert!(s.contains("op=direct-resize"));
        assert!(s.contains("dims=800x600"));
        assert!(s.contains("reduce the target"));
    }

    #[test]
    fn source_is_chained() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = EngineError::new(ErrorCode::SourceLoadFailed, "read failed").with_source(io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
