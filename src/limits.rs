//! Resource limits and cancellation.

use crate::error::{EngineError, ErrorCode};

/// Resource limits for decode/resize/encode operations.
///
/// Used to keep a hostile or oversized source from exhausting memory.
/// All limits are optional.
#[derive(Clone, Debug, Default)]
pub struct Limits {
    /// Maximum image width in pixels.
    pub max_width: Option<u32>,
    /// Maximum image height in pixels.
    pub max_height: Option<u32>,
    /// Maximum total pixels (width × height).
    pub max_pixels: Option<u64>,
    /// Maximum single raster allocation in bytes.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// No restrictions.
    pub fn none() -> Self {
        Self::default()
    }

    /// Check that dimensions are within limits.
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<(), EngineError> {
        if let Some(max_width) = self.max_width {
            if width > max_width {
                return Err(EngineError::new(
                    ErrorCode::DimensionTooLarge,
                    format!("width {width} exceeds limit {max_width}"),
                )
                .with_dimensions(width, height));
            }
        }

        if let Some(max_height) = self.max_height {
            if height > max_height {
                return Err(EngineError::new(
                    ErrorCode::DimensionTooLarge,
                    format!("height {height} exceeds limit {max_height}"),
                )
                .with_dimensions(width, height));
            }
        }

        if let Some(max_pixels) = self.max_pixels {
            let pixels = u64::from(width).saturating_mul(u64::from(height));
            if pixels > max_pixels {
                return Err(EngineError::new(
                    ErrorCode::FileTooLarge,
                    format!("pixel count {pixels} exceeds limit {max_pixels}"),
                )
                .with_dimensions(width, height));
            }
        }

        Ok(())
    }

    /// Check that one raster allocation is within limits.
    pub fn check_memory(&self, bytes: u64) -> Result<(), EngineError> {
        if let Some(max_memory) = self.max_memory_bytes {
            if bytes > max_memory {
                return Err(EngineError::new(
                    ErrorCode::MemoryError,
                    format!("allocation of {bytes} bytes exceeds limit {max_memory}"),
                ));
            }
        }
        Ok(())
    }
}

/// Cancellation token for long-running operations.
///
/// Backends check `should_stop()` between tiles and pyramid steps and bail
/// out with `TIMEOUT_ERROR`; partial outputs are never delivered.
pub trait Stop: Send + Sync {
    /// Whether the operation should be cancelled.
    fn should_stop(&self) -> bool;
}

impl Stop for std::sync::atomic::AtomicBool {
    fn should_stop(&self) -> bool {
        self.load(std::sync::atomic::Ordering::Relaxed)
    }
}

pub(crate) fn check_stop(stop: Option<&dyn Stop>, operation: &'static str) -> Result<(), EngineError> {
    if stop.is_some_and(|s| s.should_stop()) {
        return Err(
            EngineError::new(ErrorCode::TimeoutError, "operation cancelled")
                .with_operation(operation),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn limits_none() {
        let limits = Limits::none();
        assert!(limits.check_dimensions(u32::MAX, u32::MAX).is_ok());
        assert!(limits.check_memory(u64::MAX).is_ok());
    }

    #[test]
    fn limits_dimensions() {
        let limits = Limits {
            max_width: Some(1000),
            max_height: Some(1000),
            max_pixels: Some(500_000),
            ..Default::default()
        };

        // 1M pixels > 500k
        assert!(limits.check_dimensions(1000, 1000).is_err());
        assert!(limits.check_dimensions(500, 500).is_ok());
        let err = limits.check_dimensions(2000, 500).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DimensionTooLarge);
    }

    #[test]
    fn limits_memory() {
        let limits = Limits {
            max_memory_bytes: Some(1_000_000),
            ..Default::default()
        };

        assert!(limits.check_memory(500_000).is_ok());
        assert_eq!(
            limits.check_memory(2_000_000).unwrap_err().code(),
            ErrorCode::MemoryError
        );
    }

    #[test]
    fn atomic_bool_stop() {
        let flag = AtomicBool::new(false);
        assert!(check_stop(Some(&flag), "test").is_ok());
        flag.store(true, Ordering::Relaxed);
        let err = check_stop(Some(&flag), "test").unwrap_err();
        assert_eq!(err.code(), ErrorCode::TimeoutError);
    }
}
