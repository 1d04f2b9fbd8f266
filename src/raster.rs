//! RGBA8 raster buffer, compositing helpers, and the recycle pool.
//!
//! Pixels are sRGB, unpremultiplied alpha, row stride = width · 4. A raster
//! is exclusively owned by its pipeline; filters mutate it in place or
//! replace it, and callers never observe intermediates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use imgref::{ImgRef, ImgVec};
use rgb::{ComponentBytes, FromSlice, RGBA8};

use crate::error::{EngineError, ErrorCode};

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

// Live raster bytes, for the memory-pressure heuristic.
static LIVE_BYTES: AtomicU64 = AtomicU64::new(0);

fn gauge_add(bytes: usize) {
    LIVE_BYTES.fetch_add(bytes as u64, Ordering::Relaxed);
}

fn gauge_sub(bytes: usize) {
    LIVE_BYTES.fetch_sub(bytes as u64, Ordering::Relaxed);
}

/// Bytes currently held by live rasters plus pooled buffers.
pub(crate) fn tracked_bytes() -> u64 {
    LIVE_BYTES.load(Ordering::Relaxed) + POOLED_BYTES.load(Ordering::Relaxed)
}

/// An owned RGBA8 image buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Clone for Raster {
    fn clone(&self) -> Self {
        let pixels = self.pixels.clone();
        gauge_add(pixels.capacity());
        Self {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

impl Raster {
    /// Allocate a transparent raster, reusing a pooled buffer when one fits.
    pub fn new(width: u32, height: u32) -> Result<Self, EngineError> {
        let len = checked_len(width, height)?;
        let pixels = pool_acquire(len);
        gauge_add(pixels.capacity());
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Allocate a raster pre-filled with one color.
    pub fn filled(width: u32, height: u32, color: RGBA8) -> Result<Self, EngineError> {
        let mut raster = Self::new(width, height)?;
        raster.fill(color);
        Ok(raster)
    }

    /// Wrap an existing RGBA byte buffer. Fails when the length does not
    /// match `width · height · 4`.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, EngineError> {
        let len = checked_len(width, height)?;
        if pixels.len() != len {
            return Err(EngineError::new(
                ErrorCode::ConversionFailed,
                format!(
                    "buffer length {} does not match {width}x{height} rgba",
                    pixels.len()
                ),
            )
            .with_dimensions(width, height));
        }
        gauge_add(pixels.capacity());
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Wrap a typed pixel image.
    pub fn from_imgvec(img: ImgVec<RGBA8>) -> Result<Self, EngineError> {
        let width = img.width() as u32;
        let height = img.height() as u32;
        let (buf, _, _) = img.into_contiguous_buf();
        Self::from_rgba8(width, height, buf.as_bytes().to_vec())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Typed view over the pixels.
    pub fn as_imgref(&self) -> ImgRef<'_, RGBA8> {
        ImgRef::new(
            self.pixels.as_rgba(),
            self.width as usize,
            self.height as usize,
        )
    }

    /// Consume the raster, returning the raw RGBA bytes.
    pub fn into_vec(mut self) -> Vec<u8> {
        let pixels = std::mem::take(&mut self.pixels);
        gauge_sub(pixels.capacity());
        pixels
    }

    /// Pixel at (x, y) as `[r, g, b, a]`. Panics out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(x < self.width && y < self.height);
        let i = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Fill the whole raster with one color.
    pub fn fill(&mut self, color: RGBA8) {
        for px in self.pixels.as_rgba_mut() {
            *px = color;
        }
    }

    /// Whether any pixel has alpha below 255.
    pub fn has_transparency(&self) -> bool {
        self.pixels.as_rgba().iter().any(|px| px.a < 255)
    }

    /// Copy out a sub-rectangle. The rectangle must lie inside the raster.
    pub fn crop_copy(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Raster, EngineError> {
        if x.checked_add(width).map_or(true, |r| r > self.width)
            || y.checked_add(height).map_or(true, |b| b > self.height)
        {
            return Err(EngineError::new(
                ErrorCode::InvalidDimensions,
                format!(
                    "crop {width}x{height}+{x}+{y} outside {}x{}",
                    self.width, self.height
                ),
            ));
        }
        let mut out = Raster::new(width, height)?;
        let src_stride = self.width as usize * BYTES_PER_PIXEL;
        let dst_stride = width as usize * BYTES_PER_PIXEL;
        for row in 0..height as usize {
            let src_off = (y as usize + row) * src_stride + x as usize * BYTES_PER_PIXEL;
            let dst_off = row * dst_stride;
            out.pixels[dst_off..dst_off + dst_stride]
                .copy_from_slice(&self.pixels[src_off..src_off + dst_stride]);
        }
        Ok(out)
    }

    /// Source-over composite `src` onto `self` at (dx, dy).
    ///
    /// Offsets may be negative and the source may overhang any edge; the
    /// overlap is clipped to this raster's bounds.
    pub fn blit_over(&mut self, src: &Raster, dx: i64, dy: i64) {
        let x0 = dx.max(0);
        let y0 = dy.max(0);
        let x1 = (dx + i64::from(src.width)).min(i64::from(self.width));
        let y1 = (dy + i64::from(src.height)).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let dst_stride = self.width as usize * BYTES_PER_PIXEL;
        let src_stride = src.width as usize * BYTES_PER_PIXEL;
        for y in y0..y1 {
            let sy = (y - dy) as usize;
            let dst_row = y as usize * dst_stride;
            let src_row = sy * src_stride;
            for x in x0..x1 {
                let sx = (x - dx) as usize;
                let di = dst_row + x as usize * BYTES_PER_PIXEL;
                let si = src_row + sx * BYTES_PER_PIXEL;
                let sa = src.pixels[si + 3];
                if sa == 0 {
                    continue;
                }
                if sa == 255 {
                    self.pixels[di..di + 4].copy_from_slice(&src.pixels[si..si + 4]);
                    continue;
                }
                let da = self.pixels[di + 3];
                let sa32 = u32::from(sa);
                let da_part = u32::from(da) * (255 - sa32);
                // out_a on a 0..255·255 scale to keep the division exact-ish
                let out_a255 = sa32 * 255 + da_part;
                let out_a = div_round(out_a255, 255) as u8;
                for c in 0..3 {
                    let sc = u32::from(src.pixels[si + c]);
                    let dc = u32::from(self.pixels[di + c]);
                    let num = sc * sa32 * 255 + dc * da_part;
                    self.pixels[di + c] = div_round(num, out_a255.max(1)) as u8;
                }
                self.pixels[di + 3] = out_a;
            }
        }
    }
}

impl Drop for Raster {
    fn drop(&mut self) {
        gauge_sub(self.pixels.capacity());
    }
}

fn div_round(num: u32, den: u32) -> u32 {
    (num + den / 2) / den
}

fn checked_len(width: u32, height: u32) -> Result<usize, EngineError> {
    if width == 0 || height == 0 {
        return Err(EngineError::new(
            ErrorCode::InvalidDimensions,
            format!("raster dimensions must be positive, got {width}x{height}"),
        ));
    }
    let bytes = u64::from(width) * u64::from(height) * BYTES_PER_PIXEL as u64;
    if bytes > isize::MAX as u64 / 2 {
        return Err(EngineError::new(
            ErrorCode::MemoryError,
            format!("raster {width}x{height} does not fit in memory"),
        )
        .with_dimensions(width, height));
    }
    Ok(bytes as usize)
}

// --- Recycle pool ---
//
// A small freelist of returned pixel buffers. Private to the process,
// bounded, and cleared on critical errors and under memory pressure.

const POOL_MAX_BUFFER_BYTES: usize = 64 << 20;

static POOL: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());
static POOLED_BYTES: AtomicU64 = AtomicU64::new(0);

fn pool_acquire(len: usize) -> Vec<u8> {
    if let Ok(mut pool) = POOL.lock() {
        if let Some(i) = pool.iter().position(|buf| buf.capacity() >= len) {
            let mut buf = pool.swap_remove(i);
            POOLED_BYTES.fetch_sub(buf.capacity() as u64, Ordering::Relaxed);
            buf.clear();
            buf.resize(len, 0);
            return buf;
        }
    }
    vec![0u8; len]
}

/// Return a no-longer-needed raster's buffer to the pool.
pub(crate) fn pool_recycle(raster: Raster, slots: usize) {
    let buf = raster.into_vec();
    if buf.capacity() == 0 || buf.capacity() > POOL_MAX_BUFFER_BYTES {
        return;
    }
    if let Ok(mut pool) = POOL.lock() {
        if pool.len() < slots {
            POOLED_BYTES.fetch_add(buf.capacity() as u64, Ordering::Relaxed);
            pool.push(buf);
        }
    }
}

/// Drop every pooled buffer.
pub(crate) fn pool_clear() {
    if let Ok(mut pool) = POOL.lock() {
        pool.clear();
        POOLED_BYTES.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(r: u8, g: u8, b: u8, a: u8) -> RGBA8 {
        RGBA8 { r, g, b, a }
    }

    #[test]
    fn new_is_transparent() {
        let raster = Raster::new(4, 3).unwrap();
        assert_eq!(raster.dimensions(), (4, 3));
        assert_eq!(raster.as_bytes().len(), 4 * 3 * 4);
        assert!(raster.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_dimensions_rejected() {
        assert_eq!(
            Raster::new(0, 10).unwrap_err().code(),
            ErrorCode::InvalidDimensions
        );
        assert_eq!(
            Raster::new(10, 0).unwrap_err().code(),
            ErrorCode::InvalidDimensions
        );
    }

    #[test]
    fn from_rgba8_length_check() {
        let err = Raster::from_rgba8(2, 2, vec![0u8; 15]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConversionFailed);
        assert!(Raster::from_rgba8(2, 2, vec![0u8; 16]).is_ok());
    }

    #[test]
    fn fill_and_pixel() {
        let mut raster = Raster::new(2, 2).unwrap();
        raster.fill(rgba(1, 2, 3, 255));
        assert_eq!(raster.pixel(1, 1), [1, 2, 3, 255]);
        assert!(!raster.has_transparency());
    }

    #[test]
    fn blit_opaque_clips_negative_offset() {
        let mut dst = Raster::filled(4, 4, rgba(0, 0, 0, 255)).unwrap();
        let src = Raster::filled(4, 4, rgba(255, 0, 0, 255)).unwrap();
        dst.blit_over(&src, -2, -2);
        // Top-left 2x2 covered, rest untouched
        assert_eq!(dst.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(dst.pixel(1, 1), [255, 0, 0, 255]);
        assert_eq!(dst.pixel(2, 2), [0, 0, 0, 255]);
    }

    #[test]
    fn blit_blends_alpha() {
        let mut dst = Raster::filled(1, 1, rgba(0, 0, 0, 255)).unwrap();
        let src = Raster::filled(1, 1, rgba(255, 255, 255, 128)).unwrap();
        dst.blit_over(&src, 0, 0);
        let [r, g, b, a] = dst.pixel(0, 0);
        assert_eq!(a, 255);
        // ~50% gray
        assert!((r as i32 - 128).abs() <= 1, "r = {r}");
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn blit_onto_transparent_copies() {
        let mut dst = Raster::new(2, 2).unwrap();
        let src = Raster::filled(1, 1, rgba(10, 20, 30, 200)).unwrap();
        dst.blit_over(&src, 1, 0);
        assert_eq!(dst.pixel(1, 0), [10, 20, 30, 200]);
        assert_eq!(dst.pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn crop_copy_bounds() {
        let mut raster = Raster::new(4, 4).unwrap();
        raster.fill(rgba(9, 9, 9, 255));
        let cropped = raster.crop_copy(1, 1, 2, 2).unwrap();
        assert_eq!(cropped.dimensions(), (2, 2));
        assert_eq!(cropped.pixel(0, 0), [9, 9, 9, 255]);
        assert!(raster.crop_copy(3, 3, 2, 2).is_err());
    }

    #[test]
    fn imgref_view() {
        let raster = Raster::filled(3, 2, rgba(5, 6, 7, 8)).unwrap();
        let img = raster.as_imgref();
        assert_eq!(img.width(), 3);
        assert_eq!(img.height(), 2);
        assert_eq!(img.buf()[0], rgba(5, 6, 7, 8));
    }

    #[test]
    fn pool_round_trip() {
        pool_clear();
        let raster = Raster::new(8, 8).unwrap();
        pool_recycle(raster, 4);
        // Reuses the pooled buffer and zeroes it
        let again = Raster::new(8, 8).unwrap();
        assert!(again.as_bytes().iter().all(|&b| b == 0));
        pool_clear();
    }
}
