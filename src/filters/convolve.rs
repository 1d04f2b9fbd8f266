//! Convolution-based filters: blur, sharpen, emboss, edge detection.
//!
//! 3×3 kernels operate on RGB with clamp-to-edge addressing and pass alpha
//! through. Gaussian blur is separable and blurs alpha as well, so edges of
//! transparent regions don't halo.

use super::{check_range, FilterParams, FilterPlugin, Validation};
use crate::error::{EngineError, ErrorCode};
use crate::raster::Raster;

fn clamp_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// One-dimensional Gaussian kernel for `sigma = radius / 3`, normalized.
fn gaussian_kernel(radius: f64) -> Vec<f64> {
    let half = radius.ceil() as i64;
    let sigma = (radius / 3.0).max(1e-6);
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f64> = (-half..=half)
        .map(|i| (-((i * i) as f64) / denom).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Separable Gaussian blur over all four channels.
pub(crate) fn gaussian_blur(src: &Raster, radius: f64) -> Result<Raster, EngineError> {
    if radius <= 0.0 {
        return Ok(src.clone());
    }
    let weights = gaussian_kernel(radius);
    let half = (weights.len() / 2) as i64;
    let (w, h) = src.dimensions();
    let stride = w as usize * 4;

    let wrap = |e: EngineError| {
        EngineError::new(ErrorCode::BlurFailed, "blur buffer allocation failed").with_source(e)
    };
    let mut horizontal = Raster::new(w, h).map_err(wrap)?;
    {
        let input = src.as_bytes();
        let out = horizontal.as_bytes_mut();
        for y in 0..h as i64 {
            for x in 0..w as i64 {
                let mut acc = [0.0f64; 4];
                for (k, weight) in weights.iter().enumerate() {
                    let sx = (x + k as i64 - half).clamp(0, i64::from(w) - 1);
                    let i = y as usize * stride + sx as usize * 4;
                    for c in 0..4 {
                        acc[c] += weight * f64::from(input[i + c]);
                    }
                }
                let o = y as usize * stride + x as usize * 4;
                for c in 0..4 {
                    out[o + c] = clamp_u8(acc[c]);
                }
            }
        }
    }

    let mut vertical = Raster::new(w, h).map_err(wrap)?;
    {
        let input = horizontal.as_bytes();
        let out = vertical.as_bytes_mut();
        for y in 0..h as i64 {
            for x in 0..w as i64 {
                let mut acc = [0.0f64; 4];
                for (k, weight) in weights.iter().enumerate() {
                    let sy = (y + k as i64 - half).clamp(0, i64::from(h) - 1);
                    let i = sy as usize * stride + x as usize * 4;
                    for c in 0..4 {
                        acc[c] += weight * f64::from(input[i + c]);
                    }
                }
                let o = y as usize * stride + x as usize * 4;
                for c in 0..4 {
                    out[o + c] = clamp_u8(acc[c]);
                }
            }
        }
    }

    Ok(vertical)
}

/// 3×3 RGB convolution with clamp-to-edge addressing; alpha passes through.
fn convolve3x3(src: &Raster, kernel: &[f64; 9]) -> Result<Raster, EngineError> {
    let (w, h) = src.dimensions();
    let stride = w as usize * 4;
    let mut out = Raster::new(w, h)?;
    let input = src.as_bytes();
    let output = out.as_bytes_mut();

    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let mut acc = [0.0f64; 3];
            for ky in -1i64..=1 {
                for kx in -1i64..=1 {
                    let weight = kernel[((ky + 1) * 3 + (kx + 1)) as usize];
                    let sx = (x + kx).clamp(0, i64::from(w) - 1);
                    let sy = (y + ky).clamp(0, i64::from(h) - 1);
                    let i = sy as usize * stride + sx as usize * 4;
                    for c in 0..3 {
                        acc[c] += weight * f64::from(input[i + c]);
                    }
                }
            }
            let i = y as usize * stride + x as usize * 4;
            for c in 0..3 {
                output[i + c] = clamp_u8(acc[c]);
            }
            output[i + 3] = input[i + 3];
        }
    }
    Ok(out)
}

/// `blur`: separable Gaussian, `radius ∈ [0, 20]`.
pub struct Blur;

impl FilterPlugin for Blur {
    fn name(&self) -> &str {
        "blur"
    }

    fn default_params(&self) -> FilterParams {
        FilterParams::new().set("radius", 2.0)
    }

    fn validate(&self, params: &FilterParams) -> Validation {
        check_range(params, "radius", 0.0, 20.0)
    }

    fn apply(&self, raster: Raster, params: &FilterParams) -> Result<Raster, EngineError> {
        let radius = params.number_or("radius", 2.0);
        if radius <= 0.0 {
            return Ok(raster);
        }
        gaussian_blur(&raster, radius)
    }
}

/// `sharpen`: unsharp mask against a radius-1 blur.
pub struct Sharpen;

impl FilterPlugin for Sharpen {
    fn name(&self) -> &str {
        "sharpen"
    }

    fn default_params(&self) -> FilterParams {
        FilterParams::new().set("amount", 50.0)
    }

    fn validate(&self, params: &FilterParams) -> Validation {
        check_range(params, "amount", 0.0, 100.0)
    }

    fn apply(&self, mut raster: Raster, params: &FilterParams) -> Result<Raster, EngineError> {
        let amount = params.number_or("amount", 50.0) / 100.0;
        if amount == 0.0 {
            return Ok(raster);
        }
        let blurred = gaussian_blur(&raster, 1.0)?;
        let blur_bytes = blurred.as_bytes();
        for (i, px) in raster.as_bytes_mut().iter_mut().enumerate() {
            if i % 4 == 3 {
                continue;
            }
            let orig = f64::from(*px);
            *px = clamp_u8(orig + amount * (orig - f64::from(blur_bytes[i])));
        }
        Ok(raster)
    }
}

/// `emboss`: directional relief kernel scaled by `strength`.
pub struct Emboss;

const EMBOSS_KERNEL: [f64; 9] = [-2.0, -1.0, 0.0, -1.0, 1.0, 1.0, 0.0, 1.0, 2.0];

impl FilterPlugin for Emboss {
    fn name(&self) -> &str {
        "emboss"
    }

    fn default_params(&self) -> FilterParams {
        FilterParams::new().set("strength", 1.0)
    }

    fn validate(&self, params: &FilterParams) -> Validation {
        check_range(params, "strength", 0.0, 3.0)
    }

    fn apply(&self, raster: Raster, params: &FilterParams) -> Result<Raster, EngineError> {
        let strength = params.number_or("strength", 1.0);
        let kernel: [f64; 9] = std::array::from_fn(|i| EMBOSS_KERNEL[i] * strength);
        convolve3x3(&raster, &kernel)
    }
}

/// `edgeDetection`: Laplacian kernel scaled by `sensitivity`.
pub struct EdgeDetection;

const LAPLACIAN_KERNEL: [f64; 9] = [-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0];

impl FilterPlugin for EdgeDetection {
    fn name(&self) -> &str {
        "edgeDetection"
    }

    fn default_params(&self) -> FilterParams {
        FilterParams::new().set("sensitivity", 1.0)
    }

    fn validate(&self, params: &FilterParams) -> Validation {
        check_range(params, "sensitivity", 0.0, 2.0)
    }

    fn apply(&self, raster: Raster, params: &FilterParams) -> Result<Raster, EngineError> {
        let sensitivity = params.number_or("sensitivity", 1.0);
        let kernel: [f64; 9] = std::array::from_fn(|i| LAPLACIAN_KERNEL[i] * sensitivity);
        convolve3x3(&raster, &kernel)
    }
}
