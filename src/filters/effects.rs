//! Stochastic and spatial effects: noise, vignette, pixelate.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{check_range, FilterParams, FilterPlugin, ParamValue, Validation};
use crate::error::EngineError;
use crate::raster::Raster;

fn clamp_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// `noise`: add uniform noise in `[-a/2, a/2]`, `a = intensity/100 · 255`.
///
/// One sample per pixel, applied to R, G and B alike. A `seed` parameter
/// makes the output reproducible.
pub struct Noise;

impl FilterPlugin for Noise {
    fn name(&self) -> &str {
        "noise"
    }

    fn default_params(&self) -> FilterParams {
        FilterParams::new().set("intensity", 20.0)
    }

    fn validate(&self, params: &FilterParams) -> Validation {
        let v = check_range(params, "intensity", 0.0, 100.0);
        if !v.valid {
            return v;
        }
        match params.get("seed") {
            None | Some(ParamValue::Number(_)) => v,
            Some(ParamValue::Bool(_)) => Validation::fail("seed must be a number"),
        }
    }

    fn apply(&self, mut raster: Raster, params: &FilterParams) -> Result<Raster, EngineError> {
        let amplitude = params.number_or("intensity", 20.0) / 100.0 * 255.0;
        if amplitude == 0.0 {
            return Ok(raster);
        }
        let half = amplitude / 2.0;
        let mut rng = match params.number("seed") {
            Some(seed) => SmallRng::seed_from_u64(seed as u64),
            None => SmallRng::from_os_rng(),
        };
        for px in raster.as_bytes_mut().chunks_exact_mut(4) {
            let n = rng.random_range(-half..half);
            px[0] = clamp_u8(f64::from(px[0]) + n);
            px[1] = clamp_u8(f64::from(px[1]) + n);
            px[2] = clamp_u8(f64::from(px[2]) + n);
        }
        Ok(raster)
    }
}

/// `vignette`: radial darkening from the image center.
pub struct Vignette;

impl FilterPlugin for Vignette {
    fn name(&self) -> &str {
        "vignette"
    }

    fn default_params(&self) -> FilterParams {
        FilterParams::new()
            .set("intensity", 0.5)
            .set("size", 0.5)
            .set("blur", 0.5)
    }

    fn validate(&self, params: &FilterParams) -> Validation {
        for key in ["intensity", "size", "blur"] {
            let v = check_range(params, key, 0.0, 1.0);
            if !v.valid {
                return v;
            }
        }
        Validation::ok()
    }

    fn apply(&self, mut raster: Raster, params: &FilterParams) -> Result<Raster, EngineError> {
        let intensity = params.number_or("intensity", 0.5);
        let size = params.number_or("size", 0.5);
        let blur = params.number_or("blur", 0.5);
        let (w, h) = raster.dimensions();
        let cx = f64::from(w - 1) / 2.0;
        let cy = f64::from(h - 1) / 2.0;
        let max_d = (cx * cx + cy * cy).sqrt().max(f64::EPSILON);

        let stride = w as usize * 4;
        let bytes = raster.as_bytes_mut();
        for y in 0..h as usize {
            for x in 0..w as usize {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                let d = (dx * dx + dy * dy).sqrt();
                let base = (1.0 - (d / max_d) * size).clamp(0.0, 1.0);
                // blur → 0 degenerates to a hard edge
                let factor = if blur <= f64::EPSILON {
                    if base >= 1.0 {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    base.powf(1.0 / blur).clamp(0.0, 1.0)
                };
                let gain = 1.0 - (1.0 - factor) * intensity;
                let i = y * stride + x * 4;
                bytes[i] = clamp_u8(f64::from(bytes[i]) * gain);
                bytes[i + 1] = clamp_u8(f64::from(bytes[i + 1]) * gain);
                bytes[i + 2] = clamp_u8(f64::from(bytes[i + 2]) * gain);
            }
        }
        Ok(raster)
    }
}

/// `pixelate`: average each block and rewrite every pixel in it.
pub struct Pixelate;

impl FilterPlugin for Pixelate {
    fn name(&self) -> &str {
        "pixelate"
    }

    fn default_params(&self) -> FilterParams {
        FilterParams::new().set("pixelSize", 8.0)
    }

    fn validate(&self, params: &FilterParams) -> Validation {
        check_range(params, "pixelSize", 1.0, 4096.0)
    }

    fn apply(&self, mut raster: Raster, params: &FilterParams) -> Result<Raster, EngineError> {
        let block = params.number_or("pixelSize", 8.0).round().max(1.0) as u32;
        if block <= 1 {
            return Ok(raster);
        }
        let (w, h) = raster.dimensions();
        let stride = w as usize * 4;
        let bytes = raster.as_bytes_mut();

        let mut by = 0u32;
        while by < h {
            let bh = block.min(h - by);
            let mut bx = 0u32;
            while bx < w {
                let bw = block.min(w - bx);
                let mut sums = [0u64; 4];
                for y in by..by + bh {
                    for x in bx..bx + bw {
                        let i = y as usize * stride + x as usize * 4;
                        for c in 0..4 {
                            sums[c] += u64::from(bytes[i + c]);
                        }
                    }
                }
                let count = u64::from(bw) * u64::from(bh);
                let avg: [u8; 4] = std::array::from_fn(|c| {
                    ((sums[c] + count / 2) / count) as u8
                });
                for y in by..by + bh {
                    for x in bx..bx + bw {
                        let i = y as usize * stride + x as usize * 4;
                        bytes[i..i + 4].copy_from_slice(&avg);
                    }
                }
                bx += bw;
            }
            by += bh;
        }
        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    fn solid(v: u8) -> Raster {
        Raster::filled(
            8,
            8,
            RGBA8 {
                r: v,
                g: v,
                b: v,
                a: 255,
            },
        )
        .unwrap()
    }

    #[test]
    fn noise_zero_intensity_is_identity() {
        let out = Noise
            .apply(solid(128), &FilterParams::new().set("intensity", 0.0))
            .unwrap();
        assert!(out.as_bytes().chunks_exact(4).all(|p| p[0] == 128));
    }

    #[test]
    fn noise_is_reproducible_with_seed() {
        let params = FilterParams::new().set("intensity", 60.0).set("seed", 42.0);
        let a = Noise.apply(solid(128), &params).unwrap();
        let b = Noise.apply(solid(128), &params).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        // And it actually perturbs something
        assert!(a.as_bytes().chunks_exact(4).any(|p| p[0] != 128));
    }

    #[test]
    fn noise_keeps_channels_coupled() {
        let params = FilterParams::new().set("intensity", 80.0).set("seed", 7.0);
        let out = Noise.apply(solid(128), &params).unwrap();
        for px in out.as_bytes().chunks_exact(4) {
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn vignette_darkens_corners_not_center() {
        let params = FilterParams::new()
            .set("intensity", 1.0)
            .set("size", 1.0)
            .set("blur", 0.5);
        let out = Vignette.apply(solid(200), &params).unwrap();
        let center = out.pixel(4, 4)[0];
        let corner = out.pixel(0, 0)[0];
        assert!(corner < center, "corner {corner} center {center}");
        assert!(center >= 190);
    }

    #[test]
    fn pixelate_averages_blocks() {
        // 2x2 blocks of alternating black/white columns average to gray
        let mut raster = Raster::new(4, 4).unwrap();
        for y in 0..4u32 {
            for x in 0..4u32 {
                let v = if x % 2 == 0 { 0 } else { 255 };
                let i = ((y * 4 + x) * 4) as usize;
                raster.as_bytes_mut()[i..i + 4].copy_from_slice(&[v, v, v, 255]);
            }
        }
        let out = Pixelate
            .apply(raster, &FilterParams::new().set("pixelSize", 2.0))
            .unwrap();
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(out.pixel(x, y), [128, 128, 128, 255]);
            }
        }
    }

    #[test]
    fn pixelate_size_one_is_identity() {
        let out = Pixelate
            .apply(solid(91), &FilterParams::new().set("pixelSize", 1.0))
            .unwrap();
        assert!(out.as_bytes().chunks_exact(4).all(|p| p[0] == 91));
    }
}
