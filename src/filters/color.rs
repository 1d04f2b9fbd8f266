//! Per-pixel color filters.

use super::{check_range, FilterParams, FilterPlugin, Validation};
use crate::error::EngineError;
use crate::raster::Raster;

fn clamp_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Apply `f` to the RGB channels of every pixel; alpha passes through.
fn map_rgb(raster: &mut Raster, mut f: impl FnMut(u8, u8, u8) -> (f64, f64, f64)) {
    for px in raster.as_bytes_mut().chunks_exact_mut(4) {
        let (r, g, b) = f(px[0], px[1], px[2]);
        px[0] = clamp_u8(r);
        px[1] = clamp_u8(g);
        px[2] = clamp_u8(b);
    }
}

/// `brightness`: add `value/100 · 255` to each channel.
pub struct Brightness;

impl FilterPlugin for Brightness {
    fn name(&self) -> &str {
        "brightness"
    }

    fn default_params(&self) -> FilterParams {
        FilterParams::new().set("value", 0.0)
    }

    fn validate(&self, params: &FilterParams) -> Validation {
        check_range(params, "value", -100.0, 100.0)
    }

    fn apply(&self, mut raster: Raster, params: &FilterParams) -> Result<Raster, EngineError> {
        let delta = params.number_or("value", 0.0) / 100.0 * 255.0;
        map_rgb(&mut raster, |r, g, b| {
            (
                f64::from(r) + delta,
                f64::from(g) + delta,
                f64::from(b) + delta,
            )
        });
        Ok(raster)
    }
}

/// `contrast`: standard 259-factor curve around mid-gray.
pub struct Contrast;

impl FilterPlugin for Contrast {
    fn name(&self) -> &str {
        "contrast"
    }

    fn default_params(&self) -> FilterParams {
        FilterParams::new().set("value", 0.0)
    }

    fn validate(&self, params: &FilterParams) -> Validation {
        check_range(params, "value", -100.0, 100.0)
    }

    fn apply(&self, mut raster: Raster, params: &FilterParams) -> Result<Raster, EngineError> {
        let v = params.number_or("value", 0.0);
        let factor = (259.0 * (v + 255.0)) / (255.0 * (259.0 - v));
        let adjust = |c: u8| factor * (f64::from(c) - 128.0) + 128.0;
        map_rgb(&mut raster, |r, g, b| (adjust(r), adjust(g), adjust(b)));
        Ok(raster)
    }
}

/// `saturation`: scale chroma around per-pixel luminance.
pub struct Saturation;

impl FilterPlugin for Saturation {
    fn name(&self) -> &str {
        "saturation"
    }

    fn default_params(&self) -> FilterParams {
        FilterParams::new().set("value", 0.0)
    }

    fn validate(&self, params: &FilterParams) -> Validation {
        check_range(params, "value", -100.0, 100.0)
    }

    fn apply(&self, mut raster: Raster, params: &FilterParams) -> Result<Raster, EngineError> {
        let gain = 1.0 + params.number_or("value", 0.0) / 100.0;
        map_rgb(&mut raster, |r, g, b| {
            let y = luminance(r, g, b);
            (
                y + gain * (f64::from(r) - y),
                y + gain * (f64::from(g) - y),
                y + gain * (f64::from(b) - y),
            )
        });
        Ok(raster)
    }
}

/// `grayscale`: replace RGB with luminance.
pub struct Grayscale;

impl FilterPlugin for Grayscale {
    fn name(&self) -> &str {
        "grayscale"
    }

    fn validate(&self, _params: &FilterParams) -> Validation {
        Validation::ok()
    }

    fn apply(&self, mut raster: Raster, _params: &FilterParams) -> Result<Raster, EngineError> {
        map_rgb(&mut raster, |r, g, b| {
            let y = luminance(r, g, b);
            (y, y, y)
        });
        Ok(raster)
    }
}

/// `sepia`: blend toward the sepia tone matrix by `intensity/100`.
pub struct Sepia;

impl FilterPlugin for Sepia {
    fn name(&self) -> &str {
        "sepia"
    }

    fn default_params(&self) -> FilterParams {
        FilterParams::new().set("intensity", 100.0)
    }

    fn validate(&self, params: &FilterParams) -> Validation {
        check_range(params, "intensity", 0.0, 100.0)
    }

    fn apply(&self, mut raster: Raster, params: &FilterParams) -> Result<Raster, EngineError> {
        let t = params.number_or("intensity", 100.0) / 100.0;
        map_rgb(&mut raster, |r, g, b| {
            let (rf, gf, bf) = (f64::from(r), f64::from(g), f64::from(b));
            let sr = 0.393 * rf + 0.769 * gf + 0.189 * bf;
            let sg = 0.349 * rf + 0.686 * gf + 0.168 * bf;
            let sb = 0.272 * rf + 0.534 * gf + 0.131 * bf;
            (
                rf + t * (sr - rf),
                gf + t * (sg - gf),
                bf + t * (sb - bf),
            )
        });
        Ok(raster)
    }
}

/// `invert`: 255 − c on RGB.
pub struct Invert;

impl FilterPlugin for Invert {
    fn name(&self) -> &str {
        "invert"
    }

    fn validate(&self, _params: &FilterParams) -> Validation {
        Validation::ok()
    }

    fn apply(&self, mut raster: Raster, _params: &FilterParams) -> Result<Raster, EngineError> {
        for px in raster.as_bytes_mut().chunks_exact_mut(4) {
            px[0] = 255 - px[0];
            px[1] = 255 - px[1];
            px[2] = 255 - px[2];
        }
        Ok(raster)
    }
}

/// `posterize`: quantize each channel to `levels` evenly spaced values.
pub struct Posterize;

impl FilterPlugin for Posterize {
    fn name(&self) -> &str {
        "posterize"
    }

    fn default_params(&self) -> FilterParams {
        FilterParams::new().set("levels", 8.0)
    }

    fn validate(&self, params: &FilterParams) -> Validation {
        check_range(params, "levels", 2.0, 256.0)
    }

    fn apply(&self, mut raster: Raster, params: &FilterParams) -> Result<Raster, EngineError> {
        let levels = params.number_or("levels", 8.0).round();
        let steps = levels - 1.0;
        map_rgb(&mut raster, |r, g, b| {
            let q = |c: u8| (f64::from(c) / 255.0 * steps).round() / steps * 255.0;
            (q(r), q(g), q(b))
        });
        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    fn solid(r: u8, g: u8, b: u8, a: u8) -> Raster {
        Raster::filled(2, 2, RGBA8 { r, g, b, a }).unwrap()
    }

    #[test]
    fn brightness_shifts_and_clamps() {
        let out = Brightness
            .apply(
                solid(100, 100, 250, 200),
                &FilterParams::new().set("value", 20.0),
            )
            .unwrap();
        // +51 per channel, clamped at 255, alpha untouched
        assert_eq!(out.pixel(0, 0), [151, 151, 255, 200]);

        let out = Brightness
            .apply(solid(30, 30, 30, 255), &FilterParams::new().set("value", -50.0))
            .unwrap();
        assert_eq!(out.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn contrast_zero_is_identity() {
        let out = Contrast
            .apply(solid(37, 120, 200, 255), &FilterParams::new().set("value", 0.0))
            .unwrap();
        assert_eq!(out.pixel(0, 0), [37, 120, 200, 255]);
    }

    #[test]
    fn contrast_pushes_away_from_midgray() {
        let out = Contrast
            .apply(solid(100, 150, 128, 255), &FilterParams::new().set("value", 50.0))
            .unwrap();
        let [r, g, b, _] = out.pixel(0, 0);
        assert!(r < 100);
        assert!(g > 150);
        assert_eq!(b, 128);
    }

    #[test]
    fn saturation_negative_hundred_is_grayscale() {
        let desat = Saturation
            .apply(solid(200, 50, 100, 255), &FilterParams::new().set("value", -100.0))
            .unwrap();
        let gray = Grayscale
            .apply(solid(200, 50, 100, 255), &FilterParams::new())
            .unwrap();
        assert_eq!(desat.pixel(0, 0), gray.pixel(0, 0));
    }

    #[test]
    fn grayscale_luminance_weights() {
        let out = Grayscale
            .apply(solid(255, 0, 0, 255), &FilterParams::new())
            .unwrap();
        // 0.299 * 255 ≈ 76
        assert_eq!(out.pixel(0, 0), [76, 76, 76, 255]);
    }

    #[test]
    fn sepia_zero_intensity_is_identity() {
        let out = Sepia
            .apply(
                solid(12, 200, 99, 255),
                &FilterParams::new().set("intensity", 0.0),
            )
            .unwrap();
        assert_eq!(out.pixel(0, 0), [12, 200, 99, 255]);
    }

    #[test]
    fn sepia_full_intensity_tints() {
        let out = Sepia
            .apply(solid(100, 100, 100, 255), &FilterParams::new())
            .unwrap();
        let [r, g, b, _] = out.pixel(0, 0);
        // Warm tone: r > g > b
        assert!(r > g && g > b);
    }

    #[test]
    fn invert_round_trips() {
        let once = Invert
            .apply(solid(10, 200, 77, 13), &FilterParams::new())
            .unwrap();
        assert_eq!(once.pixel(0, 0), [245, 55, 178, 13]);
        let twice = Invert.apply(once, &FilterParams::new()).unwrap();
        assert_eq!(twice.pixel(0, 0), [10, 200, 77, 13]);
    }

    #[test]
    fn posterize_two_levels_is_threshold() {
        let out = Posterize
            .apply(
                solid(100, 200, 0, 255),
                &FilterParams::new().set("levels", 2.0),
            )
            .unwrap();
        assert_eq!(out.pixel(0, 0), [0, 255, 0, 255]);
    }

    #[test]
    fn posterize_max_levels_is_identity() {
        let out = Posterize
            .apply(
                solid(101, 33, 217, 255),
                &FilterParams::new().set("levels", 256.0),
            )
            .unwrap();
        assert_eq!(out.pixel(0, 0), [101, 33, 217, 255]);
    }
}
