//! Stepped backend: pyramid downscale for deep reductions.
//!
//! Halving in stages keeps the convolution window meaningful at every stage,
//! which preserves detail a single deep downscale would alias away.

use super::{sampler, RenderCtx};
use crate::error::{EngineError, ErrorCode};
use crate::geometry::GeometryPlan;
use crate::limits::check_stop;
use crate::raster::{pool_recycle, Raster};
use crate::strategy::Quality;

pub(crate) fn render(
    source: &Raster,
    plan: &GeometryPlan,
    canvas: &mut Raster,
    ctx: &RenderCtx<'_>,
) -> Result<(), EngineError> {
    let scaled = downscale(source, plan.draw.width, plan.draw.height, ctx)
        .map_err(|e| {
            if e.code() == ErrorCode::TimeoutError {
                return e;
            }
            EngineError::new(ErrorCode::SmartResizeFailed, "stepped downscale failed")
                .with_operation("stepped-resize")
                .with_source(e)
        })?;
    canvas.blit_over(&scaled, i64::from(plan.draw.x), i64::from(plan.draw.y));
    Ok(())
}

/// Reduce `source` to exactly (target_width, target_height) through halving
/// steps. Intermediates go back to the raster pool as soon as the next step
/// has consumed them.
fn downscale(
    source: &Raster,
    target_width: u32,
    target_height: u32,
    ctx: &RenderCtx<'_>,
) -> Result<Raster, EngineError> {
    let (sw, sh) = source.dimensions();
    let fx = f64::from(target_width) / f64::from(sw);
    let fy = f64::from(target_height) / f64::from(sh);
    let s = fx.min(fy);

    // Pyramids only pay off below half scale
    if s >= 0.5 {
        return sampler::scale_full(source, target_width, target_height, Quality::High);
    }

    let steps = ((1.0 / s).log2().ceil() as u32).clamp(1, ctx.config.max_steps);

    let mut current: Option<Raster> = None;
    for step in 1..=steps {
        check_stop(ctx.stop, "stepped-resize")?;

        let (cur_w, cur_h) = current.as_ref().map_or((sw, sh), Raster::dimensions);
        let (next_w, next_h) = if step == steps {
            (target_width, target_height)
        } else {
            let t = f64::from(step) / f64::from(steps);
            let w = (f64::from(sw) * fx.powf(t)).round_ties_even() as u32;
            let h = (f64::from(sh) * fy.powf(t)).round_ties_even() as u32;
            // Never drop below half of the prior step, never below the target
            (
                w.max(cur_w.div_ceil(2)).max(target_width).min(cur_w),
                h.max(cur_h.div_ceil(2)).max(target_height).min(cur_h),
            )
        };

        let input = current.as_ref().unwrap_or(source);
        let next = sampler::scale_full(input, next_w, next_h, Quality::High)?;
        if let Some(intermediate) = current.take() {
            pool_recycle(intermediate, ctx.config.pool_slots);
        }
        current = Some(next);
    }

    Ok(current.expect("at least one step"))
}
