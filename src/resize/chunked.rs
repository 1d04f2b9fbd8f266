//! Chunked backend: the destination is partitioned into bounded tiles.
//!
//! Every tile is resampled from the exact fractional source region that maps
//! onto it, using the same kernel as a whole-image draw, so seams fall on
//! integer destination pixels and stay invisible.

use super::{run_in_waves, sampler, sampler::CropBox, RenderCtx};
use crate::error::EngineError;
use crate::geometry::GeometryPlan;
use crate::raster::Raster;

/// Destination tile side: sqrt(16 MiB / 4 bytes) = 2048, a power of two.
const TILE_SIZE: u32 = 2048;

struct TileJob {
    // Destination rect, canvas coordinates
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    crop: CropBox,
}

pub(crate) fn render(
    source: &Raster,
    plan: &GeometryPlan,
    canvas: &mut Raster,
    ctx: &RenderCtx<'_>,
) -> Result<(), EngineError> {
    let (scale_x, scale_y) = plan.scale(source.width(), source.height());

    // Visible part of the draw rect
    let x0 = plan.draw.x.max(0) as u32;
    let y0 = plan.draw.y.max(0) as u32;
    let x1 = (i64::from(plan.draw.x) + i64::from(plan.draw.width))
        .min(i64::from(plan.canvas_width)) as u32;
    let y1 = (i64::from(plan.draw.y) + i64::from(plan.draw.height))
        .min(i64::from(plan.canvas_height)) as u32;
    if x0 >= x1 || y0 >= y1 {
        return Ok(());
    }

    let sw = f64::from(source.width());
    let sh = f64::from(source.height());

    let mut jobs = Vec::new();
    let mut ty = y0;
    while ty < y1 {
        let th = TILE_SIZE.min(y1 - ty);
        let mut tx = x0;
        while tx < x1 {
            let tw = TILE_SIZE.min(x1 - tx);
            // Fractional source region for this destination tile
            let left = (f64::from(tx) - f64::from(plan.draw.x)) / scale_x;
            let top = (f64::from(ty) - f64::from(plan.draw.y)) / scale_y;
            let width = f64::from(tw) / scale_x;
            let height = f64::from(th) / scale_y;
            let left = left.clamp(0.0, sw);
            let top = top.clamp(0.0, sh);
            jobs.push(TileJob {
                x: tx,
                y: ty,
                width: tw,
                height: th,
                crop: CropBox {
                    left,
                    top,
                    width: width.min(sw - left),
                    height: height.min(sh - top),
                },
            });
            tx += tw;
        }
        ty += th;
    }

    let total = jobs.len() as u32;
    run_in_waves(
        &jobs,
        ctx.config.tile_parallelism,
        ctx.stop,
        |job| {
            let tile = sampler::scale_region(source, job.crop, job.width, job.height, ctx.quality)?;
            Ok((job.x, job.y, tile))
        },
        |index, (x, y, tile)| {
            canvas.blit_over(&tile, i64::from(x), i64::from(y));
            if let Some(progress) = ctx.progress {
                progress(index as u32 + 1, total);
            }
            Ok(())
        },
    )
}
