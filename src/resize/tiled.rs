//! Tiled backend: the source is processed in overlapping tiles.
//!
//! The only backend allowed past the safe per-axis dimension. Each source
//! tile is resampled with an overlap margin so the convolution window near
//! tile borders sees the same neighbors it would in a whole-image draw, then
//! the core region is composited at its exact destination rect.

use super::{run_in_waves, sampler, sampler::CropBox, RenderCtx};
use crate::error::{EngineError, ErrorCode};
use crate::geometry::GeometryPlan;
use crate::raster::Raster;

struct TileJob {
    // Core destination rect, draw-rect coordinates
    dst_x: u32,
    dst_y: u32,
    dst_width: u32,
    dst_height: u32,
    // Expanded render target and the core's offset inside it
    render_width: u32,
    render_height: u32,
    core_x: u32,
    core_y: u32,
    crop: CropBox,
}

pub(crate) fn render(
    source: &Raster,
    plan: &GeometryPlan,
    canvas: &mut Raster,
    ctx: &RenderCtx<'_>,
) -> Result<(), EngineError> {
    let (sw, sh) = source.dimensions();
    let (scale_x, scale_y) = plan.scale(sw, sh);
    let tile_size = ctx.config.tiled_tile_size();
    let overlap = ctx.config.tile_overlap;
    if overlap >= tile_size {
        return Err(EngineError::new(
            ErrorCode::InvalidDimensions,
            format!("tile overlap {overlap} must be smaller than tile size {tile_size}"),
        ));
    }

    let jobs = plan_tiles(sw, sh, scale_x, scale_y, plan, tile_size, overlap);
    let total = jobs.len() as u32;

    run_in_waves(
        &jobs,
        ctx.config.tile_parallelism,
        ctx.stop,
        |job| {
            let rendered = sampler::scale_region(
                source,
                job.crop,
                job.render_width,
                job.render_height,
                ctx.quality,
            )?;
            let core = if (job.core_x, job.core_y) == (0, 0)
                && rendered.dimensions() == (job.dst_width, job.dst_height)
            {
                rendered
            } else {
                rendered.crop_copy(job.core_x, job.core_y, job.dst_width, job.dst_height)?
            };
            Ok((job.dst_x, job.dst_y, core))
        },
        |index, (x, y, tile)| {
            canvas.blit_over(
                &tile,
                i64::from(plan.draw.x) + i64::from(x),
                i64::from(plan.draw.y) + i64::from(y),
            );
            if let Some(progress) = ctx.progress {
                progress(index as u32 + 1, total);
            }
            Ok(())
        },
    )
}

fn plan_tiles(
    sw: u32,
    sh: u32,
    scale_x: f64,
    scale_y: f64,
    plan: &GeometryPlan,
    tile_size: u32,
    overlap: u32,
) -> Vec<TileJob> {
    let (dw, dh) = (plan.draw.width, plan.draw.height);
    let mut jobs = Vec::new();

    let mut sy = 0u32;
    while sy < sh {
        let sth = tile_size.min(sh - sy);
        let mut sx = 0u32;
        while sx < sw {
            let stw = tile_size.min(sw - sx);

            // Core destination rect: floor origin, ceil extent, clamped to
            // the draw dimensions.
            let dst_x = (f64::from(sx) * scale_x).floor() as u32;
            let dst_y = (f64::from(sy) * scale_y).floor() as u32;
            let dst_width = ((f64::from(stw) * scale_x).ceil() as u32).min(dw - dst_x.min(dw));
            let dst_height = ((f64::from(sth) * scale_y).ceil() as u32).min(dh - dst_y.min(dh));
            if dst_width == 0 || dst_height == 0 {
                sx += stw;
                continue;
            }

            // Expanded source region and its destination footprint
            let ex0 = sx.saturating_sub(overlap);
            let ey0 = sy.saturating_sub(overlap);
            let ex1 = (sx + stw + overlap).min(sw);
            let ey1 = (sy + sth + overlap).min(sh);
            let edx0 = (f64::from(ex0) * scale_x).floor() as u32;
            let edy0 = (f64::from(ey0) * scale_y).floor() as u32;
            let edx1 = ((f64::from(ex1) * scale_x).ceil() as u32).min(dw).max(dst_x + dst_width);
            let edy1 = ((f64::from(ey1) * scale_y).ceil() as u32).min(dh).max(dst_y + dst_height);

            jobs.push(TileJob {
                dst_x,
                dst_y,
                dst_width,
                dst_height,
                render_width: edx1 - edx0,
                render_height: edy1 - edy0,
                core_x: dst_x - edx0,
                core_y: dst_y - edy0,
                crop: CropBox {
                    left: f64::from(ex0),
                    top: f64::from(ey0),
                    width: f64::from(ex1 - ex0),
                    height: f64::from(ey1 - ey0),
                },
            });
            sx += stw;
        }
        sy += sth;
    }
    jobs
}
