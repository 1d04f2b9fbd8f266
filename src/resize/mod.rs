//! Resize backends.
//!
//! Every backend produces a raster of exactly the planned canvas dimensions
//! and honors the plan's draw rect; they differ only in how the scaled
//! content is produced. Strategy selection lives in [`crate::strategy`].

mod chunked;
mod direct;
pub(crate) mod sampler;
mod stepped;
mod tiled;

use crate::config::EngineConfig;
use crate::error::{EngineError, ErrorCode};
use crate::geometry::GeometryPlan;
use crate::limits::{check_stop, Limits, Stop};
use crate::raster::Raster;
use crate::strategy::{Quality, Strategy};

/// Progress callback: `(completed, total)` tiles.
pub type ProgressFn = dyn Fn(u32, u32) + Send + Sync;

/// Everything a backend needs besides the pixels.
pub(crate) struct RenderCtx<'a> {
    pub quality: Quality,
    pub config: &'a EngineConfig,
    pub limits: Option<&'a Limits>,
    pub stop: Option<&'a dyn Stop>,
    pub progress: Option<&'a ProgressFn>,
}

/// Execute one resize: allocate the canvas, paint the background, and run
/// the selected backend.
pub(crate) fn execute(
    source: Raster,
    plan: &GeometryPlan,
    strategy: Strategy,
    ctx: &RenderCtx<'_>,
) -> Result<Raster, EngineError> {
    if let Some(limits) = ctx.limits {
        limits.check_dimensions(plan.canvas_width, plan.canvas_height)?;
        limits.check_memory(
            u64::from(plan.canvas_width) * u64::from(plan.canvas_height) * 4,
        )?;
    }

    // Identity: nothing to scale and nothing behind the content to show.
    if plan.background.is_none()
        && plan.draw.x == 0
        && plan.draw.y == 0
        && (plan.draw.width, plan.draw.height) == source.dimensions()
        && (plan.canvas_width, plan.canvas_height) == source.dimensions()
    {
        return Ok(source);
    }

    let mut canvas = Raster::new(plan.canvas_width, plan.canvas_height)?;
    if let Some(color) = plan.background {
        canvas.fill(color);
    }

    match strategy {
        Strategy::Direct => direct::render(&source, plan, &mut canvas, ctx)?,
        Strategy::Chunked => chunked::render(&source, plan, &mut canvas, ctx)?,
        Strategy::Stepped => stepped::render(&source, plan, &mut canvas, ctx)?,
        Strategy::Tiled => tiled::render(&source, plan, &mut canvas, ctx)?,
    }

    crate::raster::pool_recycle(source, ctx.config.pool_slots);
    Ok(canvas)
}

/// Run tile jobs in bounded waves.
///
/// Each wave renders up to `parallelism` tiles on scoped threads, then the
/// results are handed to `sink` in job order on the calling thread. Dest
/// writes therefore never race, and memory stays bounded by one wave of
/// tiles. Cancellation is checked between waves.
pub(crate) fn run_in_waves<J, T, R, S>(
    jobs: &[J],
    parallelism: usize,
    stop: Option<&dyn Stop>,
    render: R,
    mut sink: S,
) -> Result<(), EngineError>
where
    J: Sync,
    T: Send,
    R: Fn(&J) -> Result<T, EngineError> + Sync,
    S: FnMut(usize, T) -> Result<(), EngineError>,
{
    let mut completed = 0usize;
    for wave in jobs.chunks(parallelism.max(1)) {
        check_stop(stop, "tile-render")?;

        let results: Vec<Result<T, EngineError>> = if wave.len() == 1 || parallelism <= 1 {
            wave.iter().map(&render).collect()
        } else {
            std::thread::scope(|scope| {
                let render = &render;
                let handles: Vec<_> = wave
                    .iter()
                    .map(|job| scope.spawn(move || render(job)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle.join().unwrap_or_else(|_| {
                            Err(EngineError::new(
                                ErrorCode::ProcessingFailed,
                                "tile worker panicked",
                            ))
                        })
                    })
                    .collect()
            })
        };

        for result in results {
            let tile = result?;
            sink(completed, tile)?;
            completed += 1;
        }
    }
    Ok(())
}
