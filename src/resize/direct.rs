//! Direct backend: one scaled draw into the canvas.

use super::{sampler, RenderCtx};
use crate::error::EngineError;
use crate::geometry::GeometryPlan;
use crate::raster::Raster;

pub(crate) fn render(
    source: &Raster,
    plan: &GeometryPlan,
    canvas: &mut Raster,
    ctx: &RenderCtx<'_>,
) -> Result<(), EngineError> {
    if (plan.draw.width, plan.draw.height) == source.dimensions() {
        canvas.blit_over(source, i64::from(plan.draw.x), i64::from(plan.draw.y));
        return Ok(());
    }
    let scaled = sampler::scale_full(source, plan.draw.width, plan.draw.height, ctx.quality)?;
    canvas.blit_over(&scaled, i64::from(plan.draw.x), i64::from(plan.draw.y));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::geometry::{plan, ResizeConfig};
    use crate::strategy::Quality;
    use rgb::RGBA8;

    #[test]
    fn cover_crop_keeps_center() {
        // Left half red, right half blue; covering a square from the wide
        // source must keep content from both halves, clipped at the edges.
        let mut source = Raster::new(100, 50).unwrap();
        for y in 0..50u32 {
            for x in 0..100u32 {
                let i = ((y * 100 + x) * 4) as usize;
                let px = if x < 50 {
                    [200, 0, 0, 255]
                } else {
                    [0, 0, 200, 255]
                };
                source.as_bytes_mut()[i..i + 4].copy_from_slice(&px);
            }
        }

        let config = EngineConfig::default();
        let geometry = plan(100, 50, &ResizeConfig::cover(40, 40)).unwrap();
        let mut canvas = Raster::new(geometry.canvas_width, geometry.canvas_height).unwrap();
        let ctx = RenderCtx {
            quality: Quality::Fast,
            config: &config,
            limits: None,
            stop: None,
            progress: None,
        };
        render(&source, &geometry, &mut canvas, &ctx).unwrap();

        assert_eq!(canvas.pixel(0, 20)[0], 200); // red side survives
        assert_eq!(canvas.pixel(39, 20)[2], 200); // blue side survives
        assert_eq!(canvas.pixel(0, 0)[3], 255); // fully covered
    }

    #[test]
    fn unscaled_draw_skips_resampling() {
        let source = Raster::filled(
            10,
            10,
            RGBA8 {
                r: 1,
                g: 2,
                b: 3,
                a: 255,
            },
        )
        .unwrap();
        let config = EngineConfig::default();
        let geometry = plan(
            10,
            10,
            &ResizeConfig::contain(30, 30).without_enlargement(true),
        )
        .unwrap();
        let mut canvas = Raster::new(30, 30).unwrap();
        let ctx = RenderCtx {
            quality: Quality::High,
            config: &config,
            limits: None,
            stop: None,
            progress: None,
        };
        render(&source, &geometry, &mut canvas, &ctx).unwrap();
        assert_eq!(canvas.pixel(15, 15), [1, 2, 3, 255]);
        assert_eq!(canvas.pixel(0, 0), [0, 0, 0, 0]);
    }
}
