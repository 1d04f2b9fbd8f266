//! Fit-mode geometry planning.
//!
//! The planner is a pure function from source dimensions and a
//! [`ResizeConfig`] to a [`GeometryPlan`]: canvas dimensions, the draw rect
//! the scaled source lands in, and the background fill. Rendering never
//! happens here.

use rgb::RGBA8;

use crate::error::{EngineError, ErrorCode};

/// Symmetric padding around the fitted content, in destination pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Padding {
    pub x: u32,
    pub y: u32,
}

impl Padding {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn uniform(pad: u32) -> Self {
        Self { x: pad, y: pad }
    }
}

/// Fit semantics for a resize. Exactly one per resize call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fit {
    /// Fill the target box, cropping overflow; aspect preserved.
    Cover { width: u32, height: u32 },
    /// Fit inside the target box, letterboxing; aspect preserved.
    Contain { width: u32, height: u32 },
    /// Exactly the target box; aspect may change.
    Fill { width: u32, height: u32 },
    /// Shrink (never grow) so each given axis is at most the target.
    MaxFit {
        width: Option<u32>,
        height: Option<u32>,
    },
    /// Grow (never shrink) so each given axis is at least the target.
    MinFit {
        width: Option<u32>,
        height: Option<u32>,
    },
}

/// A recorded resize request.
#[derive(Clone, Debug, PartialEq)]
pub struct ResizeConfig {
    pub fit: Fit,
    /// Clamp the scale so the source is never enlarged. For `Fill`, each
    /// axis is capped independently at the source size.
    pub without_enlargement: bool,
    /// Canvas fill behind and around the drawn content. Transparent when
    /// absent. Honored for `Cover` and `Contain`.
    pub background: Option<RGBA8>,
    /// Extra canvas around the fitted content. Honored for `Cover` and
    /// `Contain`.
    pub padding: Option<Padding>,
}

impl ResizeConfig {
    fn with_fit(fit: Fit) -> Self {
        Self {
            fit,
            without_enlargement: false,
            background: None,
            padding: None,
        }
    }

    pub fn cover(width: u32, height: u32) -> Self {
        Self::with_fit(Fit::Cover { width, height })
    }

    pub fn contain(width: u32, height: u32) -> Self {
        Self::with_fit(Fit::Contain { width, height })
    }

    pub fn fill(width: u32, height: u32) -> Self {
        Self::with_fit(Fit::Fill { width, height })
    }

    pub fn max_fit(width: Option<u32>, height: Option<u32>) -> Self {
        Self::with_fit(Fit::MaxFit { width, height })
    }

    pub fn min_fit(width: Option<u32>, height: Option<u32>) -> Self {
        Self::with_fit(Fit::MinFit { width, height })
    }

    pub fn max_width(width: u32) -> Self {
        Self::max_fit(Some(width), None)
    }

    pub fn max_height(height: u32) -> Self {
        Self::max_fit(None, Some(height))
    }

    pub fn min_width(width: u32) -> Self {
        Self::min_fit(Some(width), None)
    }

    pub fn min_height(height: u32) -> Self {
        Self::min_fit(None, Some(height))
    }

    pub fn without_enlargement(mut self, flag: bool) -> Self {
        self.without_enlargement = flag;
        self
    }

    pub fn with_background(mut self, background: RGBA8) -> Self {
        self.background = Some(background);
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Check the recorded dimensions. Present dimensions must be positive.
    pub fn validate(&self) -> Result<(), EngineError> {
        let bad = |what: &str| {
            Err(EngineError::new(
                ErrorCode::InvalidDimensions,
                format!("{what} must be a positive integer"),
            ))
        };
        match self.fit {
            Fit::Cover { width, height }
            | Fit::Contain { width, height }
            | Fit::Fill { width, height } => {
                if width == 0 || height == 0 {
                    return bad("target width/height");
                }
            }
            Fit::MaxFit { width, height } | Fit::MinFit { width, height } => {
                if width.is_none() && height.is_none() {
                    return Err(EngineError::new(
                        ErrorCode::InvalidDimensions,
                        "at least one of width or height is required",
                    ));
                }
                if width == Some(0) || height == Some(0) {
                    return bad("target width/height");
                }
            }
        }
        Ok(())
    }
}

/// Where the scaled source lands on the canvas.
///
/// The rect may overhang the canvas on any side (Cover crops by clipping);
/// the renderer clips it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Output of the planner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryPlan {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub draw: DrawRect,
    pub background: Option<RGBA8>,
}

impl GeometryPlan {
    /// Source-to-destination scale factors for a given source.
    pub(crate) fn scale(&self, source_width: u32, source_height: u32) -> (f64, f64) {
        (
            f64::from(self.draw.width) / f64::from(source_width),
            f64::from(self.draw.height) / f64::from(source_height),
        )
    }

    /// Whether the draw rect covers the whole canvas exactly.
    pub(crate) fn draw_covers_canvas(&self) -> bool {
        self.draw.x <= 0
            && self.draw.y <= 0
            && i64::from(self.draw.x) + i64::from(self.draw.width)
                >= i64::from(self.canvas_width)
            && i64::from(self.draw.y) + i64::from(self.draw.height)
                >= i64::from(self.canvas_height)
    }
}

/// Compute the geometry plan for one resize.
///
/// Pure: identical inputs produce identical plans. Rounding of final
/// positions and sizes is half-to-even; when rounding makes the content
/// overshoot an in-bounds draw rect, the rect is trimmed to the canvas.
pub fn plan(
    source_width: u32,
    source_height: u32,
    config: &ResizeConfig,
) -> Result<GeometryPlan, EngineError> {
    if source_width == 0 || source_height == 0 {
        return Err(EngineError::new(
            ErrorCode::InvalidDimensions,
            format!("source dimensions {source_width}x{source_height} are invalid"),
        ));
    }
    config.validate()?;

    let sw = f64::from(source_width);
    let sh = f64::from(source_height);

    let plan = match config.fit {
        Fit::Cover { width, height } => {
            let mut s = (f64::from(width) / sw).max(f64::from(height) / sh);
            if config.without_enlargement && s > 1.0 {
                s = 1.0;
            }
            boxed_plan(width, height, sw, sh, s, config, false)
        }
        Fit::Contain { width, height } => {
            let mut s = (f64::from(width) / sw).min(f64::from(height) / sh);
            if config.without_enlargement && s > 1.0 {
                s = 1.0;
            }
            boxed_plan(width, height, sw, sh, s, config, true)
        }
        Fit::Fill { width, height } => {
            let (dw, dh) = if config.without_enlargement {
                (width.min(source_width), height.min(source_height))
            } else {
                (width, height)
            };
            GeometryPlan {
                canvas_width: width,
                canvas_height: height,
                draw: DrawRect {
                    x: 0,
                    y: 0,
                    width: dw,
                    height: dh,
                },
                background: config.background,
            }
        }
        Fit::MaxFit { width, height } => {
            let s = [
                width.map(|w| f64::from(w) / sw),
                height.map(|h| f64::from(h) / sh),
                Some(1.0),
            ]
            .into_iter()
            .flatten()
            .fold(f64::INFINITY, f64::min);
            whole_canvas_plan(sw, sh, s, config.background)
        }
        Fit::MinFit { width, height } => {
            let mut s = [
                width.map(|w| f64::from(w) / sw),
                height.map(|h| f64::from(h) / sh),
                Some(1.0),
            ]
            .into_iter()
            .flatten()
            .fold(0.0_f64, f64::max);
            if config.without_enlargement && s > 1.0 {
                s = 1.0;
            }
            whole_canvas_plan(sw, sh, s, config.background)
        }
    };

    Ok(plan)
}

/// Cover/Contain share the boxed layout: fixed target box, centered content,
/// optional outward padding.
fn boxed_plan(
    target_width: u32,
    target_height: u32,
    sw: f64,
    sh: f64,
    scale: f64,
    config: &ResizeConfig,
    clip_to_target: bool,
) -> GeometryPlan {
    let scaled_w = sw * scale;
    let scaled_h = sh * scale;

    let mut x = round_even((f64::from(target_width) - scaled_w) / 2.0) as i32;
    let mut y = round_even((f64::from(target_height) - scaled_h) / 2.0) as i32;
    let mut width = (round_even(scaled_w) as u32).max(1);
    let mut height = (round_even(scaled_h) as u32).max(1);

    if clip_to_target {
        // Rounding may overshoot the box by one pixel on either axis.
        if x >= 0 && x as u32 + width > target_width {
            width = target_width - x as u32;
        }
        if y >= 0 && y as u32 + height > target_height {
            height = target_height - y as u32;
        }
    }

    let (mut canvas_width, mut canvas_height) = (target_width, target_height);
    if let Some(padding) = config.padding {
        canvas_width += 2 * padding.x;
        canvas_height += 2 * padding.y;
        x += padding.x as i32;
        y += padding.y as i32;
    }

    GeometryPlan {
        canvas_width,
        canvas_height,
        draw: DrawRect {
            x,
            y,
            width,
            height,
        },
        background: config.background,
    }
}

/// MaxFit/MinFit: the canvas is the scaled source, drawn edge to edge.
fn whole_canvas_plan(sw: f64, sh: f64, scale: f64, background: Option<RGBA8>) -> GeometryPlan {
    let width = (round_even(sw * scale) as u32).max(1);
    let height = (round_even(sh * scale) as u32).max(1);
    GeometryPlan {
        canvas_width: width,
        canvas_height: height,
        draw: DrawRect {
            x: 0,
            y: 0,
            width,
            height,
        },
        background,
    }
}

fn round_even(v: f64) -> f64 {
    v.round_ties_even()
}
