//! Stock filter plugins.
//!
//! Exported under a stable namespace so callers can re-register or wrap the
//! builtins; the registry pre-loads all of them at first use.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::FilterPlugin;

pub use super::color::{Brightness, Contrast, Grayscale, Invert, Posterize, Saturation, Sepia};
pub use super::convolve::{Blur, EdgeDetection, Emboss, Sharpen};
pub use super::effects::{Noise, Pixelate, Vignette};

/// Every builtin plugin, keyed by registry name.
pub(crate) fn all() -> BTreeMap<String, Arc<dyn FilterPlugin>> {
    let plugins: [Arc<dyn FilterPlugin>; 14] = [
        Arc::new(Brightness),
        Arc::new(Contrast),
        Arc::new(Saturation),
        Arc::new(Grayscale),
        Arc::new(Sepia),
        Arc::new(Invert),
        Arc::new(Noise),
        Arc::new(Vignette),
        Arc::new(Pixelate),
        Arc::new(Posterize),
        Arc::new(Blur),
        Arc::new(Sharpen),
        Arc::new(Emboss),
        Arc::new(EdgeDetection),
    ];
    plugins
        .into_iter()
        .map(|p| (p.name().to_owned(), p))
        .collect()
}
