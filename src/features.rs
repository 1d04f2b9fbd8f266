//! Read-only capability probe.

/// What this build of the engine supports. Callers can consult it to pick
/// output formats or decide whether to hand over shared bitmaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Features {
    /// WebP encoding compiled in.
    pub webp: bool,
    /// AVIF support (not currently available).
    pub avif: bool,
    /// Tile work can run off the caller's thread.
    pub threaded_tiles: bool,
    /// Shared decoded images (`SourceToken::Shared`) are accepted.
    pub shared_bitmaps: bool,
}

impl Features {
    /// Probe the compiled-in capability set.
    pub fn detect() -> Self {
        Self {
            webp: cfg!(feature = "webp"),
            avif: false,
            threaded_tiles: true,
            shared_bitmaps: true,
        }
    }
}
