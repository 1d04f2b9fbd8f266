//! Engine configuration knobs.

/// Tuning knobs for strategy selection and the resize backends.
///
/// The defaults match browser-like raster limits; most callers never touch
/// them. Values are plain data so a config can be shared across pipelines.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Maximum safe raster dimension per axis. Sources larger than this on
    /// either axis are always processed tiled.
    pub max_safe_dimension: u32,
    /// Soft budget for live raster memory, used by the memory-pressure
    /// heuristic and for sizing tile buffers.
    pub memory_budget_bytes: u64,
    /// Per-tile memory cap for the tiled backend.
    pub max_memory_per_tile: u64,
    /// Bounded concurrency for chunked/tiled work.
    pub tile_parallelism: usize,
    /// Overlap in source pixels between adjacent tiles. Must stay below the
    /// tile size.
    pub tile_overlap: u32,
    /// Explicit tile size override for the tiled backend.
    pub tile_size: Option<u32>,
    /// Cap on pyramid steps for the stepped backend.
    pub max_steps: u32,
    /// Maximum buffers retained by the raster recycle pool.
    pub pool_slots: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_safe_dimension: 16_384,
            memory_budget_bytes: 512 << 20,
            max_memory_per_tile: 16 << 20,
            tile_parallelism: 2,
            tile_overlap: 32,
            tile_size: None,
            max_steps: 8,
            pool_slots: 4,
        }
    }
}

impl EngineConfig {
    pub fn with_max_safe_dimension(mut self, dim: u32) -> Self {
        self.max_safe_dimension = dim;
        self
    }

    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget_bytes = bytes;
        self
    }

    pub fn with_tile_parallelism(mut self, parallelism: usize) -> Self {
        self.tile_parallelism = parallelism.max(1);
        self
    }

    pub fn with_tile_overlap(mut self, overlap: u32) -> Self {
        self.tile_overlap = overlap;
        self
    }

    pub fn with_tile_size(mut self, size: u32) -> Self {
        self.tile_size = Some(size);
        self
    }

    pub fn with_max_steps(mut self, steps: u32) -> Self {
        self.max_steps = steps.max(1);
        self
    }

    /// Tile side for the tiled backend: explicit override, else derived from
    /// the per-tile memory cap, clamped to [256, 2048] and rounded down to a
    /// power of two.
    pub(crate) fn tiled_tile_size(&self) -> u32 {
        if let Some(size) = self.tile_size {
            return size.max(1);
        }
        let side = ((self.max_memory_per_tile / 4) as f64).sqrt() as u32;
        prev_power_of_two(side.clamp(256, 2048))
    }
}

fn prev_power_of_two(v: u32) -> u32 {
    debug_assert!(v > 0);
    1 << (31 - v.leading_zeros())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_safe_dimension, 16_384);
        assert_eq!(config.tile_parallelism, 2);
        assert_eq!(config.tile_overlap, 32);
        assert_eq!(config.tiled_tile_size(), 2048);
    }

    #[test]
    fn tile_size_derivation_rounds_to_power_of_two() {
        let config = EngineConfig::default().with_memory_budget(512 << 20);
        // 6 MiB per tile -> sqrt(6 MiB / 4) ≈ 1253 -> 1024
        let config = EngineConfig {
            max_memory_per_tile: 6 << 20,
            ..config
        };
        assert_eq!(config.tiled_tile_size(), 1024);

        // Tiny cap clamps to 256
        let config = EngineConfig {
            max_memory_per_tile: 1 << 10,
            ..config
        };
        assert_eq!(config.tiled_tile_size(), 256);
    }

    #[test]
    fn explicit_tile_size_wins() {
        let config = EngineConfig::default().with_tile_size(777);
        assert_eq!(config.tiled_tile_size(), 777);
    }

    #[test]
    fn parallelism_floor() {
        let config = EngineConfig::default().with_tile_parallelism(0);
        assert_eq!(config.tile_parallelism, 1);
    }
}
