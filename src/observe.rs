//! Process-wide error counters and the critical-error cleanup hook.
//!
//! Counters are read-mostly and cheap to bump; they never block the pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{EngineError, ErrorCode};

static COUNTERS: [AtomicU64; ErrorCode::COUNT] = {
    #[allow(clippy::declare_interior_mutable_const)]
    const ZERO: AtomicU64 = AtomicU64::new(0);
    [ZERO; ErrorCode::COUNT]
};

/// Record an error: bump its counter, log it, and run critical cleanup.
pub(crate) fn record(err: &EngineError) {
    let code = err.code();
    COUNTERS[code.index()].fetch_add(1, Ordering::Relaxed);
    log::debug!("{}", err.describe());
    if code.is_critical() {
        log::error!("critical failure {code}, clearing raster pool");
        crate::raster::pool_clear();
    }
}

/// Number of errors recorded for one code since process start (or [`reset`]).
pub fn count(code: ErrorCode) -> u64 {
    COUNTERS[code.index()].load(Ordering::Relaxed)
}

/// Snapshot of all non-zero counters.
pub fn snapshot() -> Vec<(ErrorCode, u64)> {
    (0..ErrorCode::COUNT)
        .filter_map(|i| {
            let code = ErrorCode::from_index(i)?;
            let n = COUNTERS[i].load(Ordering::Relaxed);
            (n > 0).then_some((code, n))
        })
        .collect()
}

/// Reset every counter to zero.
pub fn reset() {
    for counter in &COUNTERS {
        counter.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Counters are process-global, so this test tolerates other tests
    // recording in parallel: it only asserts relative growth.
    #[test]
    fn counting_and_snapshot() {
        let before = count(ErrorCode::DownloadFailed);
        let _ = EngineError::new(ErrorCode::DownloadFailed, "test");
        let _ = EngineError::new(ErrorCode::DownloadFailed, "test");
        assert!(count(ErrorCode::DownloadFailed) >= before + 2);
        assert!(snapshot()
            .iter()
            .any(|(code, n)| *code == ErrorCode::DownloadFailed && *n >= 2));
    }
}
