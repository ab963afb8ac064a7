//! # Domain Invariants
//!
//! Rules the poller must uphold on every cycle.

use super::errors::SyncError;
use super::watermark::BlockWindow;
use shared_types::BlockNumber;

/// Largest block span a single log query may cover.
pub const MAX_WINDOW_SIZE: u64 = 20;

/// Default pause between poll cycles.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Invariant: a window never spans more than `limit` blocks and is non-empty.
pub fn invariant_window_bounded(window: &BlockWindow, limit: u64) -> bool {
    window.from <= window.to && window.span() <= limit
}

/// Invariant: consecutive windows are contiguous, starting right after the watermark.
///
/// Together with monotonic advance this gives "every block at or below the
/// watermark was queried exactly once".
pub fn invariant_windows_contiguous(start_after: BlockNumber, windows: &[BlockWindow]) -> bool {
    let mut expected = start_after.saturating_add(1);
    for window in windows {
        if window.from != expected {
            return false;
        }
        expected = window.to.saturating_add(1);
    }
    true
}

/// Invariant: the configured window size is within `1..=MAX_WINDOW_SIZE`.
pub fn invariant_window_size(window_size: u64) -> Result<(), SyncError> {
    if window_size == 0 || window_size > MAX_WINDOW_SIZE {
        return Err(SyncError::InvalidConfig(format!(
            "window size {window_size} outside 1..={MAX_WINDOW_SIZE}"
        )));
    }
    Ok(())
}
