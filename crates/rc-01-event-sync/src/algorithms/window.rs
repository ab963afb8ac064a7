//! # Window Planning
//!
//! Splits the unprocessed range `(watermark, latest]` into consecutive
//! windows of at most `size` blocks.

use crate::domain::BlockWindow;
use shared_types::BlockNumber;

/// Iterator over the windows between a watermark and the chain head.
#[derive(Debug, Clone)]
pub struct Windows {
    next_from: BlockNumber,
    latest: BlockNumber,
    size: u64,
    done: bool,
}

impl Iterator for Windows {
    type Item = BlockWindow;

    fn next(&mut self) -> Option<BlockWindow> {
        if self.done || self.next_from > self.latest {
            return None;
        }
        let from = self.next_from;
        let to = from.saturating_add(self.size - 1).min(self.latest);
        if to == BlockNumber::MAX {
            self.done = true;
        } else {
            self.next_from = to + 1;
        }
        Some(BlockWindow::new(from, to))
    }
}

/// Windows covering `(watermark, latest]`.
///
/// Empty when `watermark >= latest`. A `size` of zero is treated as one.
#[must_use]
pub fn windows(watermark: BlockNumber, latest: BlockNumber, size: u64) -> Windows {
    Windows {
        next_from: watermark.saturating_add(1),
        latest,
        size: size.max(1),
        done: watermark >= latest,
    }
}

/// The first window after `watermark`, if any.
#[must_use]
pub fn next_window(watermark: BlockNumber, latest: BlockNumber, size: u64) -> Option<BlockWindow> {
    windows(watermark, latest, size).next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{invariant_window_bounded, invariant_windows_contiguous, MAX_WINDOW_SIZE};
    use proptest::prelude::*;

    #[test]
    fn test_caught_up_yields_nothing() {
        assert_eq!(windows(50, 50, 20).count(), 0);
        assert_eq!(windows(60, 50, 20).count(), 0);
    }

    #[test]
    fn test_exact_split() {
        let planned: Vec<_> = windows(10, 55, 20).collect();
        assert_eq!(
            planned,
            vec![
                BlockWindow::new(11, 30),
                BlockWindow::new(31, 50),
                BlockWindow::new(51, 55),
            ]
        );
    }

    #[test]
    fn test_single_block() {
        assert_eq!(next_window(99, 100, 20), Some(BlockWindow::new(100, 100)));
    }

    #[test]
    fn test_top_of_range_terminates() {
        let planned: Vec<_> = windows(BlockNumber::MAX - 3, BlockNumber::MAX, 20).collect();
        assert_eq!(
            planned,
            vec![BlockWindow::new(BlockNumber::MAX - 2, BlockNumber::MAX)]
        );
    }

    proptest! {
        #[test]
        fn prop_windows_bounded_and_contiguous(
            watermark in 0u64..10_000,
            ahead in 0u64..500,
            size in 1u64..=MAX_WINDOW_SIZE,
        ) {
            let latest = watermark + ahead;
            let planned: Vec<_> = windows(watermark, latest, size).collect();

            prop_assert!(planned.iter().all(|w| invariant_window_bounded(w, size)));
            prop_assert!(invariant_windows_contiguous(watermark, &planned));
            let covered: u64 = planned.iter().map(BlockWindow::span).sum();
            prop_assert_eq!(covered, ahead);
            if let Some(last) = planned.last() {
                prop_assert_eq!(last.to, latest);
            }
        }
    }
}
