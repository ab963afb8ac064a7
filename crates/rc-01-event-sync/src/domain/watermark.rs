//! # Watermark and Block Windows
//!
//! The watermark is the last block whose logs have been fully forwarded.
//! Every block at or below it has been queried; nothing above it has been
//! acknowledged.

use serde::{Deserialize, Serialize};
use shared_types::BlockNumber;
use std::fmt;

/// Last block fully processed by one polling loop.
///
/// `None` until the poller has either been given a resume block or has
/// observed the chain head for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Watermark {
    last_checked: Option<BlockNumber>,
}

impl Watermark {
    /// A watermark that has not been initialized yet.
    #[must_use]
    pub const fn unset() -> Self {
        Self { last_checked: None }
    }

    /// A watermark that treats `block` and everything before it as processed.
    #[must_use]
    pub const fn at(block: BlockNumber) -> Self {
        Self {
            last_checked: Some(block),
        }
    }

    #[must_use]
    pub const fn get(&self) -> Option<BlockNumber> {
        self.last_checked
    }

    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.last_checked.is_some()
    }

    /// Move forward to `block`. Never moves backwards.
    ///
    /// Returns true if the watermark changed.
    pub fn advance_to(&mut self, block: BlockNumber) -> bool {
        match self.last_checked {
            Some(current) if current >= block => false,
            _ => {
                self.last_checked = Some(block);
                true
            }
        }
    }

    /// Explicit resume point. Unlike `advance_to` this may move backwards.
    pub fn reset(&mut self, block: BlockNumber) {
        self.last_checked = Some(block);
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_checked {
            Some(block) => write!(f, "{block}"),
            None => f.write_str("unset"),
        }
    }
}

/// Inclusive block range covered by one log query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockWindow {
    /// First block (inclusive).
    pub from: BlockNumber,
    /// Last block (inclusive).
    pub to: BlockNumber,
}

impl BlockWindow {
    #[must_use]
    pub const fn new(from: BlockNumber, to: BlockNumber) -> Self {
        Self { from, to }
    }

    /// Number of blocks in the window.
    #[must_use]
    pub const fn span(&self) -> u64 {
        self.to - self.from + 1
    }
}

impl fmt::Display for BlockWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Summary of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Chain head observed at the start of the cycle.
    pub latest_block: BlockNumber,
    /// Windows queried, in order.
    pub windows: Vec<BlockWindow>,
    /// Raw logs returned across all windows.
    pub logs_fetched: usize,
    /// Events decoded and forwarded.
    pub events_forwarded: usize,
    /// Logs skipped because they failed to decode.
    pub decode_failures: usize,
    /// Watermark at the end of the cycle.
    pub watermark: Option<BlockNumber>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_monotonic() {
        let mut wm = Watermark::at(10);
        assert!(wm.advance_to(29));
        assert!(!wm.advance_to(15));
        assert!(!wm.advance_to(29));
        assert_eq!(wm.get(), Some(29));
    }

    #[test]
    fn test_unset_advances_to_anything() {
        let mut wm = Watermark::unset();
        assert!(!wm.is_set());
        assert!(wm.advance_to(0));
        assert_eq!(wm.get(), Some(0));
        assert_eq!(wm.to_string(), "0");
    }

    #[test]
    fn test_reset_can_rewind() {
        let mut wm = Watermark::at(100);
        wm.reset(5);
        assert_eq!(wm.get(), Some(5));
    }

    #[test]
    fn test_window_span() {
        let window = BlockWindow::new(11, 30);
        assert_eq!(window.span(), 20);
        assert_eq!(window.to_string(), "[11, 30]");
    }
}
