//! Cross-subsystem integration flows.

pub mod flows;
pub mod sync_windows;
