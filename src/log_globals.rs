//! Global log ring instances.
//!
//! One ring per execution context (single producer each, single drain
//! consumer), following ARCHITECTURE.md §11.
//!
//! Const-initialized; never destroyed.

use crate::logging::LogRing;

/// Ring for the real-time context.
///
/// Written only by the RT tick; drained by the drain task with priority
/// over [`BG_LOG`].
pub static RT_LOG: LogRing = LogRing::new();

/// Ring for background contexts (protocol reader, shells).
pub static BG_LOG: LogRing = LogRing::new();
