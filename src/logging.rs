//! RT-safe logging.
//!
//! # Architecture (from ARCHITECTURE.md §11)
//!
//! ```text
//! RT context              LogRing              drain task
//! ──────────              ───────              ──────────
//!
//! rt_log!() ──────────▶ [L0][L1][L2] ──────▶ sink (UART, host log)
//! ~100ns                  lock-free            blocking ok
//! non-blocking            ring buffer          low priority
//! ```
//!
//! # Rules
//!
//! - RULE 11.1: the RT path never calls a blocking log function; the
//!   `log` facade is for background contexts only
//! - RULE 11.2: RT code logs through `rt_log!` into a [`LogRing`]
//! - RULE 11.3: push never blocks; on a full ring the entry is dropped
//!   and counted
//!
//! Each ring is single-producer / single-consumer: one per execution
//! context, all drained by the one drain task.
//!
//! Messages are formatted directly into the claimed ring slot
//! ([`LogRing::log`]), so the RT tick pays one slot claim and one
//! format pass — no staging buffer, no second copy.

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

/// Maximum message length.
pub const MAX_MSG_LEN: usize = 120;

/// Default ring capacity (entries).
pub const LOG_RING_SIZE: usize = 256;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Fixed label for drain output.
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single fixed-width log entry.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct LogEntry {
    /// Timestamp in microseconds.
    pub at_us: i64,
    pub level: LogLevel,
    /// Message length.
    pub len: u8,
    /// Message bytes (not null-terminated).
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    pub const EMPTY: Self = Self {
        at_us: 0,
        level: LogLevel::Info,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    /// Message as UTF-8, lossy on the truncation boundary.
    pub fn text(&self) -> &str {
        core::str::from_utf8(&self.msg[..self.len as usize]).unwrap_or("<invalid utf8>")
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Formatting cursor over an entry's message field.
///
/// Saturates at [`MAX_MSG_LEN`]: a message that doesn't fit is truncated,
/// never an error — the RT tick must not care.
struct MsgCursor<'a> {
    msg: &'a mut [u8; MAX_MSG_LEN],
    len: usize,
}

impl fmt::Write for MsgCursor<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &b in s.as_bytes() {
            if self.len == MAX_MSG_LEN {
                break;
            }
            self.msg[self.len] = b;
            self.len += 1;
        }
        Ok(())
    }
}

/// Lock-free SPSC log ring.
///
/// One producer context pushes, the drain task pops. Push is wait-free:
/// a full ring drops the entry and bumps the dropped counter.
pub struct LogRing<const N: usize = LOG_RING_SIZE> {
    entries: UnsafeCell<[LogEntry; N]>,
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: one producer, one consumer, indices published with
// release/acquire ordering.
unsafe impl<const N: usize> Sync for LogRing<N> {}
unsafe impl<const N: usize> Send for LogRing<N> {}

impl<const N: usize> LogRing<N> {
    const MASK: usize = N - 1;

    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "log ring size must be a power of 2");

        Self {
            entries: UnsafeCell::new([LogEntry::EMPTY; N]),
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Claim the next slot, fill it, publish it.
    ///
    /// The fill closure runs against the slot itself — message bytes are
    /// produced in place. On a full ring nothing is claimed: the drop is
    /// counted and the closure never runs.
    #[inline]
    fn produce(&self, at_us: i64, level: LogLevel, fill: impl FnOnce(&mut LogEntry)) -> bool {
        let write = self.write_idx.load(Ordering::Relaxed);
        let read = self.read_idx.load(Ordering::Acquire);

        if write.wrapping_sub(read) >= N as u32 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // SAFETY: single producer; the slot at `write` stays invisible to
        // the consumer until the release-store below.
        unsafe {
            let entry = &mut (*self.entries.get())[(write as usize) & Self::MASK];
            entry.at_us = at_us;
            entry.level = level;
            entry.len = 0;
            fill(entry);
        }

        self.write_idx
            .store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Push a pre-rendered message. Never blocks.
    ///
    /// Returns `false` (and counts a drop) when the ring is full.
    ///
    /// # Timing
    ///
    /// O(1) plus the message copy; target is under 200 ns for typical
    /// messages.
    #[inline]
    pub fn push(&self, at_us: i64, level: LogLevel, msg: &[u8]) -> bool {
        self.produce(at_us, level, |entry| {
            let len = msg.len().min(MAX_MSG_LEN);
            entry.msg[..len].copy_from_slice(&msg[..len]);
            entry.len = len as u8;
        })
    }

    /// Format a message straight into the ring. Never blocks.
    ///
    /// This is what the `rt_log!` macro family calls: the format pass
    /// writes into the claimed slot, truncating at [`MAX_MSG_LEN`].
    #[inline]
    pub fn log(&self, at_us: i64, level: LogLevel, args: fmt::Arguments<'_>) -> bool {
        self.produce(at_us, level, |entry| {
            let mut cursor = MsgCursor {
                msg: &mut entry.msg,
                len: 0,
            };
            let _ = fmt::write(&mut cursor, args);
            entry.len = cursor.len as u8;
        })
    }

    /// Copy the oldest entry into `out`. Single consumer only.
    ///
    /// Returns `false` when the ring is empty; `out` is untouched then.
    #[inline]
    pub fn drain_into(&self, out: &mut LogEntry) -> bool {
        let read = self.read_idx.load(Ordering::Relaxed);
        if read == self.write_idx.load(Ordering::Acquire) {
            return false;
        }

        // SAFETY: single consumer; the producer release-stored this slot
        *out = unsafe { (*self.entries.get())[(read as usize) & Self::MASK] };

        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        true
    }

    /// Pop the next entry, if any. Single consumer only.
    #[inline]
    pub fn drain(&self) -> Option<LogEntry> {
        let mut entry = LogEntry::EMPTY;
        if self.drain_into(&mut entry) {
            Some(entry)
        } else {
            None
        }
    }

    /// Entries waiting to be drained.
    #[inline]
    pub fn pending(&self) -> u32 {
        self.write_idx
            .load(Ordering::Acquire)
            .wrapping_sub(self.read_idx.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn has_entries(&self) -> bool {
        self.pending() != 0
    }

    /// Entries dropped since the counter was last reset.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }
}

impl<const N: usize> Default for LogRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// RT-safe log macro: level by name, formatted in place.
///
/// Use this in the RT path instead of `println!` or the `log` facade.
/// Evaluates to `false` when the ring was full and the entry dropped.
///
/// # Example
///
/// ```ignore
/// rt_log!(RT_LOG, Warn, now_us, "lag {} over budget", lag);
/// ```
#[macro_export]
macro_rules! rt_log {
    ($ring:expr, $level:ident, $at_us:expr, $($arg:tt)*) => {
        $ring.log($at_us, $crate::logging::LogLevel::$level, format_args!($($arg)*))
    };
}

/// RT-safe error log.
#[macro_export]
macro_rules! rt_error {
    ($ring:expr, $at_us:expr, $($arg:tt)*) => {{ let _ = $crate::rt_log!($ring, Error, $at_us, $($arg)*); }};
}

/// RT-safe warning log.
#[macro_export]
macro_rules! rt_warn {
    ($ring:expr, $at_us:expr, $($arg:tt)*) => {{ let _ = $crate::rt_log!($ring, Warn, $at_us, $($arg)*); }};
}

/// RT-safe info log.
#[macro_export]
macro_rules! rt_info {
    ($ring:expr, $at_us:expr, $($arg:tt)*) => {{ let _ = $crate::rt_log!($ring, Info, $at_us, $($arg)*); }};
}

/// RT-safe debug log.
#[macro_export]
macro_rules! rt_debug {
    ($ring:expr, $at_us:expr, $($arg:tt)*) => {{ let _ = $crate::rt_log!($ring, Debug, $at_us, $($arg)*); }};
}

/// RT-safe trace log.
#[macro_export]
macro_rules! rt_trace {
    ($ring:expr, $at_us:expr, $($arg:tt)*) => {{ let _ = $crate::rt_log!($ring, Trace, $at_us, $($arg)*); }};
}
