//! Fault state management.
//!
//! # Philosophy (from ARCHITECTURE.md §8)
//!
//! > Corrupted CW timing is worse than silence.
//! > If in doubt, FAULT and stop.
//!
//! A keyer that sends wrong timing is broken.
//! A keyer that sends nothing is safe.
//!
//! The register is a one-shot latch: the first writer wins the code and
//! datum fields, later writers only bump the boot counter. Only an explicit
//! `clear()` re-arms it.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use num_enum::{FromPrimitive, IntoPrimitive};

/// Fault codes indicating why the keyer stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum FaultCode {
    /// No fault (normal operation).
    #[num_enum(default)]
    None = 0,

    /// Hard-RT consumer fell behind its latency budget.
    /// Timing accuracy can no longer be guaranteed.
    LatencyExceeded = 1,

    /// A consumer's read index fell more than capacity behind the
    /// producer. Samples were lost.
    Overrun = 2,

    /// Stream-level inconsistency (read race, bad construction).
    StreamError = 3,

    /// Internal invariant violation.
    Internal = 4,
}

/// Process-wide latched fault register.
///
/// Written by hard-RT consumers on timing failure, read everywhere. The RT
/// loop detects a fault in a single relaxed load per tick.
///
/// # Usage
///
/// ```ignore
/// static FAULT: FaultRegister = FaultRegister::new();
///
/// // In the RT consumer:
/// if lag > max_lag {
///     FAULT.set(FaultCode::LatencyExceeded, lag);
///     return Err(FaultCode::LatencyExceeded);
/// }
///
/// // In the supervisor:
/// if FAULT.is_active() {
///     key_off();
///     FAULT.clear();
///     consumer.resync();
/// }
/// ```
pub struct FaultRegister {
    /// Claimed by the first `set` since the last `clear`.
    claimed: AtomicBool,

    /// True once the code and datum below are published.
    active: AtomicBool,

    /// Fault code (reason).
    code: AtomicU8,

    /// Additional datum, typically the observed lag in samples.
    datum: AtomicU32,

    /// Total faults since boot. Never reset by `clear()`.
    count: AtomicU32,
}

impl FaultRegister {
    pub const fn new() -> Self {
        Self {
            claimed: AtomicBool::new(false),
            active: AtomicBool::new(false),
            code: AtomicU8::new(FaultCode::None as u8),
            datum: AtomicU32::new(0),
            count: AtomicU32::new(0),
        }
    }

    /// Latch a fault.
    ///
    /// First-write-wins on the code and datum: if the register is already
    /// claimed, only the boot counter advances. The claim CAS orders the
    /// code/datum stores before `active` becomes observable, so readers
    /// that see `active` see a coherent pair.
    #[inline]
    pub fn set(&self, code: FaultCode, datum: u32) {
        self.count.fetch_add(1, Ordering::Relaxed);

        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.code.store(code.into(), Ordering::Relaxed);
        self.datum.store(datum, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
    }

    /// Single-load fault query for the RT tick.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Fault code; meaningful only while active.
    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from(self.code.load(Ordering::Acquire))
    }

    /// Fault datum; meaning depends on the code.
    #[inline]
    pub fn datum(&self) -> u32 {
        self.datum.load(Ordering::Acquire)
    }

    /// Total fault count since boot.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Clear the latch (after recovery).
    ///
    /// Resets code, datum and active; the boot counter is preserved for
    /// diagnostics. Consumers must `resync()` after this.
    #[inline]
    pub fn clear(&self) {
        self.code.store(FaultCode::None as u8, Ordering::Relaxed);
        self.datum.store(0, Ordering::Relaxed);
        self.active.store(false, Ordering::Release);
        self.claimed.store(false, Ordering::Release);
    }

    /// Coherent copy of the current state.
    #[inline]
    pub fn snapshot(&self) -> FaultSnapshot {
        FaultSnapshot {
            active: self.active.load(Ordering::Acquire),
            code: self.code(),
            datum: self.datum(),
            count: self.count(),
        }
    }
}

impl Default for FaultRegister {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the register.
#[derive(Clone, Copy, Debug)]
pub struct FaultSnapshot {
    pub active: bool,
    pub code: FaultCode,
    pub datum: u32,
    pub count: u32,
}

/// Process-wide fault register.
///
/// Initialized at const time; never destroyed.
pub static FAULT: FaultRegister = FaultRegister::new();
