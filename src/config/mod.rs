//! Module: config
//!
//! Purpose: process-wide keyer configuration, readable from the RT path.
//!
//! Architecture:
//! - Every parameter is an individually atomic scalar (strings are
//!   fixed-width byte arrays)
//! - Reads are relaxed; every write bumps `generation` with release
//!   ordering
//! - The RT loop snapshots `generation` at the top of a tick and re-reads
//!   parameters only when it advanced; a reader that sees the same
//!   generation before and after a group read saw a coherent group
//!
//! Safety: RT-safe. All access via atomics, no locks.

pub mod presets;
pub mod registry;

pub use presets::{IambicPreset, PresetBank, PRESETS};
pub use registry::{find_param, ParamDescriptor, ParamKind, ParamValue, PARAMS};

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

use crate::iambic::{IambicConfig, IambicMode, MemoryMode, SqueezeMode};

/// Rejected parameter writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    /// No parameter with that name.
    #[error("unknown parameter")]
    Unknown,
    /// Value outside the parameter's allowed range.
    #[error("value out of range ({min}..={max})")]
    OutOfRange { min: u32, max: u32 },
    /// Value type does not match the parameter.
    #[error("wrong value type")]
    WrongKind,
}

macro_rules! checked_setter {
    ($name:ident, $field:ident, $ty:ty, $min:expr, $max:expr) => {
        pub fn $name(&self, value: $ty) -> Result<(), ParamError> {
            if !($min..=$max).contains(&value) {
                return Err(ParamError::OutOfRange {
                    min: $min as u32,
                    max: $max as u32,
                });
            }
            self.$field.store(value, Ordering::Relaxed);
            self.bump_generation();
            Ok(())
        }
    };
}

/// Process-wide keyer configuration.
pub struct KeyerConfig {
    speed_wpm: AtomicU8,
    iambic_mode: AtomicU8,
    memory_mode: AtomicU8,
    squeeze_mode: AtomicU8,
    weight: AtomicU8,
    mem_window_start_pct: AtomicU8,
    mem_window_end_pct: AtomicU8,
    farnsworth_wpm: AtomicU8,
    hscw_lpm: AtomicU8,
    sidetone_hz: AtomicU16,
    sidetone_enabled: AtomicBool,
    tick_rate_hz: AtomicU16,
    rt_max_lag: AtomicU16,
    ptt_lead_ms: AtomicU16,
    ptt_tail_ms: AtomicU16,
    paused: AtomicBool,
    pin_config: AtomicU8,
    generation: AtomicU16,
}

impl KeyerConfig {
    pub const SPEED_MIN: u8 = 5;
    pub const SPEED_MAX: u8 = 100;
    pub const WEIGHT_MIN: u8 = 33;
    pub const WEIGHT_MAX: u8 = 67;

    pub const fn new() -> Self {
        Self {
            speed_wpm: AtomicU8::new(25),
            iambic_mode: AtomicU8::new(IambicMode::B as u8),
            memory_mode: AtomicU8::new(MemoryMode::DotAndDah as u8),
            squeeze_mode: AtomicU8::new(SqueezeMode::LatchOn as u8),
            weight: AtomicU8::new(50),
            mem_window_start_pct: AtomicU8::new(60),
            mem_window_end_pct: AtomicU8::new(99),
            farnsworth_wpm: AtomicU8::new(0),
            hscw_lpm: AtomicU8::new(0),
            sidetone_hz: AtomicU16::new(600),
            sidetone_enabled: AtomicBool::new(true),
            tick_rate_hz: AtomicU16::new(10_000),
            rt_max_lag: AtomicU16::new(8),
            ptt_lead_ms: AtomicU16::new(0),
            ptt_tail_ms: AtomicU16::new(0),
            paused: AtomicBool::new(false),
            pin_config: AtomicU8::new(0x07),
            generation: AtomicU16::new(0),
        }
    }

    #[inline]
    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Current generation stamp.
    #[inline]
    pub fn generation(&self) -> u16 {
        self.generation.load(Ordering::Acquire)
    }

    // --- Getters (relaxed; each field individually coherent) ---

    pub fn speed_wpm(&self) -> u8 {
        self.speed_wpm.load(Ordering::Relaxed)
    }

    pub fn iambic_mode(&self) -> IambicMode {
        IambicMode::try_from(self.iambic_mode.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn memory_mode(&self) -> MemoryMode {
        MemoryMode::try_from(self.memory_mode.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn squeeze_mode(&self) -> SqueezeMode {
        SqueezeMode::try_from(self.squeeze_mode.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn weight(&self) -> u8 {
        self.weight.load(Ordering::Relaxed)
    }

    pub fn mem_window_start_pct(&self) -> u8 {
        self.mem_window_start_pct.load(Ordering::Relaxed)
    }

    pub fn mem_window_end_pct(&self) -> u8 {
        self.mem_window_end_pct.load(Ordering::Relaxed)
    }

    pub fn farnsworth_wpm(&self) -> u8 {
        self.farnsworth_wpm.load(Ordering::Relaxed)
    }

    pub fn hscw_lpm(&self) -> u8 {
        self.hscw_lpm.load(Ordering::Relaxed)
    }

    pub fn sidetone_hz(&self) -> u16 {
        self.sidetone_hz.load(Ordering::Relaxed)
    }

    pub fn sidetone_enabled(&self) -> bool {
        self.sidetone_enabled.load(Ordering::Relaxed)
    }

    pub fn tick_rate_hz(&self) -> u16 {
        self.tick_rate_hz.load(Ordering::Relaxed)
    }

    pub fn rt_max_lag(&self) -> u16 {
        self.rt_max_lag.load(Ordering::Relaxed)
    }

    pub fn ptt_lead_ms(&self) -> u16 {
        self.ptt_lead_ms.load(Ordering::Relaxed)
    }

    pub fn ptt_tail_ms(&self) -> u16 {
        self.ptt_tail_ms.load(Ordering::Relaxed)
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn pin_config(&self) -> u8 {
        self.pin_config.load(Ordering::Relaxed)
    }

    // --- Setters (range-checked; each bumps the generation) ---

    checked_setter!(set_speed_wpm, speed_wpm, u8, Self::SPEED_MIN, Self::SPEED_MAX);
    checked_setter!(set_weight, weight, u8, Self::WEIGHT_MIN, Self::WEIGHT_MAX);
    checked_setter!(set_mem_window_start_pct, mem_window_start_pct, u8, 0, 100);
    checked_setter!(set_mem_window_end_pct, mem_window_end_pct, u8, 0, 100);
    checked_setter!(set_farnsworth_wpm, farnsworth_wpm, u8, 0, 100);
    checked_setter!(set_hscw_lpm, hscw_lpm, u8, 0, 255);
    checked_setter!(set_sidetone_hz, sidetone_hz, u16, 250, 4000);
    checked_setter!(set_tick_rate_hz, tick_rate_hz, u16, 1000, 10_000);
    checked_setter!(set_rt_max_lag, rt_max_lag, u16, 1, 1024);
    checked_setter!(set_ptt_lead_ms, ptt_lead_ms, u16, 0, 2000);
    checked_setter!(set_ptt_tail_ms, ptt_tail_ms, u16, 0, 2000);

    pub fn set_iambic_mode(&self, mode: IambicMode) {
        self.iambic_mode.store(mode as u8, Ordering::Relaxed);
        self.bump_generation();
    }

    pub fn set_memory_mode(&self, mode: MemoryMode) {
        self.memory_mode.store(mode as u8, Ordering::Relaxed);
        self.bump_generation();
    }

    pub fn set_squeeze_mode(&self, mode: SqueezeMode) {
        self.squeeze_mode.store(mode as u8, Ordering::Relaxed);
        self.bump_generation();
    }

    pub fn set_sidetone_enabled(&self, enabled: bool) {
        self.sidetone_enabled.store(enabled, Ordering::Relaxed);
        self.bump_generation();
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
        self.bump_generation();
    }

    pub fn set_pin_config(&self, bits: u8) {
        self.pin_config.store(bits, Ordering::Relaxed);
        self.bump_generation();
    }

    /// Coherent iambic snapshot for the RT tick.
    ///
    /// Re-reads until the generation is stable around the group, so the
    /// FSM never mixes fields from two writes.
    pub fn iambic_snapshot(&self) -> (IambicConfig, u16) {
        loop {
            let gen_before = self.generation();
            let snapshot = IambicConfig {
                wpm: self.speed_wpm() as u32,
                mode: self.iambic_mode(),
                memory: self.memory_mode(),
                squeeze: self.squeeze_mode(),
                weight: self.weight() as u32,
                mem_window_start_pct: self.mem_window_start_pct() as u32,
                mem_window_end_pct: self.mem_window_end_pct() as u32,
            };
            let gen_after = self.generation();
            if gen_before == gen_after {
                return (snapshot, gen_after);
            }
        }
    }
}

impl Default for KeyerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide configuration.
///
/// Const-initialized; never destroyed. Written by the host protocol and
/// shells, read each tick by the RT loop.
pub static CONFIG: KeyerConfig = KeyerConfig::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = KeyerConfig::new();
        assert_eq!(c.speed_wpm(), 25);
        assert_eq!(c.iambic_mode(), IambicMode::B);
        assert_eq!(c.memory_mode(), MemoryMode::DotAndDah);
        assert_eq!(c.squeeze_mode(), SqueezeMode::LatchOn);
        assert_eq!(c.weight(), 50);
        assert_eq!(c.mem_window_start_pct(), 60);
        assert_eq!(c.mem_window_end_pct(), 99);
        assert!(c.sidetone_enabled());
        assert_eq!(c.generation(), 0);
    }

    #[test]
    fn test_setters_bump_generation() {
        let c = KeyerConfig::new();

        c.set_speed_wpm(30).unwrap();
        assert_eq!(c.speed_wpm(), 30);
        assert_eq!(c.generation(), 1);

        c.set_iambic_mode(IambicMode::A);
        assert_eq!(c.generation(), 2);

        c.set_paused(true);
        assert!(c.paused());
        assert_eq!(c.generation(), 3);
    }

    #[test]
    fn test_range_guard() {
        let c = KeyerConfig::new();

        assert_eq!(
            c.set_speed_wpm(4),
            Err(ParamError::OutOfRange { min: 5, max: 100 })
        );
        assert_eq!(
            c.set_speed_wpm(101),
            Err(ParamError::OutOfRange { min: 5, max: 100 })
        );
        assert!(c.set_weight(32).is_err());
        assert!(c.set_weight(68).is_err());
        assert!(c.set_weight(33).is_ok());
        assert!(c.set_sidetone_hz(100).is_err());

        // Rejected writes leave the value and generation alone
        assert_eq!(c.speed_wpm(), 25);
    }

    #[test]
    fn test_iambic_snapshot_coherent() {
        let c = KeyerConfig::new();
        c.set_speed_wpm(40).unwrap();
        c.set_weight(60).unwrap();

        let (snap, generation) = c.iambic_snapshot();
        assert_eq!(snap.wpm, 40);
        assert_eq!(snap.weight, 60);
        assert_eq!(generation, c.generation());
    }
}
