//! Module: sample
//!
//! Purpose: `KeySample` is the payload of the keying stream. One sample is
//! one time-slice (tick) of keyer state at a specific moment in time.
//!
//! Architecture:
//! - Compact Copy struct, time-aligned at the configured tick rate
//! - Silence is data: an unchanged run is represented explicitly by a
//!   single run-marker slot carrying the run length (RLE)
//! - Edge flags are computed by the producer against the previous sample
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

use bitflags::bitflags;

bitflags! {
    /// Per-sample markers.
    ///
    /// Multiple flags can be set simultaneously (bitwise OR).
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct SampleFlags: u8 {
        /// Input lines changed this tick (edge detected).
        const GPIO_EDGE  = 0x01;
        /// Local keying output changed this tick.
        const LOCAL_EDGE = 0x02;
        /// Silence-run marker: `idle_run` carries the run length.
        const IDLE_RUN   = 0x04;
    }
}

/// A single sample in the keying stream.
///
/// Every slot written to the ring is either a state change relative to the
/// previously emitted sample, or a silence-run marker with `idle_run > 0`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeySample {
    /// Raw input-line state (paddles and auxiliary lines).
    pub lines: InputLines,

    /// Keying output after iambic processing.
    ///
    /// `true` = key down (transmitting). Both local TX and remote
    /// consumers read this field.
    pub local_key: bool,

    /// Sidetone level with envelope applied, signed PCM.
    ///
    /// Produced downstream of the iambic FSM; the FSM itself emits 0.
    pub audio_level: i16,

    /// Edge and marker flags.
    pub flags: SampleFlags,

    /// Configuration generation captured at production time.
    ///
    /// Consumers detect config changes by comparing against their cached
    /// generation.
    pub config_gen: u16,

    /// Run length when `flags` contains `IDLE_RUN`, otherwise 0.
    pub idle_run: u32,
}

impl KeySample {
    /// All-zero sample, used for buffer initialization.
    pub const EMPTY: Self = Self {
        lines: InputLines::IDLE,
        local_key: false,
        audio_level: 0,
        flags: SampleFlags::empty(),
        config_gen: 0,
        idle_run: 0,
    };

    /// Build a silence-run marker covering `run` unchanged ticks.
    pub const fn silence(run: u32) -> Self {
        Self {
            lines: InputLines::IDLE,
            local_key: false,
            audio_level: 0,
            flags: SampleFlags::IDLE_RUN,
            config_gen: 0,
            idle_run: run,
        }
    }

    /// Producer-side change detection.
    ///
    /// Only `lines` and `local_key` participate: audio level and flags are
    /// derived fields and never trigger a slot write on their own.
    #[inline]
    pub fn has_change_from(&self, prev: &KeySample) -> bool {
        self.lines != prev.lines || self.local_key != prev.local_key
    }

    /// Attach edge flags by comparing against the previous emitted sample.
    #[inline]
    pub fn with_edges_from(mut self, prev: &KeySample) -> Self {
        if self.lines != prev.lines {
            self.flags |= SampleFlags::GPIO_EDGE;
        }
        if self.local_key != prev.local_key {
            self.flags |= SampleFlags::LOCAL_EDGE;
        }
        self
    }

    /// Check if this slot is a silence-run marker.
    #[inline]
    pub fn is_idle_run(&self) -> bool {
        self.flags.contains(SampleFlags::IDLE_RUN)
    }

    #[inline]
    pub fn has_gpio_edge(&self) -> bool {
        self.flags.contains(SampleFlags::GPIO_EDGE)
    }

    #[inline]
    pub fn has_local_edge(&self) -> bool {
        self.flags.contains(SampleFlags::LOCAL_EDGE)
    }
}

impl Default for KeySample {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Input-line state.
///
/// Physical paddle and auxiliary line inputs, one bit each.
///
/// Bit layout:
/// - Bit 0: DIT paddle
/// - Bit 1: DAH paddle
/// - Bit 2: straight key line
/// - Bit 3: auxiliary input
/// - Bits 4-7: reserved
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct InputLines(u8);

impl InputLines {
    /// DIT paddle bit mask (bit 0).
    pub const DIT: u8 = 0x01;

    /// DAH paddle bit mask (bit 1).
    pub const DAH: u8 = 0x02;

    /// Straight key line (bit 2).
    pub const STRAIGHT: u8 = 0x04;

    /// Auxiliary input line (bit 3).
    pub const AUX: u8 = 0x08;

    /// No lines active.
    pub const IDLE: Self = Self(0);

    /// Both paddles pressed (squeeze).
    pub const SQUEEZE: Self = Self(Self::DIT | Self::DAH);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Paddle state as (dit, dah) booleans.
    pub const fn paddles(dit: bool, dah: bool) -> Self {
        let mut bits = 0;
        if dit {
            bits |= Self::DIT;
        }
        if dah {
            bits |= Self::DAH;
        }
        Self(bits)
    }

    pub const fn dit(&self) -> bool {
        (self.0 & Self::DIT) != 0
    }

    pub const fn dah(&self) -> bool {
        (self.0 & Self::DAH) != 0
    }

    pub const fn straight(&self) -> bool {
        (self.0 & Self::STRAIGHT) != 0
    }

    pub const fn is_idle(&self) -> bool {
        self.0 == 0
    }

    /// Both paddles pressed.
    pub const fn squeezed(&self) -> bool {
        (self.0 & (Self::DIT | Self::DAH)) == (Self::DIT | Self::DAH)
    }

    pub const fn with_dit(self, pressed: bool) -> Self {
        if pressed {
            Self(self.0 | Self::DIT)
        } else {
            Self(self.0 & !Self::DIT)
        }
    }

    pub const fn with_dah(self, pressed: bool) -> Self {
        if pressed {
            Self(self.0 | Self::DAH)
        } else {
            Self(self.0 & !Self::DAH)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sample() {
        let s = KeySample::EMPTY;
        assert_eq!(s.lines, InputLines::IDLE);
        assert!(!s.local_key);
        assert_eq!(s.audio_level, 0);
        assert!(s.flags.is_empty());
        assert_eq!(s.idle_run, 0);
    }

    #[test]
    fn test_change_detection_fields() {
        let prev = KeySample::EMPTY;

        let mut s = KeySample::EMPTY;
        assert!(!s.has_change_from(&prev));

        // Audio level alone is not a change
        s.audio_level = 1000;
        assert!(!s.has_change_from(&prev));

        s.local_key = true;
        assert!(s.has_change_from(&prev));

        let mut s = KeySample::EMPTY;
        s.lines = InputLines::from_bits(InputLines::DIT);
        assert!(s.has_change_from(&prev));
    }

    #[test]
    fn test_edge_flags() {
        let prev = KeySample::EMPTY;

        let mut s = KeySample::EMPTY;
        s.local_key = true;
        let s = s.with_edges_from(&prev);
        assert!(s.has_local_edge());
        assert!(!s.has_gpio_edge());

        let mut s = KeySample::EMPTY;
        s.lines = InputLines::SQUEEZE;
        let s = s.with_edges_from(&prev);
        assert!(s.has_gpio_edge());
        assert!(!s.has_local_edge());
    }

    #[test]
    fn test_silence_marker() {
        let s = KeySample::silence(100);
        assert!(s.is_idle_run());
        assert_eq!(s.idle_run, 100);
    }

    #[test]
    fn test_input_lines() {
        let dit = InputLines::from_bits(InputLines::DIT);
        assert!(dit.dit());
        assert!(!dit.dah());
        assert!(!dit.squeezed());
        assert!(!dit.is_idle());

        let both = InputLines::SQUEEZE;
        assert!(both.dit());
        assert!(both.dah());
        assert!(both.squeezed());

        assert!(InputLines::IDLE.is_idle());

        let p = InputLines::paddles(true, false);
        assert_eq!(p, dit);
        let p = p.with_dah(true);
        assert!(p.squeezed());
        let p = p.with_dit(false);
        assert!(p.dah() && !p.dit());
    }

    #[test]
    fn test_straight_key_line() {
        let s = InputLines::from_bits(InputLines::STRAIGHT);
        assert!(s.straight());
        assert!(!s.dit());
        assert!(!s.squeezed());
    }
}
