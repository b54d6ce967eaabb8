//! Iambic preset bank.
//!
//! Ten independently-editable preset slots plus an atomic active index.
//! Slots are plain per-field atomics so shells and the host protocol can
//! edit them while the RT path reads the active one; persistence layers
//! serialize them through the parameter registry.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::config::{KeyerConfig, ParamError};
use crate::iambic::{IambicConfig, IambicMode, MemoryMode, SqueezeMode};

/// Number of preset slots.
pub const PRESET_COUNT: usize = 10;

/// Preset name bound, bytes.
pub const NAME_LEN: usize = 16;

/// Fixed-width, byte-atomic name storage.
///
/// Each byte is individually atomic; a reader racing a writer may see a
/// mix of old and new names but never tears a byte. Last write wins.
pub struct AtomicName<const N: usize> {
    len: AtomicU8,
    bytes: [AtomicU8; N],
}

impl<const N: usize> AtomicName<N> {
    pub const fn new() -> Self {
        Self {
            len: AtomicU8::new(0),
            bytes: [const { AtomicU8::new(0) }; N],
        }
    }

    /// Bounded copy; truncates to the field width.
    pub fn set(&self, name: &str) {
        let bytes = name.as_bytes();
        let len = bytes.len().min(N);
        for (i, b) in bytes[..len].iter().enumerate() {
            self.bytes[i].store(*b, Ordering::Relaxed);
        }
        self.len.store(len as u8, Ordering::Release);
    }

    pub fn get(&self) -> heapless::String<N> {
        let len = (self.len.load(Ordering::Acquire) as usize).min(N);
        let mut s = heapless::String::new();
        for b in self.bytes[..len].iter() {
            let b = b.load(Ordering::Relaxed);
            // Names are ASCII; anything else renders as '?'
            let _ = s.push(if b.is_ascii() && b >= 0x20 { b as char } else { '?' });
        }
        s
    }

    pub fn clear(&self) {
        self.len.store(0, Ordering::Release);
    }
}

/// One preset slot.
///
/// Fields are public atomics so shells can edit them in place; the
/// accessors fold raw bytes back into enums.
pub struct IambicPreset {
    pub speed_wpm: AtomicU8,
    pub iambic_mode: AtomicU8,
    pub memory_mode: AtomicU8,
    pub squeeze_mode: AtomicU8,
    pub mem_window_start_pct: AtomicU8,
    pub mem_window_end_pct: AtomicU8,
    pub name: AtomicName<NAME_LEN>,
}

impl IambicPreset {
    /// Factory defaults: 25 WPM, Mode B, full memory, squeeze latch on,
    /// arming window 60-99%.
    pub const fn defaults() -> Self {
        Self {
            speed_wpm: AtomicU8::new(25),
            iambic_mode: AtomicU8::new(IambicMode::B as u8),
            memory_mode: AtomicU8::new(MemoryMode::DotAndDah as u8),
            squeeze_mode: AtomicU8::new(SqueezeMode::LatchOn as u8),
            mem_window_start_pct: AtomicU8::new(60),
            mem_window_end_pct: AtomicU8::new(99),
            name: AtomicName::new(),
        }
    }

    pub fn get_speed_wpm(&self) -> u8 {
        self.speed_wpm.load(Ordering::Relaxed)
    }

    pub fn get_iambic_mode(&self) -> IambicMode {
        IambicMode::try_from(self.iambic_mode.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn get_memory_mode(&self) -> MemoryMode {
        MemoryMode::try_from(self.memory_mode.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn get_squeeze_mode(&self) -> SqueezeMode {
        SqueezeMode::try_from(self.squeeze_mode.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn get_mem_start(&self) -> u8 {
        self.mem_window_start_pct.load(Ordering::Relaxed)
    }

    pub fn get_mem_end(&self) -> u8 {
        self.mem_window_end_pct.load(Ordering::Relaxed)
    }

    /// Snapshot into an FSM config (weight comes from the live config; it
    /// is a station-wide setting, not a per-preset one).
    pub fn snapshot(&self, weight: u8) -> IambicConfig {
        IambicConfig {
            wpm: self.get_speed_wpm() as u32,
            mode: self.get_iambic_mode(),
            memory: self.get_memory_mode(),
            squeeze: self.get_squeeze_mode(),
            weight: weight as u32,
            mem_window_start_pct: self.get_mem_start() as u32,
            mem_window_end_pct: self.get_mem_end() as u32,
        }
    }

    fn restore_defaults(&self) {
        self.speed_wpm.store(25, Ordering::Relaxed);
        self.iambic_mode.store(IambicMode::B as u8, Ordering::Relaxed);
        self.memory_mode
            .store(MemoryMode::DotAndDah as u8, Ordering::Relaxed);
        self.squeeze_mode
            .store(SqueezeMode::LatchOn as u8, Ordering::Relaxed);
        self.mem_window_start_pct.store(60, Ordering::Relaxed);
        self.mem_window_end_pct.store(99, Ordering::Relaxed);
        self.name.clear();
    }

    fn copy_from(&self, src: &IambicPreset) {
        self.speed_wpm
            .store(src.speed_wpm.load(Ordering::Relaxed), Ordering::Relaxed);
        self.iambic_mode
            .store(src.iambic_mode.load(Ordering::Relaxed), Ordering::Relaxed);
        self.memory_mode
            .store(src.memory_mode.load(Ordering::Relaxed), Ordering::Relaxed);
        self.squeeze_mode
            .store(src.squeeze_mode.load(Ordering::Relaxed), Ordering::Relaxed);
        self.mem_window_start_pct.store(
            src.mem_window_start_pct.load(Ordering::Relaxed),
            Ordering::Relaxed,
        );
        self.mem_window_end_pct.store(
            src.mem_window_end_pct.load(Ordering::Relaxed),
            Ordering::Relaxed,
        );
        self.name.set(src.name.get().as_str());
    }
}

/// The preset bank: fixed slots plus the active index.
pub struct PresetBank {
    pub presets: [IambicPreset; PRESET_COUNT],
    pub active_index: AtomicU32,
}

impl PresetBank {
    pub const fn new() -> Self {
        const SLOT: IambicPreset = IambicPreset::defaults();
        Self {
            presets: [SLOT; PRESET_COUNT],
            active_index: AtomicU32::new(0),
        }
    }

    /// Select the active preset. Out-of-range indices are ignored.
    pub fn activate(&self, index: u32) {
        if (index as usize) < PRESET_COUNT {
            self.active_index.store(index, Ordering::Release);
        } else {
            log::warn!("preset activate out of range: {index}");
        }
    }

    /// The active preset; a corrupted index clamps to the last slot.
    pub fn active(&self) -> &IambicPreset {
        let idx = (self.active_index.load(Ordering::Acquire) as usize).min(PRESET_COUNT - 1);
        &self.presets[idx]
    }

    pub fn get(&self, index: usize) -> Option<&IambicPreset> {
        self.presets.get(index)
    }

    /// Copy slot `src` over slot `dst`.
    pub fn copy(&self, src: usize, dst: usize) -> Result<(), ParamError> {
        if src >= PRESET_COUNT || dst >= PRESET_COUNT {
            return Err(ParamError::Unknown);
        }
        if src != dst {
            self.presets[dst].copy_from(&self.presets[src]);
        }
        Ok(())
    }

    /// Reinstate factory defaults for one slot.
    pub fn reset(&self, index: usize) -> Result<(), ParamError> {
        let preset = self.get(index).ok_or(ParamError::Unknown)?;
        preset.restore_defaults();
        log::info!("preset {index} reset to defaults");
        Ok(())
    }

    /// Bounded name write.
    pub fn set_name(&self, index: usize, name: &str) -> Result<(), ParamError> {
        let preset = self.get(index).ok_or(ParamError::Unknown)?;
        preset.name.set(name);
        Ok(())
    }

    /// Load the active preset into the live configuration.
    pub fn apply_active(&self, config: &KeyerConfig) {
        let p = self.active();
        // Preset values were range-checked on the way in; a failed set
        // here means a torn byte, so fall back to leaving that field.
        let _ = config.set_speed_wpm(p.get_speed_wpm());
        config.set_iambic_mode(p.get_iambic_mode());
        config.set_memory_mode(p.get_memory_mode());
        config.set_squeeze_mode(p.get_squeeze_mode());
        let _ = config.set_mem_window_start_pct(p.get_mem_start());
        let _ = config.set_mem_window_end_pct(p.get_mem_end());
    }
}

impl Default for PresetBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide preset bank.
pub static PRESETS: PresetBank = PresetBank::new();
