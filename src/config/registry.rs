//! Parameter registry.
//!
//! One descriptor per configuration parameter: dotted name, value kind
//! with bounds, and get/set function pointers over the process-wide
//! statics. Shells, the host protocol glue, and persistence layers all go
//! through this table, so its short names double as the persisted key
//! layout.

use heapless::String;

use crate::config::{ParamError, CONFIG, PRESETS};
use crate::iambic::{IambicMode, MemoryMode, SqueezeMode};

/// Bound on string-valued parameters.
pub const STR_PARAM_LEN: usize = 16;

/// Parameter value kinds with their bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    U8 { min: u8, max: u8 },
    U16 { min: u16, max: u16 },
    Bool,
    /// Raw discriminant, 0..=max.
    Enum { max: u8 },
    /// Bounded string; setters truncate.
    Str { max_len: usize },
}

/// A parameter value in transit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamValue {
    U8(u8),
    U16(u16),
    Bool(bool),
    Str(String<STR_PARAM_LEN>),
}

impl ParamValue {
    /// Build a string value, truncating to the registry bound.
    pub fn str_truncated(s: &str) -> Self {
        let mut out = String::new();
        for c in s.chars() {
            if out.push(c).is_err() {
                break;
            }
        }
        ParamValue::Str(out)
    }
}

/// One registry entry.
pub struct ParamDescriptor {
    /// Short name, unique within the family; also the persisted key.
    pub name: &'static str,
    /// Dotted-path prefix.
    pub family: &'static str,
    pub kind: ParamKind,
    pub get: fn() -> ParamValue,
    pub set: fn(&ParamValue) -> Result<(), ParamError>,
}

impl ParamDescriptor {
    /// `family.name`, written into `out`.
    pub fn path(&self) -> String<32> {
        let mut s = String::new();
        let _ = s.push_str(self.family);
        let _ = s.push('.');
        let _ = s.push_str(self.name);
        s
    }
}

fn expect_u8(v: &ParamValue) -> Result<u8, ParamError> {
    match v {
        ParamValue::U8(n) => Ok(*n),
        _ => Err(ParamError::WrongKind),
    }
}

fn expect_u16(v: &ParamValue) -> Result<u16, ParamError> {
    match v {
        ParamValue::U16(n) => Ok(*n),
        // Widening a U8 is unambiguous
        ParamValue::U8(n) => Ok(*n as u16),
        _ => Err(ParamError::WrongKind),
    }
}

fn expect_bool(v: &ParamValue) -> Result<bool, ParamError> {
    match v {
        ParamValue::Bool(b) => Ok(*b),
        _ => Err(ParamError::WrongKind),
    }
}

fn expect_str(v: &ParamValue) -> Result<&str, ParamError> {
    match v {
        ParamValue::Str(s) => Ok(s.as_str()),
        _ => Err(ParamError::WrongKind),
    }
}

fn enum_guard(n: u8, max: u8) -> Result<u8, ParamError> {
    if n > max {
        Err(ParamError::OutOfRange {
            min: 0,
            max: max as u32,
        })
    } else {
        Ok(n)
    }
}

/// All registered parameters.
pub static PARAMS: &[ParamDescriptor] = &[
    ParamDescriptor {
        name: "speed_wpm",
        family: "keyer",
        kind: ParamKind::U8 { min: 5, max: 100 },
        get: || ParamValue::U8(CONFIG.speed_wpm()),
        set: |v| CONFIG.set_speed_wpm(expect_u8(v)?),
    },
    ParamDescriptor {
        name: "weight",
        family: "keyer",
        kind: ParamKind::U8 { min: 33, max: 67 },
        get: || ParamValue::U8(CONFIG.weight()),
        set: |v| CONFIG.set_weight(expect_u8(v)?),
    },
    ParamDescriptor {
        name: "iambic_mode",
        family: "keyer",
        kind: ParamKind::Enum { max: 1 },
        get: || ParamValue::U8(CONFIG.iambic_mode() as u8),
        set: |v| {
            let n = enum_guard(expect_u8(v)?, 1)?;
            CONFIG.set_iambic_mode(IambicMode::try_from(n).unwrap_or_default());
            Ok(())
        },
    },
    ParamDescriptor {
        name: "memory_mode",
        family: "keyer",
        kind: ParamKind::Enum { max: 3 },
        get: || ParamValue::U8(CONFIG.memory_mode() as u8),
        set: |v| {
            let n = enum_guard(expect_u8(v)?, 3)?;
            CONFIG.set_memory_mode(MemoryMode::try_from(n).unwrap_or_default());
            Ok(())
        },
    },
    ParamDescriptor {
        name: "squeeze_mode",
        family: "keyer",
        kind: ParamKind::Enum { max: 1 },
        get: || ParamValue::U8(CONFIG.squeeze_mode() as u8),
        set: |v| {
            let n = enum_guard(expect_u8(v)?, 1)?;
            CONFIG.set_squeeze_mode(SqueezeMode::try_from(n).unwrap_or_default());
            Ok(())
        },
    },
    ParamDescriptor {
        name: "mem_window_start_pct",
        family: "keyer",
        kind: ParamKind::U8 { min: 0, max: 100 },
        get: || ParamValue::U8(CONFIG.mem_window_start_pct()),
        set: |v| CONFIG.set_mem_window_start_pct(expect_u8(v)?),
    },
    ParamDescriptor {
        name: "mem_window_end_pct",
        family: "keyer",
        kind: ParamKind::U8 { min: 0, max: 100 },
        get: || ParamValue::U8(CONFIG.mem_window_end_pct()),
        set: |v| CONFIG.set_mem_window_end_pct(expect_u8(v)?),
    },
    ParamDescriptor {
        name: "farnsworth_wpm",
        family: "keyer",
        kind: ParamKind::U8 { min: 0, max: 100 },
        get: || ParamValue::U8(CONFIG.farnsworth_wpm()),
        set: |v| CONFIG.set_farnsworth_wpm(expect_u8(v)?),
    },
    ParamDescriptor {
        name: "hscw_lpm",
        family: "keyer",
        kind: ParamKind::U8 { min: 0, max: 255 },
        get: || ParamValue::U8(CONFIG.hscw_lpm()),
        set: |v| CONFIG.set_hscw_lpm(expect_u8(v)?),
    },
    ParamDescriptor {
        name: "sidetone_hz",
        family: "audio",
        kind: ParamKind::U16 { min: 250, max: 4000 },
        get: || ParamValue::U16(CONFIG.sidetone_hz()),
        set: |v| CONFIG.set_sidetone_hz(expect_u16(v)?),
    },
    ParamDescriptor {
        name: "sidetone_enabled",
        family: "audio",
        kind: ParamKind::Bool,
        get: || ParamValue::Bool(CONFIG.sidetone_enabled()),
        set: |v| {
            CONFIG.set_sidetone_enabled(expect_bool(v)?);
            Ok(())
        },
    },
    ParamDescriptor {
        name: "lead_ms",
        family: "ptt",
        kind: ParamKind::U16 { min: 0, max: 2000 },
        get: || ParamValue::U16(CONFIG.ptt_lead_ms()),
        set: |v| CONFIG.set_ptt_lead_ms(expect_u16(v)?),
    },
    ParamDescriptor {
        name: "tail_ms",
        family: "ptt",
        kind: ParamKind::U16 { min: 0, max: 2000 },
        get: || ParamValue::U16(CONFIG.ptt_tail_ms()),
        set: |v| CONFIG.set_ptt_tail_ms(expect_u16(v)?),
    },
    ParamDescriptor {
        name: "tick_rate_hz",
        family: "rt",
        kind: ParamKind::U16 { min: 1000, max: 10_000 },
        get: || ParamValue::U16(CONFIG.tick_rate_hz()),
        set: |v| CONFIG.set_tick_rate_hz(expect_u16(v)?),
    },
    ParamDescriptor {
        name: "max_lag",
        family: "rt",
        kind: ParamKind::U16 { min: 1, max: 1024 },
        get: || ParamValue::U16(CONFIG.rt_max_lag()),
        set: |v| CONFIG.set_rt_max_lag(expect_u16(v)?),
    },
    ParamDescriptor {
        name: "paused",
        family: "rt",
        kind: ParamKind::Bool,
        get: || ParamValue::Bool(CONFIG.paused()),
        set: |v| {
            CONFIG.set_paused(expect_bool(v)?);
            Ok(())
        },
    },
    ParamDescriptor {
        name: "pin_config",
        family: "rt",
        kind: ParamKind::U8 { min: 0, max: 255 },
        get: || ParamValue::U8(CONFIG.pin_config()),
        set: |v| {
            CONFIG.set_pin_config(expect_u8(v)?);
            Ok(())
        },
    },
    ParamDescriptor {
        name: "active",
        family: "preset",
        kind: ParamKind::U8 { min: 0, max: 9 },
        get: || ParamValue::U8(PRESETS.active_index.load(core::sync::atomic::Ordering::Relaxed) as u8),
        set: |v| {
            let n = expect_u8(v)?;
            if n as usize >= crate::config::presets::PRESET_COUNT {
                return Err(ParamError::OutOfRange { min: 0, max: 9 });
            }
            PRESETS.activate(n as u32);
            Ok(())
        },
    },
    ParamDescriptor {
        name: "name",
        family: "preset",
        kind: ParamKind::Str { max_len: STR_PARAM_LEN },
        get: || {
            let mut s = String::new();
            let _ = s.push_str(PRESETS.active().name.get().as_str());
            ParamValue::Str(s)
        },
        set: |v| {
            let idx = PRESETS.active_index.load(core::sync::atomic::Ordering::Relaxed) as usize;
            PRESETS.set_name(idx.min(crate::config::presets::PRESET_COUNT - 1), expect_str(v)?)
        },
    },
];

/// Look up a parameter by dotted path (`keyer.speed_wpm`) or short name
/// (`speed_wpm`). Short names match the first family that defines them.
pub fn find_param(path: &str) -> Option<&'static ParamDescriptor> {
    if let Some((family, name)) = path.split_once('.') {
        PARAMS
            .iter()
            .find(|p| p.family == family && p.name == name)
    } else {
        PARAMS.iter().find(|p| p.name == path)
    }
}
