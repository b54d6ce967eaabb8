//! # keyer-core
//!
//! Real-time signal core of the CW keyer: paddle input in, timestamped
//! key-down samples out, with host-protocol keying, Morse decoding, and
//! RT-safe diagnostics in between.
//!
//! ## Architecture
//!
//! All keying events flow through the [`SampleStream`]. Components are
//! isolated:
//! - Producers write to the stream and don't know who reads
//! - Consumers read from the stream and don't know who writes
//! - No callbacks across contexts, no shared state, no mutexes
//!
//! ```text
//! paddles ─▶ IambicKeyer ─▶ SampleStream ─▶ HardRtConsumer ─▶ TX/audio
//!                               │
//! host bytes ─▶ FrameParser ─▶ HostParser   BestEffortConsumer ─▶ decoder,
//!                  (remote)     (session)                         remote
//! ```
//!
//! The real-time context never blocks: every shared structure here is a
//! lock-free ring or a plain atomic. See ARCHITECTURE.md for the rules
//! the modules cite.

#![cfg_attr(not(test), no_std)]

pub mod classifier;
pub mod config;
pub mod consumer;
pub mod decoder;
pub mod fault;
pub mod frame;
pub mod host;
pub mod iambic;
pub mod log_drain;
pub mod log_globals;
pub mod logging;
pub mod morse;
pub mod sample;
pub mod stream;

pub use classifier::{ElementClass, TimingClassifier};
pub use config::{KeyerConfig, ParamError, PresetBank, CONFIG, PRESETS};
pub use consumer::{BestEffortConsumer, HardRtConsumer};
pub use decoder::{DecodedChar, MorseDecoder};
pub use fault::{FaultCode, FaultRegister, FAULT};
pub use frame::{FrameParser, FrameStatus};
pub use host::{ConfigHostHandler, HostHandler, HostParser};
pub use iambic::{IambicConfig, IambicKeyer, IambicMode};
pub use log_drain::LogDrain;
pub use log_globals::{BG_LOG, RT_LOG};
pub use logging::{LogLevel, LogRing};
pub use sample::{InputLines, KeySample, SampleFlags};
pub use stream::{SampleStream, SyncCell};

/// One-time startup: load the active preset into the live configuration.
///
/// All core statics are const-initialized; this is the only explicit
/// startup step, and it must run before the RT context starts ticking.
pub fn init() {
    PRESETS.apply_active(&CONFIG);
    log::info!(
        "keyer core ready: preset {} @ {} WPM",
        PRESETS
            .active_index
            .load(core::sync::atomic::Ordering::Relaxed),
        CONFIG.speed_wpm()
    );
}
