//! Host wire-protocol parser.
//!
//! Byte-oriented state machine for the host keying link. Command bytes
//! occupy 0x00-0x1F, printable text 0x20-0x7F; anything else is ignored
//! outside a parameter exchange. The ADMIN command (0x00) introduces a
//! sub-command byte; other commands take zero, one, or two parameter
//! bytes.
//!
//! Callbacks are a capability set: [`HostHandler`] methods all default to
//! no-ops, so a host wires only what it implements. Until the session is
//! opened (ADMIN HOST_OPEN) parameter bytes are still consumed — the
//! parser must stay in lockstep with the byte stream — but no callbacks
//! fire.

use num_enum::TryFromPrimitive;

use crate::config::KeyerConfig;
use crate::sample::{InputLines, KeySample, SampleFlags};
use crate::stream::SampleStream;

/// Protocol version reported on HOST_OPEN.
pub const PROTOCOL_VERSION: u8 = 23;

/// First text byte; everything below is command space.
const TEXT_BASE: u8 = 0x20;
/// Last byte delivered as text.
const TEXT_MAX: u8 = 0x7F;

/// Host commands (0x00-0x1F).
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum HostCommand {
    Admin = 0x00,
    Sidetone = 0x01,
    Speed = 0x02,
    Weight = 0x03,
    PttTiming = 0x04,
    SpeedPot = 0x05,
    Pause = 0x06,
    GetSpeedPot = 0x07,
    Backspace = 0x08,
    PinConfig = 0x09,
    ClearBuffer = 0x0A,
    KeyImmediate = 0x0B,
    HscwSpeed = 0x0C,
    Farnsworth = 0x0D,
    Mode = 0x0E,
    LoadDefaults = 0x0F,
}

impl HostCommand {
    /// Parameter bytes following the command byte.
    pub fn param_count(self) -> u8 {
        match self {
            HostCommand::ClearBuffer
            | HostCommand::Backspace
            | HostCommand::GetSpeedPot
            | HostCommand::LoadDefaults => 0,
            HostCommand::PttTiming => 2,
            // Admin is handled through its sub-command state
            HostCommand::Admin => 0,
            _ => 1,
        }
    }
}

/// ADMIN sub-commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum AdminSub {
    Calibrate = 0x00,
    Reset = 0x01,
    HostOpen = 0x02,
    HostClose = 0x03,
    Echo = 0x04,
    GetStatus = 0x05,
    GetVersion = 0x06,
}

/// Parser states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    AdminWaitSub,
    WaitParam1,
    WaitParam2,
}

/// Host capability set.
///
/// Every method defaults to a no-op; implement what the platform wires.
/// `respond` carries protocol replies (version byte, echo) back toward
/// the host transport.
pub trait HostHandler {
    fn on_speed(&mut self, _wpm: u8) {}
    fn on_sidetone(&mut self, _code: u8) {}
    fn on_weight(&mut self, _weight: u8) {}
    fn on_ptt_timing(&mut self, _lead: u8, _tail: u8) {}
    fn on_speed_pot(&mut self, _value: u8) {}
    fn on_pause(&mut self, _paused: bool) {}
    fn on_pin_config(&mut self, _bits: u8) {}
    fn on_key_immediate(&mut self, _down: bool) {}
    fn on_hscw_speed(&mut self, _lpm: u8) {}
    fn on_farnsworth(&mut self, _wpm: u8) {}
    fn on_mode(&mut self, _bits: u8) {}
    fn on_text(&mut self, _ch: u8) {}
    fn on_clear_buffer(&mut self) {}
    fn on_backspace(&mut self) {}
    fn on_get_speed_pot(&mut self) {}
    fn on_load_defaults(&mut self) {}
    fn on_reset(&mut self) {}
    fn respond(&mut self, _byte: u8) {}
}

/// Byte-level host protocol parser.
pub struct HostParser {
    state: State,
    cmd: HostCommand,
    param1: u8,
    echo_pending: bool,
    session_open: bool,
}

impl Default for HostParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HostParser {
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            cmd: HostCommand::Admin,
            param1: 0,
            echo_pending: false,
            session_open: false,
        }
    }

    /// Whether HOST_OPEN has executed.
    pub fn session_open(&self) -> bool {
        self.session_open
    }

    /// Back to power-on state: idle, session closed.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feed one byte from the host.
    pub fn feed<H: HostHandler + ?Sized>(&mut self, byte: u8, handler: &mut H) {
        match self.state {
            State::Idle => self.feed_idle(byte, handler),
            State::AdminWaitSub => self.feed_admin_sub(byte, handler),
            State::WaitParam1 => self.feed_param1(byte, handler),
            State::WaitParam2 => self.feed_param2(byte, handler),
        }
    }

    /// Feed a whole buffer.
    pub fn feed_slice<H: HostHandler + ?Sized>(&mut self, bytes: &[u8], handler: &mut H) {
        for &b in bytes {
            self.feed(b, handler);
        }
    }

    fn feed_idle<H: HostHandler + ?Sized>(&mut self, byte: u8, handler: &mut H) {
        match byte {
            0x00 => self.state = State::AdminWaitSub,
            0x01..=0x1F => {
                let Ok(cmd) = HostCommand::try_from(byte) else {
                    // Unassigned command byte: ignore, stay in lockstep
                    return;
                };
                if cmd.param_count() == 0 {
                    if self.session_open {
                        Self::dispatch_zero(cmd, handler);
                    }
                } else {
                    self.cmd = cmd;
                    self.state = State::WaitParam1;
                }
            }
            TEXT_BASE..=TEXT_MAX => {
                if self.session_open {
                    handler.on_text(byte);
                }
            }
            _ => {} // >= 0x80 ignored in idle
        }
    }

    fn feed_admin_sub<H: HostHandler + ?Sized>(&mut self, byte: u8, handler: &mut H) {
        self.state = State::Idle;
        match AdminSub::try_from(byte) {
            Ok(AdminSub::HostOpen) => {
                self.session_open = true;
                handler.respond(PROTOCOL_VERSION);
            }
            Ok(AdminSub::HostClose) => self.session_open = false,
            Ok(AdminSub::Reset) => {
                self.session_open = false;
                handler.on_reset();
            }
            Ok(AdminSub::Echo) => {
                self.echo_pending = true;
                self.state = State::WaitParam1;
            }
            // Recognized, acknowledged silently
            Ok(AdminSub::Calibrate) | Ok(AdminSub::GetStatus) | Ok(AdminSub::GetVersion) => {}
            Err(_) => {}
        }
    }

    fn feed_param1<H: HostHandler + ?Sized>(&mut self, byte: u8, handler: &mut H) {
        if self.echo_pending {
            self.echo_pending = false;
            self.state = State::Idle;
            handler.respond(byte);
            return;
        }

        if self.cmd.param_count() == 2 {
            self.param1 = byte;
            self.state = State::WaitParam2;
            return;
        }

        self.state = State::Idle;
        if self.session_open {
            Self::dispatch_one(self.cmd, byte, handler);
        }
    }

    fn feed_param2<H: HostHandler + ?Sized>(&mut self, byte: u8, handler: &mut H) {
        self.state = State::Idle;
        if self.session_open {
            // PTT timing is the only two-parameter command
            handler.on_ptt_timing(self.param1, byte);
        }
    }

    fn dispatch_zero<H: HostHandler + ?Sized>(cmd: HostCommand, handler: &mut H) {
        match cmd {
            HostCommand::ClearBuffer => handler.on_clear_buffer(),
            HostCommand::Backspace => handler.on_backspace(),
            HostCommand::GetSpeedPot => handler.on_get_speed_pot(),
            HostCommand::LoadDefaults => handler.on_load_defaults(),
            _ => {}
        }
    }

    fn dispatch_one<H: HostHandler + ?Sized>(cmd: HostCommand, byte: u8, handler: &mut H) {
        match cmd {
            HostCommand::Sidetone => handler.on_sidetone(byte),
            HostCommand::Speed => handler.on_speed(byte),
            HostCommand::Weight => handler.on_weight(byte),
            HostCommand::SpeedPot => handler.on_speed_pot(byte),
            HostCommand::Pause => handler.on_pause(byte != 0),
            HostCommand::PinConfig => handler.on_pin_config(byte),
            HostCommand::KeyImmediate => handler.on_key_immediate(byte != 0),
            HostCommand::HscwSpeed => handler.on_hscw_speed(byte),
            HostCommand::Farnsworth => handler.on_farnsworth(byte),
            HostCommand::Mode => handler.on_mode(byte),
            _ => {}
        }
    }
}

/// Host handler wired to the live configuration and sample stream.
///
/// Speed/weight/mode/sidetone/PTT land in the atomic config; key-immediate
/// becomes an uncompressed sample so the key state change is visible to
/// every consumer on the next read. Rejected values are logged and
/// dropped — the host link has no NAK.
pub struct ConfigHostHandler<'a> {
    config: &'a KeyerConfig,
    stream: &'a SampleStream,
    /// Response bytes queued for the transport to pick up.
    pub response: heapless::Deque<u8, 16>,
}

impl<'a> ConfigHostHandler<'a> {
    pub fn new(config: &'a KeyerConfig, stream: &'a SampleStream) -> Self {
        Self {
            config,
            stream,
            response: heapless::Deque::new(),
        }
    }

    /// Pop the next queued response byte for the transport.
    pub fn pop_response(&mut self) -> Option<u8> {
        self.response.pop_front()
    }
}

impl HostHandler for ConfigHostHandler<'_> {
    fn on_speed(&mut self, wpm: u8) {
        if let Err(e) = self.config.set_speed_wpm(wpm) {
            log::warn!("host speed {wpm} rejected: {e}");
        }
    }

    fn on_sidetone(&mut self, code: u8) {
        // Legacy host convention: the low nibble n selects 4000/n Hz,
        // n = 0 mutes the sidetone.
        let n = (code & 0x0F) as u16;
        if n == 0 {
            self.config.set_sidetone_enabled(false);
            return;
        }
        self.config.set_sidetone_enabled(true);
        if let Err(e) = self.config.set_sidetone_hz(4000 / n) {
            log::warn!("host sidetone {code:#04x} rejected: {e}");
        }
    }

    fn on_weight(&mut self, weight: u8) {
        if let Err(e) = self.config.set_weight(weight) {
            log::warn!("host weight {weight} rejected: {e}");
        }
    }

    fn on_ptt_timing(&mut self, lead: u8, tail: u8) {
        // Host units are 10 ms steps
        let _ = self.config.set_ptt_lead_ms(lead as u16 * 10);
        let _ = self.config.set_ptt_tail_ms(tail as u16 * 10);
    }

    fn on_pause(&mut self, paused: bool) {
        self.config.set_paused(paused);
    }

    fn on_pin_config(&mut self, bits: u8) {
        self.config.set_pin_config(bits);
    }

    fn on_mode(&mut self, bits: u8) {
        use crate::iambic::IambicMode;
        // Bit 4 selects Mode A
        let mode = if bits & 0x10 != 0 {
            IambicMode::A
        } else {
            IambicMode::B
        };
        self.config.set_iambic_mode(mode);
    }

    fn on_farnsworth(&mut self, wpm: u8) {
        if let Err(e) = self.config.set_farnsworth_wpm(wpm) {
            log::warn!("host farnsworth {wpm} rejected: {e}");
        }
    }

    fn on_hscw_speed(&mut self, lpm: u8) {
        let _ = self.config.set_hscw_lpm(lpm);
    }

    fn on_key_immediate(&mut self, down: bool) {
        let sample = KeySample {
            lines: InputLines::IDLE,
            local_key: down,
            audio_level: 0,
            flags: SampleFlags::empty(),
            config_gen: self.config.generation(),
            idle_run: 0,
        };
        self.stream.push_raw(sample);
    }

    fn respond(&mut self, byte: u8) {
        if self.response.push_back(byte).is_err() {
            log::warn!("host response queue full, byte {byte:#04x} dropped");
        }
    }
}
