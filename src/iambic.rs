//! Iambic keyer finite state machine.
//!
//! Pure logic, no hardware dependencies. Consumes paddle line state,
//! produces keying output. Fully testable on host.
//!
//! # Iambic Modes
//!
//! - **Mode A**: stops when the paddles are released
//! - **Mode B**: completes the current element plus one more when a
//!   squeeze is released mid-element
//!
//! # Memory
//!
//! A paddle tapped while the opposite element is playing can be remembered
//! and played after the element's gap. Arming is gated to a window of the
//! element's elapsed time so early contact bounce is ignored while late,
//! deliberate presses are admitted.

use num_enum::TryFromPrimitive;

use crate::sample::{InputLines, KeySample, SampleFlags};

/// Iambic keyer mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, TryFromPrimitive)]
#[repr(u8)]
pub enum IambicMode {
    /// Mode A: stop when paddles released.
    A = 0,
    /// Mode B: one bonus element after a squeeze release.
    #[default]
    B = 1,
}

/// Which paddles participate in element memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, TryFromPrimitive)]
#[repr(u8)]
pub enum MemoryMode {
    None = 0,
    DotOnly = 1,
    DahOnly = 2,
    #[default]
    DotAndDah = 3,
}

impl MemoryMode {
    #[inline]
    pub const fn dit_enabled(self) -> bool {
        matches!(self, MemoryMode::DotOnly | MemoryMode::DotAndDah)
    }

    #[inline]
    pub const fn dah_enabled(self) -> bool {
        matches!(self, MemoryMode::DahOnly | MemoryMode::DotAndDah)
    }
}

/// Squeeze bookkeeping discipline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, TryFromPrimitive)]
#[repr(u8)]
pub enum SqueezeMode {
    /// `squeeze_seen` mirrors the live both-pressed level; a transient
    /// squeeze released before the element boundary yields no bonus.
    LatchOff = 0,
    /// A squeeze rising edge latches until consumed.
    #[default]
    LatchOn = 1,
}

/// Keying element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Element {
    Dit,
    Dah,
}

impl Element {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Element::Dit => Element::Dah,
            Element::Dah => Element::Dit,
        }
    }
}

/// FSM state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    SendDit,
    SendDah,
    Gap,
}

/// Iambic keyer configuration snapshot.
///
/// Read by value from the atomic configuration at tick boundaries; the FSM
/// never touches shared state mid-element.
#[derive(Clone, Copy, Debug)]
pub struct IambicConfig {
    /// Speed in words per minute, PARIS timing (5-100).
    pub wpm: u32,

    /// Iambic mode (A or B).
    pub mode: IambicMode,

    /// Element memory participation.
    pub memory: MemoryMode,

    /// Squeeze latch discipline.
    pub squeeze: SqueezeMode,

    /// Mark/space duty weight in percent (33-67, 50 = classic 1:3).
    pub weight: u32,

    /// Memory arming window start, percent of element elapsed (0-100).
    pub mem_window_start_pct: u32,

    /// Memory arming window end, percent of element elapsed (0-100).
    pub mem_window_end_pct: u32,
}

impl Default for IambicConfig {
    fn default() -> Self {
        Self {
            wpm: 25,
            mode: IambicMode::B,
            memory: MemoryMode::DotAndDah,
            squeeze: SqueezeMode::LatchOn,
            weight: 50,
            mem_window_start_pct: 60,
            mem_window_end_pct: 99,
        }
    }
}

impl IambicConfig {
    /// Config for a given WPM with default settings.
    pub fn with_wpm(wpm: u32) -> Self {
        Self {
            wpm,
            ..Default::default()
        }
    }

    /// Dit unit in microseconds.
    ///
    /// PARIS timing: dit = 1.2 s / WPM.
    #[inline]
    pub fn dit_unit_us(&self) -> i64 {
        1_200_000 / self.wpm as i64
    }

    /// Weighted dit mark duration.
    ///
    /// `dit * w/50`: at w=50 this is exactly one dit unit. The element
    /// pair (mark + gap) always totals two units, so weight never changes
    /// the effective WPM.
    #[inline]
    pub fn dit_mark_us(&self) -> i64 {
        self.dit_unit_us() * self.weight as i64 / 50
    }

    /// Weighted dah mark duration.
    ///
    /// `dit * (100+w)/50`: three units at w=50; the dah pair totals four
    /// units regardless of weight.
    #[inline]
    pub fn dah_mark_us(&self) -> i64 {
        self.dit_unit_us() * (100 + self.weight as i64) / 50
    }

    /// Weighted inter-element gap.
    ///
    /// `dit * (100-w)/50`: one unit at w=50, complementary to the mark
    /// stretch so pair totals stay fixed.
    #[inline]
    pub fn gap_us(&self) -> i64 {
        self.dit_unit_us() * (100 - self.weight as i64) / 50
    }

    #[inline]
    pub fn mark_us(&self, element: Element) -> i64 {
        match element {
            Element::Dit => self.dit_mark_us(),
            Element::Dah => self.dah_mark_us(),
        }
    }
}

/// Iambic keyer processor.
///
/// Converts paddle line state into keying output, one tick at a time.
///
/// # Example
///
/// ```
/// use keyer_core::iambic::{IambicConfig, IambicKeyer};
/// use keyer_core::sample::InputLines;
///
/// let mut keyer = IambicKeyer::new(IambicConfig::with_wpm(25));
///
/// let sample = keyer.tick(0, InputLines::paddles(true, false));
/// assert!(sample.local_key); // dit started
/// ```
pub struct IambicKeyer {
    config: IambicConfig,

    // FSM state
    state: State,
    element_start_us: i64,
    element_end_us: i64,
    last_element: Element,

    // Paddle levels, previous tick's levels for edge detection
    dit_pressed: bool,
    dah_pressed: bool,
    prev_dit: bool,
    prev_dah: bool,

    // Memory flags
    dit_memory: bool,
    dah_memory: bool,

    // Squeeze tracking for Mode B
    squeeze_seen: bool,

    // Output
    key_down: bool,
}

impl IambicKeyer {
    pub fn new(config: IambicConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            element_start_us: 0,
            element_end_us: 0,
            // Start opposite-of-dit so a first squeeze leads with a dit
            last_element: Element::Dah,
            dit_pressed: false,
            dah_pressed: false,
            prev_dit: false,
            prev_dah: false,
            dit_memory: false,
            dah_memory: false,
            squeeze_seen: false,
            key_down: false,
        }
    }

    /// Replace the configuration (applied from the next element on).
    pub fn set_config(&mut self, config: IambicConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &IambicConfig {
        &self.config
    }

    /// Tick the FSM and produce the output sample.
    ///
    /// `now_us` is the current timestamp; `lines` the raw input state.
    /// The emitted sample carries the keying decision; audio level and
    /// config generation are filled downstream.
    #[inline]
    pub fn tick(&mut self, now_us: i64, lines: InputLines) -> KeySample {
        self.update_paddles(now_us, lines);

        // Chain expired states: a tick landing on or past a boundary must
        // settle on the state the schedule prescribes for `now_us`, so a
        // held squeeze never loses an element to tick granularity.
        loop {
            match self.state {
                State::Idle => {
                    self.tick_idle(now_us);
                    break;
                }
                State::SendDit => {
                    if !self.tick_sending(now_us, Element::Dit) {
                        break;
                    }
                }
                State::SendDah => {
                    if !self.tick_sending(now_us, Element::Dah) {
                        break;
                    }
                }
                State::Gap => {
                    if now_us >= self.element_end_us {
                        self.state = State::Idle;
                    } else {
                        break;
                    }
                }
            }
        }

        KeySample {
            lines,
            local_key: self.key_down,
            audio_level: 0,
            flags: SampleFlags::empty(),
            config_gen: 0,
            idle_run: 0,
        }
    }

    #[inline]
    pub fn is_key_down(&self) -> bool {
        self.key_down
    }

    /// Reset to idle, dropping memories and any element in flight.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.element_start_us = 0;
        self.element_end_us = 0;
        self.dit_memory = false;
        self.dah_memory = false;
        self.squeeze_seen = false;
        self.key_down = false;
    }

    // --- Private ---

    fn update_paddles(&mut self, now_us: i64, lines: InputLines) {
        self.prev_dit = self.dit_pressed;
        self.prev_dah = self.dah_pressed;
        self.dit_pressed = lines.dit();
        self.dah_pressed = lines.dah();

        let was_squeeze = self.prev_dit && self.prev_dah;
        let is_squeeze = self.dit_pressed && self.dah_pressed;

        match self.config.squeeze {
            SqueezeMode::LatchOn => {
                if is_squeeze && !was_squeeze {
                    self.squeeze_seen = true;
                }
            }
            SqueezeMode::LatchOff => {
                self.squeeze_seen = is_squeeze;
            }
        }

        // Memory arming: a paddle newly pressed while the opposite element
        // plays, inside the arming window; any new press during the gap.
        let new_dit = self.dit_pressed && !self.prev_dit;
        let new_dah = self.dah_pressed && !self.prev_dah;

        match self.state {
            State::SendDah if new_dit && self.config.memory.dit_enabled() => {
                if self.in_memory_window(now_us) {
                    self.dit_memory = true;
                }
            }
            State::SendDit if new_dah && self.config.memory.dah_enabled() => {
                if self.in_memory_window(now_us) {
                    self.dah_memory = true;
                }
            }
            State::Gap => {
                if new_dit && self.config.memory.dit_enabled() {
                    self.dit_memory = true;
                }
                if new_dah && self.config.memory.dah_enabled() {
                    self.dah_memory = true;
                }
            }
            _ => {}
        }
    }

    /// Elapsed fraction of the current mark inside [start%, end%].
    fn in_memory_window(&self, now_us: i64) -> bool {
        let total = self.element_end_us - self.element_start_us;
        if total <= 0 {
            return false;
        }
        let elapsed = now_us - self.element_start_us;
        let pct = (elapsed.clamp(0, total) * 100 / total) as u32;
        pct >= self.config.mem_window_start_pct && pct <= self.config.mem_window_end_pct
    }

    fn tick_idle(&mut self, now_us: i64) {
        if let Some(element) = self.decide_next_element() {
            self.start_element(element, now_us);
        }
    }

    /// Returns true when the mark expired and the FSM moved on.
    fn tick_sending(&mut self, now_us: i64, element: Element) -> bool {
        if now_us < self.element_end_us {
            return false;
        }

        self.key_down = false;
        self.last_element = element;

        // Gap runs from the scheduled mark end, not from this tick
        self.state = State::Gap;
        self.element_start_us = self.element_end_us;
        self.element_end_us += self.config.gap_us();
        true
    }

    fn decide_next_element(&mut self) -> Option<Element> {
        // Priority 1: armed memory
        if self.dit_memory {
            self.dit_memory = false;
            return Some(Element::Dit);
        }
        if self.dah_memory {
            self.dah_memory = false;
            return Some(Element::Dah);
        }

        // Priority 2: Mode B bonus after a squeeze release
        if self.config.mode == IambicMode::B
            && self.squeeze_seen
            && !(self.dit_pressed && self.dah_pressed)
        {
            self.squeeze_seen = false;
            return Some(self.last_element.opposite());
        }

        // Priority 3: live paddle state
        match (self.dit_pressed, self.dah_pressed) {
            // Squeeze: alternate from the last element
            (true, true) => Some(self.last_element.opposite()),
            (true, false) => Some(Element::Dit),
            (false, true) => Some(Element::Dah),
            (false, false) => {
                self.squeeze_seen = false;
                None
            }
        }
    }

    fn start_element(&mut self, element: Element, now_us: i64) {
        self.key_down = true;
        // Capture the squeeze state at element start
        if self.config.squeeze == SqueezeMode::LatchOn && self.dit_pressed && self.dah_pressed {
            self.squeeze_seen = true;
        }

        self.state = match element {
            Element::Dit => State::SendDit,
            Element::Dah => State::SendDah,
        };

        self.element_start_us = now_us;
        self.element_end_us = now_us + self.config.mark_us(element);
    }
}
