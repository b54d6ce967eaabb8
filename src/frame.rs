//! Length-prefixed streaming frame parser.
//!
//! Wire format: one command byte, an optional length field, then the
//! payload. The top two bits of the command byte select the length
//! encoding, the low six bits are the frame type:
//!
//! ```text
//! 00cc cccc                    no payload
//! 01cc cccc  LL                1-byte length
//! 10cc cccc  LL LL             2-byte little-endian length
//! 11cc cccc                    reserved -> error
//! ```
//!
//! The parser accepts arbitrarily-sized chunks: for a well-formed byte
//! sequence, whole-buffer and byte-by-byte feeding produce identical
//! frames. Payloads that arrive contiguously in one chunk are returned
//! zero-copy out of the caller's buffer; fragmented payloads are
//! reassembled in a fixed 256-byte internal buffer.

/// Reassembly buffer size; fragmented payloads beyond this error out.
pub const REASSEMBLY_CAPACITY: usize = 256;

/// Frame type ids (low six bits of the command byte).
pub mod frame_type {
    /// Remote key state change.
    pub const KEY_STATE: u8 = 0x01;
    /// Text to be keyed.
    pub const TEXT: u8 = 0x02;
    /// Link liveness probe.
    pub const PING: u8 = 0x03;
    /// Configuration update blob.
    pub const CONFIG: u8 = 0x04;
}

/// Length-field encoding from the command byte's top two bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LengthCategory {
    NoPayload,
    Short,
    Long,
}

/// Frame parse errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// Command byte carried the reserved length category (0b11).
    Reserved,
    /// Fragmented payload larger than the reassembly buffer.
    Oversize,
}

/// A complete frame.
///
/// `payload` borrows either the caller's chunk (zero-copy) or the
/// parser's reassembly buffer; copy it out before the next feed.
#[derive(Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Frame type (0x00-0x3F).
    pub command: u8,
    pub payload: &'a [u8],
    /// Total wire bytes of this frame, header included.
    pub frame_len: usize,
}

/// Outcome of one feed call.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameStatus<'a> {
    /// A frame completed at `consumed`.
    Complete(Frame<'a>),
    /// Input exhausted mid-frame; feed more.
    NeedMore,
    /// Parse error; `reset()` before continuing.
    Error(FrameError),
}

/// Result of feeding a chunk: how far the caller should advance, and what
/// happened there.
#[derive(Debug, PartialEq, Eq)]
pub struct FeedResult<'a> {
    /// Bytes of the input chunk consumed by this call.
    pub consumed: usize,
    pub status: FrameStatus<'a>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Command,
    Len1,
    Len2,
    Payload,
}

/// Streaming deframer.
pub struct FrameParser {
    state: State,
    command: u8,
    category: LengthCategory,
    expected: usize,
    received: usize,
    buf: [u8; REASSEMBLY_CAPACITY],
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub const fn new() -> Self {
        Self {
            state: State::Command,
            command: 0,
            category: LengthCategory::NoPayload,
            expected: 0,
            received: 0,
            buf: [0; REASSEMBLY_CAPACITY],
        }
    }

    /// Discard any partial frame.
    pub fn reset(&mut self) {
        self.state = State::Command;
        self.expected = 0;
        self.received = 0;
    }

    /// Consume bytes from `input` until a frame completes, an error
    /// occurs, or the chunk runs out. At most one frame per call; the
    /// caller advances by `consumed` and re-invokes on the remainder.
    pub fn feed<'a>(&'a mut self, input: &'a [u8]) -> FeedResult<'a> {
        let mut i = 0;

        while i < input.len() {
            match self.state {
                State::Command => {
                    let byte = input[i];
                    i += 1;

                    self.command = byte & 0x3F;
                    self.received = 0;
                    match byte >> 6 {
                        0b00 => {
                            return FeedResult {
                                consumed: i,
                                status: FrameStatus::Complete(Frame {
                                    command: self.command,
                                    payload: &[],
                                    frame_len: 1,
                                }),
                            };
                        }
                        0b01 => {
                            self.category = LengthCategory::Short;
                            self.state = State::Len1;
                        }
                        0b10 => {
                            self.category = LengthCategory::Long;
                            self.state = State::Len1;
                        }
                        _ => {
                            self.reset();
                            return FeedResult {
                                consumed: i,
                                status: FrameStatus::Error(FrameError::Reserved),
                            };
                        }
                    }
                }

                State::Len1 => {
                    self.expected = input[i] as usize;
                    i += 1;
                    match self.category {
                        LengthCategory::Short => {
                            if self.expected == 0 {
                                self.state = State::Command;
                                return FeedResult {
                                    consumed: i,
                                    status: FrameStatus::Complete(Frame {
                                        command: self.command,
                                        payload: &[],
                                        frame_len: 2,
                                    }),
                                };
                            }
                            self.state = State::Payload;
                        }
                        _ => self.state = State::Len2,
                    }
                }

                State::Len2 => {
                    self.expected |= (input[i] as usize) << 8;
                    i += 1;
                    if self.expected == 0 {
                        self.state = State::Command;
                        return FeedResult {
                            consumed: i,
                            status: FrameStatus::Complete(Frame {
                                command: self.command,
                                payload: &[],
                                frame_len: 3,
                            }),
                        };
                    }
                    self.state = State::Payload;
                }

                State::Payload => {
                    let header_len = match self.category {
                        LengthCategory::NoPayload => 1,
                        LengthCategory::Short => 2,
                        LengthCategory::Long => 3,
                    };
                    let remaining = self.expected - self.received;
                    let available = input.len() - i;

                    if self.received == 0 && available >= remaining {
                        // Whole payload contiguous in this chunk: zero-copy
                        let payload = &input[i..i + remaining];
                        i += remaining;
                        self.state = State::Command;
                        return FeedResult {
                            consumed: i,
                            status: FrameStatus::Complete(Frame {
                                command: self.command,
                                payload,
                                frame_len: header_len + self.expected,
                            }),
                        };
                    }

                    // Fragmented: reassemble in the internal buffer
                    if self.expected > REASSEMBLY_CAPACITY {
                        self.reset();
                        return FeedResult {
                            consumed: i,
                            status: FrameStatus::Error(FrameError::Oversize),
                        };
                    }

                    let take = remaining.min(available);
                    self.buf[self.received..self.received + take]
                        .copy_from_slice(&input[i..i + take]);
                    self.received += take;
                    i += take;

                    if self.received == self.expected {
                        self.state = State::Command;
                        return FeedResult {
                            consumed: i,
                            status: FrameStatus::Complete(Frame {
                                command: self.command,
                                payload: &self.buf[..self.expected],
                                frame_len: header_len + self.expected,
                            }),
                        };
                    }
                }
            }
        }

        FeedResult {
            consumed: i,
            status: FrameStatus::NeedMore,
        }
    }
}
