//! Stream consumers.
//!
//! Two disciplines on top of [`SampleStream`]:
//! - **HardRtConsumer**: must keep up or FAULT (TX keying, audio)
//! - **BestEffortConsumer**: skips ahead if behind (decoder, remote)
//!
//! # Rules (from ARCHITECTURE.md §4, §5)
//!
//! - RULE 4.1: a hard-RT consumer has a maximum allowed lag
//! - RULE 4.2: exceeding it latches a FAULT; ticks return FAULT until the
//!   register is cleared and the consumer resynced
//! - RULE 5.1: a best-effort consumer never FAULTs
//! - RULE 5.2: if behind, it skips forward and counts the drop

use crate::fault::{FaultCode, FaultRegister};
use crate::sample::KeySample;
use crate::stream::{ReadError, SampleStream};

/// Hard real-time consumer.
///
/// Used for TX keying and sidetone where timing is critical.
///
/// # Contract
///
/// "I MUST keep up with the stream, or I FAULT."
///
/// Falling behind by more than `max_lag` samples latches the process-wide
/// fault register and every subsequent tick returns the latched code until
/// the register is cleared and [`resync`](HardRtConsumer::resync) is called.
///
/// # Example
///
/// ```ignore
/// let mut consumer = HardRtConsumer::new(&STREAM, &FAULT, 8);
///
/// loop {
///     match consumer.tick() {
///         Ok(Some(sample)) => {
///             tx_set(sample.local_key);
///         }
///         Ok(None) => {} // caught up
///         Err(_) => {
///             tx_set(false);
///         }
///     }
/// }
/// ```
pub struct HardRtConsumer<'a> {
    stream: &'a SampleStream,
    fault: &'a FaultRegister,
    read_idx: u32,
    max_lag: u32,
}

impl<'a> HardRtConsumer<'a> {
    /// Create a consumer positioned at the stream's current write head.
    pub fn new(stream: &'a SampleStream, fault: &'a FaultRegister, max_lag: u32) -> Self {
        Self {
            stream,
            fault,
            read_idx: stream.write_head(),
            max_lag,
        }
    }

    /// Read the next sample if available.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(sample))` — new sample
    /// - `Ok(None)` — caught up with the producer
    /// - `Err(code)` — fault latched (this tick or earlier)
    ///
    /// # Timing
    ///
    /// O(1), never blocks, never allocates.
    #[inline]
    pub fn tick(&mut self) -> Result<Option<KeySample>, FaultCode> {
        // Latched fault gates everything
        if self.fault.is_active() {
            return Err(self.fault.code());
        }

        let lag = self.stream.lag(self.read_idx);

        if lag > self.max_lag {
            self.fault.set(FaultCode::LatencyExceeded, lag);
            return Err(FaultCode::LatencyExceeded);
        }

        if lag == 0 {
            return Ok(None);
        }

        if lag > self.stream.capacity() as u32 {
            self.fault.set(FaultCode::Overrun, lag);
            return Err(FaultCode::Overrun);
        }

        match self.stream.read(self.read_idx) {
            Ok(sample) => {
                self.read_idx = self.read_idx.wrapping_add(1);
                Ok(Some(sample))
            }
            Err(ReadError::NoData) => Ok(None),
            Err(ReadError::Overrun) => {
                // Producer advanced past us between the lag check and the
                // read. Same fault, observed one step later.
                self.fault.set(FaultCode::Overrun, self.stream.lag(self.read_idx));
                Err(FaultCode::Overrun)
            }
        }
    }

    /// Jump to the current write head (recovery after a fault clear).
    #[inline]
    pub fn resync(&mut self) {
        self.read_idx = self.stream.write_head();
    }

    /// Current lag behind the producer.
    #[inline]
    pub fn lag(&self) -> u32 {
        self.stream.lag(self.read_idx)
    }

    #[inline]
    pub fn read_idx(&self) -> u32 {
        self.read_idx
    }
}

/// Best-effort consumer.
///
/// Used for the decoder, remote forwarding and diagnostics where falling
/// behind is acceptable.
///
/// # Contract
///
/// "I process when I can. I skip if I fall behind."
///
/// Never faults. On overrun — or when lag exceeds the optional
/// `skip_threshold` — it jumps forward, keeping a two-sample tail for
/// smooth transitions, and adds the skipped count to `dropped`.
pub struct BestEffortConsumer<'a> {
    stream: &'a SampleStream,
    read_idx: u32,
    /// Skip-ahead trigger; 0 disables the threshold (overrun still skips).
    skip_threshold: u32,
    dropped: u32,
}

impl<'a> BestEffortConsumer<'a> {
    /// Create a consumer positioned at the stream's current write head.
    pub fn new(stream: &'a SampleStream) -> Self {
        Self::with_skip_threshold(stream, 0)
    }

    /// Create a consumer that skips ahead once lag exceeds `skip_threshold`
    /// samples (0 = only skip on overrun).
    pub fn with_skip_threshold(stream: &'a SampleStream, skip_threshold: u32) -> Self {
        Self {
            stream,
            read_idx: stream.write_head(),
            skip_threshold,
            dropped: 0,
        }
    }

    /// Read the next sample if available, skipping forward when behind.
    #[inline]
    pub fn tick(&mut self) -> Option<KeySample> {
        let mut lag = self.stream.lag(self.read_idx);
        if lag == 0 {
            return None;
        }

        let over = lag > self.stream.capacity() as u32;
        if over || (self.skip_threshold > 0 && lag > self.skip_threshold) {
            // Keep a two-sample tail, clamped by what was actually
            // produced so the target is always a written slot.
            let tail = lag.min(2);
            let target = self.stream.write_head().wrapping_sub(tail);
            let skipped = target.wrapping_sub(self.read_idx);
            self.read_idx = target;
            self.dropped = self.dropped.saturating_add(skipped);
            lag = self.stream.lag(self.read_idx);
            if lag == 0 {
                return None;
            }
        }

        match self.stream.read(self.read_idx) {
            Ok(sample) => {
                self.read_idx = self.read_idx.wrapping_add(1);
                Some(sample)
            }
            Err(ReadError::NoData) => None,
            Err(ReadError::Overrun) => {
                // Lost the race with the producer mid-tick; restart at the
                // head and report next time around.
                self.read_idx = self.stream.write_head();
                self.dropped = self.dropped.saturating_add(1);
                None
            }
        }
    }

    /// Drain all currently available samples.
    #[inline]
    pub fn drain(&mut self) -> DrainIterator<'_, 'a> {
        DrainIterator { consumer: self }
    }

    /// Samples passed over due to skip-ahead.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    #[inline]
    pub fn reset_dropped(&mut self) {
        self.dropped = 0;
    }

    /// Current lag behind the producer.
    #[inline]
    pub fn lag(&self) -> u32 {
        self.stream.lag(self.read_idx)
    }

    #[inline]
    pub fn read_idx(&self) -> u32 {
        self.read_idx
    }
}

/// Iterator draining a best-effort consumer.
pub struct DrainIterator<'c, 'a> {
    consumer: &'c mut BestEffortConsumer<'a>,
}

impl<'c, 'a> Iterator for DrainIterator<'c, 'a> {
    type Item = KeySample;

    fn next(&mut self) -> Option<Self::Item> {
        self.consumer.tick()
    }
}
