//! Lock-free SPMC (Single Producer, Multiple Consumer) sample stream.
//!
//! This is the heart of the keyer. All keying events flow through here.
//!
//! # Architecture
//!
//! ```text
//! Producers ──────▶ SampleStream ──────▶ Consumers
//!                   (lock-free)
//!                   (single truth)
//! ```
//!
//! # Rules (from ARCHITECTURE.md)
//!
//! - RULE 1.1: All keying events flow through the sample stream
//! - RULE 1.2: No component communicates except through the stream
//! - RULE 3.1: Only atomic operations for synchronization
//! - RULE 3.4: No operation shall block
//!
//! # Memory Ordering
//!
//! - The producer writes the slot first, then release-stores `write_idx + 1`
//! - Consumers acquire-load `write_idx` before touching a slot
//! - The release/acquire pair makes the slot bytes at index `i` visible to
//!   any reader that observed `write_idx >= i + 1`
//! - `idle_ticks` is producer-local in meaning and uses relaxed ordering

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::sample::KeySample;

/// Default stream capacity: 4096 samples.
/// At 10 kHz tick rate this is ~400 ms of buffer.
pub const DEFAULT_STREAM_CAPACITY: usize = 4096;

/// Shareable slot cell for static stream buffers.
///
/// # Safety
///
/// `Sync` is sound under the stream's rules: exactly one producer writes
/// slots, and consumers only read slots the producer has published via the
/// release-store on `write_idx`.
#[repr(transparent)]
pub struct SyncCell<T>(UnsafeCell<T>);

unsafe impl<T> Sync for SyncCell<T> {}

impl<T> SyncCell<T> {
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    pub fn get(&self) -> *mut T {
        self.0.get()
    }
}

/// Stream construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The backing buffer length is zero or not a power of two.
    #[error("stream capacity must be a nonzero power of two, got {0}")]
    CapacityNotPowerOfTwo(usize),
}

/// Slot read outcome for a consumer at a given index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// Index is at the write head; nothing published yet.
    NoData,
    /// Index fell more than `capacity` behind; the slot was overwritten.
    Overrun,
}

/// Lock-free SPMC ring buffer for keying samples.
///
/// Backed by a caller-provided static slot array (the buffer is typically a
/// `static` so the stream can live for the whole process). Capacity is the
/// buffer length and must be a power of two; the write index wraps through
/// it by mask.
///
/// # Safety
///
/// Uses `UnsafeCell` internally but is safe under the architecture rules:
/// - Single producer (enforced by design, not by the type system)
/// - Each consumer owns its private read index
/// - All coordination through atomics; no operation blocks
pub struct SampleStream {
    /// Ring slots.
    slots: &'static [SyncCell<KeySample>],

    /// Index mask (`capacity - 1`).
    mask: u32,

    /// Next write index. Monotone, wraps via modular arithmetic.
    write_idx: AtomicU32,

    /// Pending silence accumulator.
    idle_ticks: AtomicU32,

    /// Last emitted sample, producer-private.
    last_sample: UnsafeCell<KeySample>,
}

// SAFETY: single producer, multiple consumers, atomic coordination.
unsafe impl Sync for SampleStream {}
unsafe impl Send for SampleStream {}

impl SampleStream {
    /// Create a stream over a static slot buffer.
    ///
    /// Fails unless the buffer length is a nonzero power of two (the lag
    /// arithmetic depends on mask wrapping).
    pub fn with_buffer(slots: &'static [SyncCell<KeySample>]) -> Result<Self, StreamError> {
        let n = slots.len();
        if n == 0 || !n.is_power_of_two() || n > u32::MAX as usize {
            return Err(StreamError::CapacityNotPowerOfTwo(n));
        }

        Ok(Self {
            slots,
            mask: (n - 1) as u32,
            write_idx: AtomicU32::new(0),
            idle_ticks: AtomicU32::new(0),
            last_sample: UnsafeCell::new(KeySample::EMPTY),
        })
    }

    /// Push a sample with silence compression.
    ///
    /// If the sample is unchanged from the previous one, only the idle
    /// counter advances. On a change, any accumulated silence is flushed as
    /// a single run marker, then the sample is written with its edge flags.
    ///
    /// # Timing
    ///
    /// O(1), never blocks, never allocates.
    #[inline]
    pub fn push(&self, sample: KeySample) {
        // SAFETY: single producer, no aliasing
        let last = unsafe { &*self.last_sample.get() };

        if sample.has_change_from(last) {
            let idle = self.idle_ticks.swap(0, Ordering::Relaxed);
            if idle > 0 {
                self.write_slot(KeySample::silence(idle));
            }

            let sample_with_edges = sample.with_edges_from(last);
            self.write_slot(sample_with_edges);

            // SAFETY: single producer, no aliasing
            unsafe {
                *self.last_sample.get() = sample;
            }
        } else {
            self.idle_ticks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Push a sample unconditionally, bypassing silence compression.
    ///
    /// Used by hosted commands that must land as immediate slots
    /// (key-immediate). Pending silence is flushed first so slot order
    /// stays faithful to production order.
    #[inline]
    pub fn push_raw(&self, sample: KeySample) {
        let idle = self.idle_ticks.swap(0, Ordering::Relaxed);
        if idle > 0 {
            self.write_slot(KeySample::silence(idle));
        }
        self.write_slot(sample);
        // SAFETY: single producer, no aliasing
        unsafe {
            *self.last_sample.get() = sample;
        }
    }

    /// Drain accumulated silence into a run marker.
    #[inline]
    pub fn flush(&self) {
        let idle = self.idle_ticks.swap(0, Ordering::Relaxed);
        if idle > 0 {
            self.write_slot(KeySample::silence(idle));
        }
    }

    #[inline]
    fn write_slot(&self, sample: KeySample) {
        let idx = self.write_idx.load(Ordering::Relaxed);

        // SAFETY: single producer; this slot is not readable until the
        // release-store below publishes the new index.
        unsafe {
            *self.slots[(idx & self.mask) as usize].get() = sample;
        }

        self.write_idx.store(idx.wrapping_add(1), Ordering::Release);
    }

    /// Read the sample at `idx`.
    ///
    /// Never mutates shared state; each consumer owns its index.
    #[inline]
    pub fn read(&self, idx: u32) -> Result<KeySample, ReadError> {
        let write = self.write_idx.load(Ordering::Acquire);
        let behind = write.wrapping_sub(idx);

        if behind == 0 {
            return Err(ReadError::NoData);
        }
        if behind > self.capacity() as u32 {
            return Err(ReadError::Overrun);
        }

        // SAFETY: index validated against the acquire-loaded write head;
        // the slot write happened-before the index publication.
        Ok(unsafe { *self.slots[(idx & self.mask) as usize].get() })
    }

    /// Current write head. Consumers initialize their read index here.
    #[inline]
    pub fn write_head(&self) -> u32 {
        self.write_idx.load(Ordering::Acquire)
    }

    /// Samples a reader at `reader_idx` is behind the producer.
    ///
    /// Wrapping unsigned subtraction: signed math would invalidate the lag
    /// formula once the index wraps.
    #[inline]
    pub fn lag(&self, reader_idx: u32) -> u32 {
        self.write_idx
            .load(Ordering::Acquire)
            .wrapping_sub(reader_idx)
    }

    /// Whether a reader has fallen more than `capacity` behind.
    #[inline]
    pub fn is_overrun(&self, reader_idx: u32) -> bool {
        self.lag(reader_idx) > self.capacity() as u32
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Pending silence ticks not yet flushed (diagnostics).
    #[inline]
    pub fn pending_idle(&self) -> u32 {
        self.idle_ticks.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
pub(crate) fn leak_buffer(n: usize) -> &'static [SyncCell<KeySample>] {
    let mut v = Vec::with_capacity(n);
    for _ in 0..n {
        v.push(SyncCell::new(KeySample::EMPTY));
    }
    Box::leak(v.into_boxed_slice())
}
