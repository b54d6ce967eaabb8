//! Shared test fixtures.

use keyer_core::sample::KeySample;
use keyer_core::stream::{SampleStream, SyncCell};

/// Leak a slot buffer and build a stream over it.
///
/// Tests leak deliberately: streams are 'static in production too.
pub fn make_stream(capacity: usize) -> &'static SampleStream {
    let mut v = Vec::with_capacity(capacity);
    for _ in 0..capacity {
        v.push(SyncCell::new(KeySample::EMPTY));
    }
    let buf: &'static [SyncCell<KeySample>] = Box::leak(v.into_boxed_slice());
    Box::leak(Box::new(SampleStream::with_buffer(buf).unwrap()))
}
