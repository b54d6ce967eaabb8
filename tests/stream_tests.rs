//! Integration tests for the sample stream: ordering, capacity window,
//! silence compression.

mod common;

use common::make_stream;
use keyer_core::sample::{InputLines, KeySample};
use keyer_core::stream::ReadError;

/// Sample whose line bits encode a producer-side sequence number.
fn numbered(n: u8) -> KeySample {
    let mut s = KeySample::EMPTY;
    s.lines = InputLines::from_bits(n);
    s
}

#[test]
fn test_reads_observe_production_order() {
    let stream = make_stream(64);

    for n in 0..40u8 {
        stream.push_raw(numbered(n));
    }

    let mut idx = 0;
    let mut prev = None;
    while let Ok(sample) = stream.read(idx) {
        let n = sample.lines.bits();
        if let Some(p) = prev {
            assert_eq!(n, p + 1, "samples out of order at index {idx}");
        }
        prev = Some(n);
        idx += 1;
    }
    assert_eq!(idx, 40);
}

#[test]
fn test_capacity_window() {
    let stream = make_stream(16);

    for n in 0..20u8 {
        stream.push_raw(numbered(n));
    }

    // Lag of exactly capacity reads faithfully
    let oldest_valid = 20 - 16;
    let sample = stream.read(oldest_valid).unwrap();
    assert_eq!(sample.lines.bits(), oldest_valid as u8);

    // One further back is overrun
    assert_eq!(stream.read(oldest_valid - 1), Err(ReadError::Overrun));

    // At the head: nothing yet
    assert_eq!(stream.read(20), Err(ReadError::NoData));
}

#[test]
fn test_silence_run_compression() {
    let stream = make_stream(64);

    // 100 identical samples, then one distinct sample
    let quiet = KeySample::EMPTY;
    for _ in 0..100 {
        stream.push(quiet);
    }
    let mut active = KeySample::EMPTY;
    active.local_key = true;
    stream.push(active);

    // Exactly two slots written: the run marker and the change
    assert_eq!(stream.write_head(), 2);

    let run = stream.read(0).unwrap();
    assert!(run.is_idle_run());
    assert_eq!(run.idle_run, 100);

    let change = stream.read(1).unwrap();
    assert!(change.local_key);
    assert!(change.has_local_edge());
    assert!(!change.is_idle_run());
}

#[test]
fn test_flush_emits_pending_run() {
    let stream = make_stream(64);

    for _ in 0..7 {
        stream.push(KeySample::EMPTY);
    }
    assert_eq!(stream.write_head(), 0);
    assert_eq!(stream.pending_idle(), 7);

    stream.flush();
    assert_eq!(stream.write_head(), 1);
    assert_eq!(stream.read(0).unwrap().idle_run, 7);

    // Nothing pending: flush is a no-op
    stream.flush();
    assert_eq!(stream.write_head(), 1);
}

#[test]
fn test_alternating_changes_skip_compression() {
    let stream = make_stream(64);

    let mut down = KeySample::EMPTY;
    down.local_key = true;

    for _ in 0..10 {
        stream.push(down);
        stream.push(KeySample::EMPTY);
    }

    // Every push was a change: 20 slots, no run markers
    assert_eq!(stream.write_head(), 20);
    for idx in 0..20 {
        assert!(!stream.read(idx).unwrap().is_idle_run());
    }
}

#[test]
fn test_wrapping_read_across_mask() {
    let stream = make_stream(16);

    // Write far past one wrap of the buffer mask
    for n in 0..200u8 {
        stream.push_raw(numbered(n));
    }

    // The most recent 16 survive with their payloads intact
    for idx in (200 - 16)..200u32 {
        let sample = stream.read(idx).unwrap();
        assert_eq!(sample.lines.bits(), idx as u8);
    }
}
