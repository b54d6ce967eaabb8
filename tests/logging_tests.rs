//! Integration tests for the RT log rings and the drain task body.

use keyer_core::log_drain::LogDrain;
use keyer_core::logging::{LogLevel, LogRing, MAX_MSG_LEN};
use keyer_core::{rt_error, rt_info};

#[test]
fn test_push_never_blocks_on_full_ring() {
    let ring: LogRing<8> = LogRing::new();

    for i in 0..8 {
        assert!(ring.push(i, LogLevel::Info, b"fill"));
    }

    // Ring full: push returns immediately with false and counts the drop
    assert!(!ring.push(99, LogLevel::Info, b"overflow"));
    assert!(!ring.push(100, LogLevel::Info, b"overflow"));
    assert_eq!(ring.dropped(), 2);

    // Earlier entries intact
    assert_eq!(ring.drain().unwrap().at_us, 0);
}

#[test]
fn test_macros_format_into_ring() {
    let ring: LogRing = LogRing::new();

    rt_info!(&ring, 1_000, "tick {} lag {}", 42, 3);
    rt_error!(&ring, 2_000, "fault code {:?}", 7);

    let info = ring.drain().unwrap();
    assert_eq!(info.level, LogLevel::Info);
    assert_eq!(info.text(), "tick 42 lag 3");

    let err = ring.drain().unwrap();
    assert_eq!(err.level, LogLevel::Error);
    assert_eq!(err.at_us, 2_000);
}

#[test]
fn test_long_messages_truncate() {
    let ring: LogRing = LogRing::new();
    let long = "x".repeat(500);

    rt_info!(&ring, 0, "{long}");

    let entry = ring.drain().unwrap();
    assert_eq!(entry.len as usize, MAX_MSG_LEN);
}

#[test]
fn test_drain_prefers_rt_ring() {
    let rt: LogRing = LogRing::new();
    let bg: LogRing = LogRing::new();

    rt_info!(&bg, 1, "bg one");
    rt_info!(&bg, 2, "bg two");
    rt_info!(&rt, 3, "rt one");

    let mut drain = LogDrain::new(&rt, &bg);
    let mut out = String::new();
    assert_eq!(drain.poll(0, &mut out), 3);

    // RT entry rendered before either background entry
    let rt_pos = out.find("rt one").unwrap();
    assert!(rt_pos < out.find("bg one").unwrap());
    assert!(rt_pos < out.find("bg two").unwrap());
}

#[test]
fn test_drain_output_format() {
    let rt: LogRing = LogRing::new();
    let bg: LogRing = LogRing::new();

    rt_error!(&rt, 123_456, "stream overrun, lag {}", 70);

    let mut drain = LogDrain::new(&rt, &bg);
    let mut out = String::new();
    drain.poll(0, &mut out);

    assert!(out.contains("123456"));
    assert!(out.contains("ERROR"));
    assert!(out.contains("stream overrun, lag 70"));
}

#[test]
fn test_cross_thread_producer() {
    use std::sync::Arc;

    let ring = Arc::new(LogRing::<64>::new());

    let producer = {
        let ring = Arc::clone(&ring);
        std::thread::spawn(move || {
            for i in 0..50 {
                rt_info!(&*ring, i, "message {}", i);
            }
        })
    };
    producer.join().unwrap();

    let mut count = 0;
    while let Some(entry) = ring.drain() {
        assert_eq!(entry.text(), format!("message {}", entry.at_us));
        count += 1;
    }
    assert_eq!(count + ring.dropped(), 50);
}
