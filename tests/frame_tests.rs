//! Integration tests for the streaming frame parser.

use keyer_core::frame::{frame_type, FrameError, FrameParser, FrameStatus};

#[test]
fn test_scenario_ping_byte_by_byte() {
    // PING with a 16-byte payload: [0x43, 0x10] + 16 x 0xBB
    let mut bytes = vec![0x43u8, 0x10];
    bytes.extend(std::iter::repeat(0xBB).take(16));

    let mut parser = FrameParser::new();

    for (i, &b) in bytes.iter().enumerate() {
        let chunk = [b];
        let r = parser.feed(&chunk);
        assert_eq!(r.consumed, 1);

        if i < bytes.len() - 1 {
            assert_eq!(
                r.status,
                FrameStatus::NeedMore,
                "byte {i} should not complete the frame"
            );
        } else {
            // Only the final byte returns a frame
            match r.status {
                FrameStatus::Complete(frame) => {
                    assert_eq!(frame.command, frame_type::PING);
                    assert_eq!(frame.payload.len(), 16);
                    assert!(frame.payload.iter().all(|&b| b == 0xBB));
                    assert_eq!(frame.frame_len, 18);
                }
                other => panic!("expected frame on final byte, got {other:?}"),
            }
        }
    }
}

#[test]
fn test_whole_buffer_matches_byte_by_byte() {
    let mut bytes = vec![0x43u8, 0x10];
    bytes.extend(std::iter::repeat(0xBB).take(16));

    let mut parser = FrameParser::new();
    match parser.feed(&bytes).status {
        FrameStatus::Complete(frame) => {
            assert_eq!(frame.command, frame_type::PING);
            assert_eq!(frame.payload.len(), 16);
            assert_eq!(frame.frame_len, 18);
        }
        other => panic!("expected frame, got {other:?}"),
    }
}

#[test]
fn test_reserved_category_requires_reset() {
    let mut parser = FrameParser::new();

    let r = parser.feed(&[0xC3]);
    assert_eq!(r.status, FrameStatus::Error(FrameError::Reserved));

    parser.reset();

    let r = parser.feed(&[0x02]); // bare KEY_STATE, no payload
    match r.status {
        FrameStatus::Complete(frame) => assert_eq!(frame.command, 0x02),
        other => panic!("expected recovery after reset, got {other:?}"),
    }
}

#[test]
fn test_back_to_back_frames() {
    let mut parser = FrameParser::new();

    // KEY_STATE down, KEY_STATE up, PING — as one byte stream
    let stream_bytes = [0x41u8, 0x01, 0x01, 0x41, 0x01, 0x00, 0x03];
    let mut offset = 0;
    let mut frames = Vec::new();

    while offset < stream_bytes.len() {
        let r = parser.feed(&stream_bytes[offset..]);
        match r.status {
            FrameStatus::Complete(frame) => {
                frames.push((frame.command, frame.payload.to_vec()));
            }
            FrameStatus::NeedMore => {}
            FrameStatus::Error(e) => panic!("unexpected error {e:?}"),
        }
        offset += r.consumed;
    }

    assert_eq!(
        frames,
        vec![
            (frame_type::KEY_STATE, vec![0x01]),
            (frame_type::KEY_STATE, vec![0x00]),
            (frame_type::PING, vec![]),
        ]
    );
}

#[test]
fn test_two_byte_length_little_endian() {
    let mut parser = FrameParser::new();

    // CONFIG frame, length 0x0200 = 512 bytes, contiguous
    let mut bytes = vec![0x84u8, 0x00, 0x02];
    bytes.extend((0..512u32).map(|i| (i % 251) as u8));

    match parser.feed(&bytes).status {
        FrameStatus::Complete(frame) => {
            assert_eq!(frame.command, frame_type::CONFIG);
            assert_eq!(frame.payload.len(), 512);
            assert_eq!(frame.frame_len, 515);
        }
        other => panic!("expected frame, got {other:?}"),
    }
}

#[test]
fn test_fragmented_over_reassembly_capacity_errors() {
    let mut parser = FrameParser::new();

    let r = parser.feed(&[0x84, 0x00, 0x02]); // 512 bytes promised
    assert_eq!(r.status, FrameStatus::NeedMore);

    // First fragment forces reassembly, which cannot hold 512
    let r = parser.feed(&[0u8; 100]);
    assert_eq!(r.status, FrameStatus::Error(FrameError::Oversize));
}

#[test]
fn test_payload_zero_copy_points_into_input() {
    let mut parser = FrameParser::new();
    let bytes = [0x42u8, 0x03, 0xDE, 0xAD, 0xBF];

    match parser.feed(&bytes).status {
        FrameStatus::Complete(frame) => {
            // Same bytes, and actually the same addresses as the input
            assert_eq!(frame.payload, &bytes[2..5]);
            assert_eq!(frame.payload.as_ptr(), bytes[2..].as_ptr());
        }
        other => panic!("expected frame, got {other:?}"),
    }
}
