//! Integration tests for iambic keying: element timing, squeeze
//! behavior, mode A/B differences, memory.
//!
//! Ticks run at a simulated 10 kHz (100 µs period) unless a scenario
//! needs exact boundary timestamps.

use keyer_core::iambic::{IambicConfig, IambicKeyer, IambicMode, MemoryMode};
use keyer_core::sample::InputLines;

const TICK_US: i64 = 100;

const DIT: InputLines = InputLines::paddles(true, false);
const BOTH: InputLines = InputLines::SQUEEZE;
const OPEN: InputLines = InputLines::IDLE;

/// Run the keyer from `*t` for `duration_us` with fixed paddles, collecting
/// (key_down_time, key_up_time) mark intervals.
fn run(
    keyer: &mut IambicKeyer,
    t: &mut i64,
    duration_us: i64,
    lines: InputLines,
    marks: &mut Vec<(i64, i64)>,
    down_since: &mut Option<i64>,
) {
    let end = *t + duration_us;
    while *t < end {
        let sample = keyer.tick(*t, lines);
        match (sample.local_key, *down_since) {
            (true, None) => *down_since = Some(*t),
            (false, Some(start)) => {
                marks.push((start, *t));
                *down_since = None;
            }
            _ => {}
        }
        *t += TICK_US;
    }
}

#[test]
fn test_scenario_basic_dit_at_20_wpm() {
    // dit = 60000 µs at 20 WPM, Mode B
    let config = IambicConfig {
        wpm: 20,
        mode: IambicMode::B,
        ..Default::default()
    };
    let mut keyer = IambicKeyer::new(config);

    // t=0, dit pressed: element starts
    let s = keyer.tick(0, DIT);
    assert!(s.local_key);

    // t=61000, same paddles: past the mark, in the gap
    let s = keyer.tick(61_000, DIT);
    assert!(!s.local_key);

    // t=122000, paddles released: idle
    let s = keyer.tick(122_000, OPEN);
    assert!(!s.local_key);
    assert!(!keyer.is_key_down());
}

#[test]
fn test_dit_duration_within_one_tick() {
    let config = IambicConfig::with_wpm(20);
    let dit_us = 1_200_000 / 20;

    let mut keyer = IambicKeyer::new(config);
    let mut t = 0i64;
    let mut marks = Vec::new();
    let mut down = None;

    // Hold dit for one element then release
    run(&mut keyer, &mut t, dit_us + TICK_US, DIT, &mut marks, &mut down);
    run(&mut keyer, &mut t, 4 * dit_us, OPEN, &mut marks, &mut down);

    assert_eq!(marks.len(), 1);
    let (start, end) = marks[0];
    let measured = end - start;
    assert!(
        (measured - dit_us).abs() <= TICK_US,
        "dit lasted {measured} µs, expected {dit_us} ±{TICK_US}"
    );
}

#[test]
fn test_dah_is_three_dits_gap_is_one() {
    let config = IambicConfig::with_wpm(30);
    let dit_us = 1_200_000 / 30;

    let mut keyer = IambicKeyer::new(config);
    let mut t = 0i64;
    let mut marks = Vec::new();
    let mut down = None;

    // Squeeze long enough for dit + gap + dah, then release
    run(
        &mut keyer,
        &mut t,
        dit_us + dit_us + 3 * dit_us + TICK_US,
        BOTH,
        &mut marks,
        &mut down,
    );
    run(&mut keyer, &mut t, 8 * dit_us, OPEN, &mut marks, &mut down);

    assert!(marks.len() >= 2, "expected dit then dah, got {marks:?}");

    let dit_len = marks[0].1 - marks[0].0;
    let dah_len = marks[1].1 - marks[1].0;
    let gap_len = marks[1].0 - marks[0].1;

    assert!((dit_len - dit_us).abs() <= TICK_US);
    assert!((dah_len - 3 * dit_us).abs() <= TICK_US);
    assert!((gap_len - dit_us).abs() <= TICK_US);
}

#[test]
fn test_scenario_prolonged_squeeze_mode_b() {
    // Expected order at 20 WPM: DIT 0-60000, gap, DAH 120000-300000,
    // gap, DIT, gap, DAH ... for as long as the squeeze holds
    let config = IambicConfig {
        wpm: 20,
        mode: IambicMode::B,
        ..Default::default()
    };
    let mut keyer = IambicKeyer::new(config);
    let mut t = 0i64;
    let mut marks = Vec::new();
    let mut down = None;

    run(&mut keyer, &mut t, 1_500_000, BOTH, &mut marks, &mut down);

    assert!(marks.len() >= 4);

    // First element is a dit starting at 0
    assert_eq!(marks[0].0, 0);
    let first_len = marks[0].1 - marks[0].0;
    assert!((first_len - 60_000).abs() <= TICK_US);

    // Second element is a dah starting one gap later
    assert!((marks[1].0 - 120_000).abs() <= TICK_US);
    let second_len = marks[1].1 - marks[1].0;
    assert!((second_len - 180_000).abs() <= TICK_US);

    // Alternation continues: dit, dah, dit, ...
    for (i, (start, end)) in marks.iter().enumerate() {
        let expected = if i % 2 == 0 { 60_000 } else { 180_000 };
        let len = end - start;
        assert!(
            (len - expected).abs() <= TICK_US,
            "element {i} lasted {len}, expected {expected}"
        );
    }
}

#[test]
fn test_mode_a_vs_mode_b_on_squeeze_release() {
    let dit_us = 1_200_000 / 20;

    for (mode, expected_elements) in [(IambicMode::A, 1), (IambicMode::B, 2)] {
        let config = IambicConfig {
            wpm: 20,
            mode,
            ..Default::default()
        };
        let mut keyer = IambicKeyer::new(config);
        let mut t = 0i64;
        let mut marks = Vec::new();
        let mut down = None;

        // Squeeze, release mid-first-element
        run(&mut keyer, &mut t, dit_us / 2, BOTH, &mut marks, &mut down);
        run(&mut keyer, &mut t, 10 * dit_us, OPEN, &mut marks, &mut down);

        assert_eq!(
            marks.len(),
            expected_elements,
            "mode {mode:?}: expected {expected_elements} elements, got {marks:?}"
        );

        if mode == IambicMode::B {
            // The bonus element is the opposite of the dit: a dah
            let bonus_len = marks[1].1 - marks[1].0;
            assert!((bonus_len - 3 * dit_us).abs() <= TICK_US);
        }
    }
}

#[test]
fn test_memory_plays_dah_after_current_dit() {
    let dit_us = 1_200_000 / 20;
    let config = IambicConfig {
        wpm: 20,
        memory: MemoryMode::DotAndDah,
        mode: IambicMode::A,
        mem_window_start_pct: 0,
        mem_window_end_pct: 100,
        ..Default::default()
    };
    let mut keyer = IambicKeyer::new(config);
    let mut t = 0i64;
    let mut marks = Vec::new();
    let mut down = None;

    // Dit held; dah tapped mid-element inside the memory window
    run(&mut keyer, &mut t, dit_us / 2, DIT, &mut marks, &mut down);
    run(&mut keyer, &mut t, 2 * TICK_US, BOTH, &mut marks, &mut down);
    run(&mut keyer, &mut t, dit_us, DIT, &mut marks, &mut down);
    // Release everything and let the memory play out
    run(&mut keyer, &mut t, 8 * dit_us, OPEN, &mut marks, &mut down);

    assert_eq!(marks.len(), 2, "dit then remembered dah: {marks:?}");

    let first_len = marks[0].1 - marks[0].0;
    let second_len = marks[1].1 - marks[1].0;
    assert!((first_len - dit_us).abs() <= TICK_US, "first was {first_len}");
    assert!(
        (second_len - 3 * dit_us).abs() <= TICK_US,
        "remembered element was {second_len}, expected a dah"
    );

    // It starts after the dit's gap
    let gap = marks[1].0 - marks[0].1;
    assert!((gap - dit_us).abs() <= TICK_US);
}

#[test]
fn test_weighted_elements_keep_pair_length() {
    let wpm = 20;
    let dit_us = 1_200_000 / wpm;
    let config = IambicConfig {
        wpm: wpm as u32,
        weight: 60,
        ..Default::default()
    };
    let mut keyer = IambicKeyer::new(config);
    let mut t = 0i64;
    let mut marks = Vec::new();
    let mut down = None;

    // Two dits back to back
    run(&mut keyer, &mut t, 5 * dit_us, DIT, &mut marks, &mut down);
    run(&mut keyer, &mut t, 4 * dit_us, OPEN, &mut marks, &mut down);

    assert!(marks.len() >= 2);

    // Marks are stretched to 60/50 of a dit...
    let mark_len = marks[0].1 - marks[0].0;
    assert!((mark_len - dit_us * 60 / 50).abs() <= TICK_US);

    // ...but successive dits still start exactly one pair apart
    let pair = marks[1].0 - marks[0].0;
    assert!((pair - 2 * dit_us).abs() <= TICK_US);
}
