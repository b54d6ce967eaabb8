//! Log drain task body.
//!
//! Pulls entries out of the RT and background rings — RT first — formats
//! them, and hands the text to a caller-supplied sink. The surrounding
//! task owns scheduling: call [`LogDrain::poll`] periodically, sleep
//! briefly when it reports no work.
//!
//! ```text
//! RT_LOG  ─┐
//!          ├─▶ LogDrain::poll ─▶ fmt::Write sink
//! BG_LOG  ─┘        (low priority, blocking ok)
//! ```

use core::fmt::Write;

use crate::logging::{LogEntry, LogRing};

/// How often dropped-entry counts are reported.
const DROP_REPORT_INTERVAL_US: i64 = 10_000_000;

/// Format one entry as `[timestamp] LEVEL: message`.
fn format_entry(entry: &LogEntry, out: &mut dyn Write) {
    let _ = writeln!(
        out,
        "[{:10}] {}: {}",
        entry.at_us,
        entry.level.label(),
        entry.text()
    );
}

/// Drains both process-wide rings into a text sink.
pub struct LogDrain<'a> {
    rt: &'a LogRing,
    bg: &'a LogRing,
    last_drop_report_us: i64,
}

impl<'a> LogDrain<'a> {
    pub fn new(rt: &'a LogRing, bg: &'a LogRing) -> Self {
        Self {
            rt,
            bg,
            last_drop_report_us: 0,
        }
    }

    /// Drain everything currently queued; returns the number of entries
    /// written so the caller can idle when it hits zero.
    ///
    /// Every `DROP_REPORT_INTERVAL_US` the dropped counters are reported
    /// through the `log` facade and reset.
    pub fn poll(&mut self, now_us: i64, out: &mut dyn Write) -> usize {
        let mut drained = 0;
        let mut entry = LogEntry::EMPTY;

        // RT entries first: that ring is smaller-budget and more urgent
        while self.rt.drain_into(&mut entry) {
            format_entry(&entry, out);
            drained += 1;
        }

        while self.bg.drain_into(&mut entry) {
            format_entry(&entry, out);
            drained += 1;
        }

        if now_us - self.last_drop_report_us >= DROP_REPORT_INTERVAL_US {
            let rt_dropped = self.rt.dropped();
            let bg_dropped = self.bg.dropped();

            if rt_dropped > 0 || bg_dropped > 0 {
                log::warn!("log entries dropped: rt={rt_dropped} bg={bg_dropped}");
                self.rt.reset_dropped();
                self.bg.reset_dropped();
            }

            self.last_drop_report_us = now_us;
        }

        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;

    #[test]
    fn test_format_entry() {
        let mut entry = LogEntry::EMPTY;
        entry.at_us = 1234567;
        entry.level = LogLevel::Info;
        entry.len = 11;
        entry.msg[..11].copy_from_slice(b"Hello world");

        let mut out = String::new();
        format_entry(&entry, &mut out);

        assert!(out.contains("1234567"));
        assert!(out.contains("INFO"));
        assert!(out.contains("Hello world"));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_poll_drains_rt_before_bg() {
        let rt: LogRing = LogRing::new();
        let bg: LogRing = LogRing::new();

        bg.push(2, LogLevel::Info, b"background");
        rt.push(1, LogLevel::Info, b"realtime");

        let mut drain = LogDrain::new(&rt, &bg);
        let mut out = String::new();
        let n = drain.poll(0, &mut out);

        assert_eq!(n, 2);
        let rt_pos = out.find("realtime").unwrap();
        let bg_pos = out.find("background").unwrap();
        assert!(rt_pos < bg_pos);
    }

    #[test]
    fn test_poll_idle_returns_zero() {
        let rt: LogRing = LogRing::new();
        let bg: LogRing = LogRing::new();
        let mut drain = LogDrain::new(&rt, &bg);

        let mut out = String::new();
        assert_eq!(drain.poll(0, &mut out), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_drop_report_resets_counters() {
        let rt: LogRing<256> = LogRing::new();
        let bg: LogRing<256> = LogRing::new();

        // Force drops in a tiny window by filling a full ring
        for i in 0..300 {
            rt.push(i, LogLevel::Info, b"x");
        }
        assert!(rt.dropped() > 0);

        let mut drain = LogDrain::new(&rt, &bg);
        let mut out = String::new();

        // First poll inside the report interval: counters kept
        drain.poll(1, &mut out);
        assert!(rt.dropped() > 0);

        // Past the interval: reported and reset
        drain.poll(DROP_REPORT_INTERVAL_US + 1, &mut out);
        assert_eq!(rt.dropped(), 0);
    }
}
