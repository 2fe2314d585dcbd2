//! Periodic summary of channel failures.
//!
//! Individual channel errors are common (an IOC reboots, a record times out
//! once) and logging each one floods the log. They are counted per channel
//! and direction instead and summarized at a fixed interval.
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Read => "read",
            Direction::Write => "write",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ErrorTally {
    counts: BTreeMap<(String, Direction), u64>,
    last_report: Option<Instant>,
}

impl ErrorTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, channel: &str, dir: Direction) {
        *self.counts.entry((channel.to_string(), dir)).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn count(&self, channel: &str, dir: Direction) -> u64 {
        self.counts
            .get(&(channel.to_string(), dir))
            .copied()
            .unwrap_or(0)
    }

    /// Log and clear the tally if `interval` has passed since the last report.
    ///
    /// The first call only starts the interval. Returns the number of failures
    /// reported.
    pub fn maybe_report(&mut self, now: Instant, interval: Duration) -> Option<u64> {
        let Some(last) = self.last_report else {
            self.last_report = Some(now);
            return None;
        };
        if now.saturating_duration_since(last) < interval {
            return None;
        }
        self.last_report = Some(now);
        if self.counts.is_empty() {
            return None;
        }
        let total = self.total();
        for ((channel, dir), n) in &self.counts {
            tracing::warn!(channel = %channel, direction = dir.as_str(), failures = *n, "channel errors");
        }
        tracing::warn!(total, interval_s = interval.as_secs(), "channel error summary");
        self.counts.clear();
        Some(total)
    }
}
