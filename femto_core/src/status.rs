//! Operator status message (bounded length).
use femto_traits::ChannelService;

use crate::error::LockError;
use crate::link::Link;

/// Longest message the status record holds.
pub const STATUS_MAX_LEN: usize = 25;

/// Truncate to the status record length on a char boundary.
pub fn clip(msg: &str) -> &str {
    match msg.char_indices().nth(STATUS_MAX_LEN) {
        Some((idx, _)) => &msg[..idx],
        None => msg,
    }
}

/// Writes status messages, skipping repeats of the last one written.
#[derive(Debug, Default)]
pub struct StatusWriter {
    last: Option<String>,
}

impl StatusWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write<S: ChannelService>(&mut self, link: &mut Link<S>, msg: &str) -> Result<(), LockError> {
        let msg = clip(msg);
        if self.last.as_deref() == Some(msg) {
            return Ok(());
        }
        link.put_status(msg)?;
        tracing::info!(status = msg, "status");
        self.last = Some(msg.to_string());
        Ok(())
    }

    /// Forget the last message, e.g. after something else wrote the record.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clips_to_record_length() {
        assert_eq!(clip("Frequency set point out of range"), "Frequency set point out o");
        assert_eq!(clip("OK"), "OK");
        assert_eq!(clip("µµµµµµµµµµµµµµµµµµµµµµµµµµµ").chars().count(), STATUS_MAX_LEN);
    }
}
