use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Counters accumulated over a console session. Shared behind
/// `Arc<Mutex<..>>` between the session engine and the unlock controller.
#[derive(Debug, Default, Clone)]
pub struct SessionMetrics {
    lines: u64,
    commands: u64,
    unknown_commands: u64,
    access_denials: u64,
    media_retries: u64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&mut self) {
        self.lines = self.lines.saturating_add(1);
    }

    pub fn record_command(&mut self) {
        self.commands = self.commands.saturating_add(1);
    }

    pub fn record_unknown_command(&mut self) {
        self.unknown_commands = self.unknown_commands.saturating_add(1);
    }

    pub fn record_access_denial(&mut self) {
        self.access_denials = self.access_denials.saturating_add(1);
    }

    pub fn record_media_retry(&mut self) {
        self.media_retries = self.media_retries.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            lines: self.lines,
            commands: self.commands,
            unknown_commands: self.unknown_commands,
            access_denials: self.access_denials,
            media_retries: self.media_retries,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub lines: u64,
    pub commands: u64,
    pub unknown_commands: u64,
    pub access_denials: u64,
    pub media_retries: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(
            LogLevel::Info,
            target.to_string(),
            "session_metrics".to_string(),
            self.as_fields(),
        )
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("lines".to_string(), json!(self.lines));
        map.insert("commands".to_string(), json!(self.commands));
        map.insert(
            "unknown_commands".to_string(),
            json!(self.unknown_commands),
        );
        map.insert("access_denials".to_string(), json!(self.access_denials));
        map.insert("media_retries".to_string(), json!(self.media_retries));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_carries_counter_values() {
        let mut metrics = SessionMetrics::new();
        metrics.record_line();
        metrics.record_line();
        metrics.record_command();
        metrics.record_access_denial();
        let snapshot = metrics.snapshot(Duration::from_millis(1500));
        assert_eq!(snapshot.uptime_ms, 1500);
        assert_eq!(snapshot.lines, 2);
        assert_eq!(snapshot.commands, 1);
        assert_eq!(snapshot.access_denials, 1);
        assert_eq!(snapshot.unknown_commands, 0);
    }

    #[test]
    fn snapshot_log_event_has_fields() {
        let metrics = SessionMetrics::new();
        let event = metrics
            .snapshot(Duration::from_secs(1))
            .to_log_event("console::session.metrics");
        assert_eq!(event.target, "console::session.metrics");
        assert!(event.fields.contains_key("commands"));
        assert!(event.fields.contains_key("media_retries"));
    }
}
