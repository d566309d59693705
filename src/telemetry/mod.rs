// In-memory log capture alongside the fmt subscriber
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_MAX_LOGS: usize = 1000;
const DEFAULT_FILTER: &str = "clawbot=info";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogEntry {
    pub level: String,
    pub timestamp: DateTime<Utc>,
    pub target: String,
    pub message: String,
    /// Remaining structured fields as `key=value` pairs
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogFilter {
    pub level: Option<Level>,
    pub limit: Option<usize>,
}

/// Bounded ring of recent log events; clones share the same buffer
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    max_entries: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOGS)
    }
}

impl LogBuffer {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            max_entries: max_entries.max(1),
        }
    }

    pub fn push(&self, entry: LogEntry) {
        // A poisoned buffer only loses log history
        if let Ok(mut entries) = self.entries.lock() {
            entries.push_back(entry);
            while entries.len() > self.max_entries {
                entries.pop_front();
            }
        }
    }

    /// Entries oldest first, optionally restricted to one level and the last `limit`
    pub fn entries(&self, filter: LogFilter) -> Vec<LogEntry> {
        let entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let level = filter.level.map(|l| l.to_string());
        let matching: Vec<LogEntry> = entries
            .iter()
            .filter(|e| level.as_ref().map_or(true, |l| &e.level == l))
            .cloned()
            .collect();

        match filter.limit {
            Some(limit) if limit < matching.len() => matching[matching.len() - limit..].to_vec(),
            _ => matching,
        }
    }

    pub fn last_error(&self) -> Option<LogEntry> {
        let entries = self.entries.lock().ok()?;
        entries
            .iter()
            .rev()
            .find(|e| e.level == Level::ERROR.to_string())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `timestamp,level,message,data` rows with RFC 4180 quoting
    pub fn export_csv(&self, filter: LogFilter) -> String {
        let mut out = String::from("timestamp,level,message,data\n");
        for entry in self.entries(filter) {
            let data = entry
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(
                out,
                "{},{},{},{}",
                entry.timestamp.to_rfc3339(),
                entry.level,
                csv_quote(&entry.message),
                csv_quote(&data)
            );
        }
        out
    }
}

fn csv_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// `tracing` layer that copies every event into a `LogBuffer`
pub struct LogBufferLayer {
    buffer: LogBuffer,
}

impl LogBufferLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }
}

impl<S: Subscriber> Layer<S> for LogBufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.buffer.push(LogEntry {
            level: metadata.level().to_string(),
            timestamp: Utc::now(),
            target: metadata.target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Install the fmt subscriber plus the in-memory buffer
///
/// `RUST_LOG` overrides the default `clawbot=info` filter.
pub fn setup_logging(buffer: LogBuffer) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(LogBufferLayer::new(buffer))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture<F: FnOnce()>(buffer: &LogBuffer, f: F) {
        let subscriber = tracing_subscriber::registry().with(LogBufferLayer::new(buffer.clone()));
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn test_layer_captures_message_and_fields() {
        let buffer = LogBuffer::new(10);
        capture(&buffer, || {
            tracing::info!(price = 101.5, side = "LONG", "Opened position");
        });

        let entries = buffer.entries(LogFilter::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, "INFO");
        assert_eq!(entries[0].message, "Opened position");
        assert!(entries[0]
            .fields
            .contains(&("side".to_string(), "LONG".to_string())));
        assert!(entries[0]
            .fields
            .contains(&("price".to_string(), "101.5".to_string())));
    }

    #[test]
    fn test_buffer_is_bounded() {
        let buffer = LogBuffer::new(3);
        capture(&buffer, || {
            for i in 0..5 {
                tracing::info!("event {}", i);
            }
        });

        let entries = buffer.entries(LogFilter::default());
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "event 2");
        assert_eq!(entries[2].message, "event 4");
    }

    #[test]
    fn test_filter_and_last_error() {
        let buffer = LogBuffer::new(10);
        capture(&buffer, || {
            tracing::error!("first failure");
            tracing::warn!("careful");
            tracing::error!("second failure");
            tracing::info!("recovered");
        });

        let errors = buffer.entries(LogFilter {
            level: Some(Level::ERROR),
            limit: None,
        });
        assert_eq!(errors.len(), 2);

        let last_two = buffer.entries(LogFilter {
            level: None,
            limit: Some(2),
        });
        assert_eq!(last_two[0].message, "second failure");
        assert_eq!(last_two[1].message, "recovered");

        assert_eq!(buffer.last_error().unwrap().message, "second failure");
    }

    #[test]
    fn test_export_csv_quotes() {
        let buffer = LogBuffer::new(10);
        capture(&buffer, || {
            tracing::warn!(reason = "limit", "said \"no\"");
        });

        let csv = buffer.export_csv(LogFilter::default());
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("timestamp,level,message,data"));
        let row = lines.next().unwrap();
        assert!(row.contains(",WARN,\"said \"\"no\"\"\",\"reason=limit\""));
    }
}
