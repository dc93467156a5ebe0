//! Fire-and-forget telemetry sink.
//!
//! The core emits migration lifecycle and conflict resolution events with a
//! string name and a flat key-value map. Emission never blocks and never
//! fails a caller's operation.

use std::sync::Mutex;

/// Sink for core telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Emit one event. Implementations must not block or panic.
    fn emit(&self, event: &str, params: &[(&str, String)]);
}

/// Production sink that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn emit(&self, event: &str, params: &[(&str, String)]) {
        tracing::info!(target: "selah::telemetry", event, ?params);
    }
}

/// Recording sink that buffers events in memory (primarily for tests).
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<RecordedEvent>>,
}

/// One captured telemetry event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub name: String,
    pub params: Vec<(String, String)>,
}

impl RecordingTelemetry {
    /// All events captured so far, in emission order.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Names of captured events, in emission order.
    pub fn event_names(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.name)
            .collect()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn emit(&self, event: &str, params: &[(&str, String)]) {
        let recorded = RecordedEvent {
            name: event.to_string(),
            params: params
                .iter()
                .map(|(key, value)| ((*key).to_string(), value.clone()))
                .collect(),
        };
        if let Ok(mut events) = self.events.lock() {
            events.push(recorded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_captures_events_in_order() {
        let sink = RecordingTelemetry::default();
        sink.emit("first", &[("count", "1".to_string())]);
        sink.emit("second", &[]);

        assert_eq!(sink.event_names(), vec!["first", "second"]);
        assert_eq!(
            sink.events()[0].params,
            vec![("count".to_string(), "1".to_string())]
        );
    }
}
