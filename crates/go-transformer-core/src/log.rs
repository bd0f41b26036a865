// crates/go-transformer-core/src/log.rs
// ============================================================================
// Module: Task Logging
// Description: Structured task events and the sinks that record them.
// Purpose: Emit JSON-line progress logs without a logging framework.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Orchestration steps report progress as [`TaskLogEvent`] values routed
//! through a [`TaskLogSink`]. The stderr sink writes one JSON object per line
//! so the invoking pipeline can parse or forward them; stdout stays reserved
//! for tool-chain output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Severity of a task event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Verbose detail, emitted only in debug mode.
    Debug,
    /// Normal progress.
    Info,
    /// Something the operator should look at; the task continues.
    Warn,
}

/// Structured task event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskLogEvent {
    /// Stable event identifier (for example `workspace_resolved`).
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Event severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Event-specific key/value detail.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<&'static str, String>,
}

impl TaskLogEvent {
    /// Creates a new event with a consistent timestamp.
    #[must_use]
    pub fn new(level: LogLevel, event: &'static str, message: impl Into<String>) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            level,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Creates an info-level event.
    #[must_use]
    pub fn info(event: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, event, message)
    }

    /// Creates a warn-level event.
    #[must_use]
    pub fn warn(event: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, event, message)
    }

    /// Creates a debug-level event.
    #[must_use]
    pub fn debug(event: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, event, message)
    }

    /// Attaches a detail field.
    #[must_use]
    pub fn with_field(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.fields.insert(key, value.into());
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for task events.
pub trait TaskLogSink: Send + Sync {
    /// Record a task event.
    fn record(&self, event: &TaskLogEvent);
}

/// Sink that writes JSON lines to stderr.
///
/// # Invariants
/// - Debug-level events are dropped unless `verbose` is set.
pub struct StderrLogSink {
    /// Whether debug-level events are written.
    verbose: bool,
}

impl StderrLogSink {
    /// Creates a stderr sink.
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self {
            verbose,
        }
    }
}

impl TaskLogSink for StderrLogSink {
    fn record(&self, event: &TaskLogEvent) {
        if event.level == LogLevel::Debug && !self.verbose {
            return;
        }
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that keeps events in memory, in arrival order.
#[derive(Default)]
pub struct MemoryLogSink {
    /// Recorded events.
    events: Mutex<Vec<TaskLogEvent>>,
}

impl MemoryLogSink {
    /// Creates an empty memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<TaskLogEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns true when an event with the given identifier was recorded.
    #[must_use]
    pub fn contains(&self, event: &str) -> bool {
        self.events().iter().any(|recorded| recorded.event == event)
    }
}

impl TaskLogSink for MemoryLogSink {
    fn record(&self, event: &TaskLogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
