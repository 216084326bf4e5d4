//! Log events and the sink the interceptors write them to.
//!
//! The sink is passed to each interceptor at construction; nothing here reaches
//! for a global logger.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Graded severity of a log event (`Trace < Debug < Info < Warn`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
}

/// What an event is about.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Access,
    Payload,
    Exception,
    Performance,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Access => "access",
            Category::Payload => "payload",
            Category::Exception => "exception",
            Category::Performance => "performance",
        }
    }

    /// Named channel the category is written to. Payloads share the access channel.
    pub fn channel(&self) -> Channel {
        match self {
            Category::Access | Category::Payload => Channel::Access,
            Category::Exception => Channel::Exception,
            Category::Performance => Channel::Performance,
        }
    }
}

/// Independent output channel of the sink.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Access,
    Exception,
    Performance,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Access => "access",
            Channel::Exception => "exception",
            Channel::Performance => "performance",
        }
    }
}

/// One ephemeral log record produced by an interceptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub category: Category,
    /// `<target>::<operation>` of the intercepted call.
    pub source: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogEvent {
    pub fn new(
        severity: Severity,
        category: Category,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            category,
            source: source.into(),
            message: message.into(),
            duration_ms: None,
            error: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Destination for interceptor output.
///
/// Implementations must accept concurrent `emit` calls from many requests and
/// must not block long enough to distort timing measurements.
pub trait LogSink: Send + Sync {
    fn emit(&self, event: LogEvent);
}

impl<S> LogSink for Arc<S>
where
    S: LogSink + ?Sized,
{
    fn emit(&self, event: LogEvent) {
        (**self).emit(event)
    }
}

/// Forwards events to `tracing`, one target per [`Channel`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

// `tracing` needs the target and level as constants, hence one arm per pair.
macro_rules! emit_on {
    ($target:literal, $event:expr) => {{
        let e = $event;
        let category = e.category.as_str();
        let error = e.error.as_deref();
        match e.severity {
            Severity::Trace => tracing::trace!(target: $target, category, source = %e.source, duration_ms = e.duration_ms, error, "{}", e.message),
            Severity::Debug => tracing::debug!(target: $target, category, source = %e.source, duration_ms = e.duration_ms, error, "{}", e.message),
            Severity::Info => tracing::info!(target: $target, category, source = %e.source, duration_ms = e.duration_ms, error, "{}", e.message),
            Severity::Warn => tracing::warn!(target: $target, category, source = %e.source, duration_ms = e.duration_ms, error, "{}", e.message),
        }
    }};
}

impl LogSink for TracingSink {
    fn emit(&self, event: LogEvent) {
        match event.category.channel() {
            Channel::Access => emit_on!("access", &event),
            Channel::Exception => emit_on!("exception", &event),
            Channel::Performance => emit_on!("performance", &event),
        }
    }
}

/// In-memory sink that keeps every event in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn by_category(&self, category: Category) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.category == category)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl LogSink for MemorySink {
    fn emit(&self, event: LogEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
