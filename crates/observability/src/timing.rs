//! Wall-time measurement of operations carrying the [`Timed`] marker.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::sink::{Category, LogEvent, LogSink, Severity};

/// Marker attached to an operation whose duration is logged.
///
/// Markers are declared next to the operation they describe and handed to the
/// [`TimingInterceptor`] when the service is composed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Timed {
    pub target: &'static str,
    pub operation: &'static str,
}

impl Timed {
    pub const fn new(target: &'static str, operation: &'static str) -> Self {
        Self { target, operation }
    }
}

/// Severity tier for a measured duration, or `None` when nothing is logged.
///
/// Calls of two seconds or more fall off the table and go unlogged. This gap
/// is kept as-is for compatibility with existing log consumers.
pub fn tier_for(elapsed_ms: u64) -> Option<Severity> {
    match elapsed_ms {
        0..250 => Some(Severity::Trace),
        250..500 => Some(Severity::Debug),
        500..1000 => Some(Severity::Info),
        1000..2000 => Some(Severity::Warn),
        _ => None,
    }
}

/// Measures marked operations and writes one performance event per success.
#[derive(Clone)]
pub struct TimingInterceptor {
    sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for TimingInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingInterceptor").finish_non_exhaustive()
    }
}

impl TimingInterceptor {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Time an async operation. Failures propagate unlogged.
    pub async fn time<T, E, F, Fut>(&self, marker: Timed, proceed: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let result = proceed().await;
        let elapsed = started.elapsed();
        if result.is_ok() {
            self.record(marker, elapsed);
        }
        result
    }

    /// Time a synchronous operation. Failures propagate unlogged.
    pub fn time_blocking<T, E, F>(&self, marker: Timed, proceed: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let started = Instant::now();
        let result = proceed();
        let elapsed = started.elapsed();
        if result.is_ok() {
            self.record(marker, elapsed);
        }
        result
    }

    fn record(&self, marker: Timed, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let Some(severity) = tier_for(ms) else {
            return;
        };

        self.sink.emit(
            LogEvent::new(
                severity,
                Category::Performance,
                format!("{}::{}", marker.target, marker.operation),
                format!(
                    "{} invoked {} taking {} ms to run",
                    marker.target, marker.operation, ms
                ),
            )
            .with_duration_ms(ms),
        );
    }
}
