//! Tracing setup, the log sink, and the request/timing interceptors.

/// Initialize process-wide tracing output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(format: LogFormat) {
    crate::tracing::init(format);
}

pub mod interceptor;
pub mod sink;
pub mod timing;

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use interceptor::{
    BodyReadError, CallSite, DEFAULT_SENSITIVE_PATTERN, Interceptable, RequestContext,
    RequestInterceptor,
};
pub use sink::{Category, Channel, LogEvent, LogSink, MemorySink, Severity, TracingSink};
pub use timing::{Timed, TimingInterceptor, tier_for};
pub use crate::tracing::{LogFormat, UnknownLogFormat};
