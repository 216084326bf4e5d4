//! Request interception for controller calls.
//!
//! Every call into an [`Interceptable`] component passes through
//! [`RequestInterceptor::intercept`], which writes access, payload and
//! exception events around the wrapped operation. The interceptor is
//! framework-agnostic: the HTTP layer supplies a [`RequestContext`] and a
//! closure that runs the next handler.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use regex::Regex;
use thiserror::Error;

use crate::sink::{Category, LogEvent, LogSink, Severity};

/// Targets whose identity matches this pattern never have their payload logged.
pub const DEFAULT_SENSITIVE_PATTERN: &str = "Login";

/// A component whose calls are wrapped by the [`RequestInterceptor`].
pub trait Interceptable: Send + Sync {
    /// Identity used in log lines and matched against the sensitive pattern.
    fn target(&self) -> &str;
}

/// Identity of one intercepted call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CallSite<'a> {
    pub target: &'a str,
    pub operation: &'a str,
}

impl<'a> CallSite<'a> {
    pub fn new(target: &'a str, operation: &'a str) -> Self {
        Self { target, operation }
    }

    pub fn of(component: &'a dyn Interceptable, operation: &'a str) -> Self {
        Self::new(component.target(), operation)
    }

    /// Source identifier recorded on every event of this call.
    pub fn source(&self) -> String {
        format!("{}::{}", self.target, self.operation)
    }
}

impl fmt::Display for CallSite<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invoked {}", self.target, self.operation)
    }
}

/// Failure while duplicating the request body for payload logging.
#[derive(Debug, Error)]
pub enum BodyReadError {
    /// The body was already taken by someone else.
    #[error("request body already consumed")]
    Consumed,

    /// The body is over the read limit. The request keeps its full body.
    #[error("request body exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Read(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Access to the in-flight HTTP exchange.
///
/// All methods take `&self`: the interceptor keeps the context borrowed while
/// the wrapped operation runs, and the operation may need the same exchange to
/// get at the request.
#[async_trait]
pub trait RequestContext: Send + Sync {
    fn remote_addr(&self) -> String;

    fn method(&self) -> String;

    fn path(&self) -> String;

    /// Read the whole body without consuming it: after this returns, the
    /// request must still carry an identical, unread body.
    async fn duplicate_body(&self) -> Result<Bytes, BodyReadError>;

    /// Overwrite the status code of the outgoing response.
    fn set_status(&self, status: u16);
}

/// Logs access, payload and failures of controller calls.
#[derive(Clone)]
pub struct RequestInterceptor {
    sink: Arc<dyn LogSink>,
    sensitive: Regex,
}

impl fmt::Debug for RequestInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestInterceptor")
            .field("sensitive", &self.sensitive.as_str())
            .finish_non_exhaustive()
    }
}

impl RequestInterceptor {
    /// Build an interceptor; `sensitive_pattern` is an unanchored regex
    /// matched against each target's identity.
    pub fn new(sink: Arc<dyn LogSink>, sensitive_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            sink,
            sensitive: Regex::new(sensitive_pattern)?,
        })
    }

    pub fn with_default_pattern(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            sensitive: Regex::new(DEFAULT_SENSITIVE_PATTERN).expect("default pattern is valid"),
        }
    }

    pub fn is_sensitive(&self, target: &str) -> bool {
        self.sensitive.is_match(target)
    }

    /// Run `proceed` inside the interception contract.
    ///
    /// Without a request context the operation runs untouched and nothing is
    /// logged. Otherwise: access event, payload event (unless the target is
    /// sensitive), the call itself, and on failure one exception event plus a
    /// 500 status before the original error is handed back.
    pub async fn intercept<R, T, E, F, Fut>(
        &self,
        call: CallSite<'_>,
        request: Option<&R>,
        proceed: F,
    ) -> Result<T, E>
    where
        R: RequestContext + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display + fmt::Debug,
    {
        let Some(request) = request else {
            return proceed().await;
        };

        let source = call.source();
        let now = Utc::now();
        let access = format!(
            "{} made a {} request to {} at {}",
            request.remote_addr(),
            request.method(),
            request.path(),
            now.to_rfc3339(),
        );
        self.sink
            .emit(LogEvent::new(Severity::Trace, Category::Access, &source, access).at(now));

        if !self.is_sensitive(call.target) {
            let payload = self.payload(call, &source, request).await;
            self.sink.emit(LogEvent::new(
                Severity::Trace,
                Category::Payload,
                &source,
                format!("{call} with payload {payload}"),
            ));
        }

        match proceed().await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.sink.emit(
                    LogEvent::new(
                        Severity::Warn,
                        Category::Exception,
                        &source,
                        format!("{call} throwing: {err}"),
                    )
                    .with_error(format!("{err:?}")),
                );
                request.set_status(500);
                Err(err)
            }
        }
    }

    /// Body text for the payload event. Line breaks are dropped, and a read
    /// failure degrades to an empty payload.
    async fn payload<R>(&self, call: CallSite<'_>, source: &str, request: &R) -> String
    where
        R: RequestContext + ?Sized,
    {
        match request.duplicate_body().await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).lines().collect(),
            Err(err) => {
                self.sink.emit(
                    LogEvent::new(
                        Severity::Warn,
                        Category::Exception,
                        source,
                        format!("{} failed to get request body", call.target),
                    )
                    .with_error(err.to_string()),
                );
                String::new()
            }
        }
    }
}
