//! The in-flight HTTP exchange as seen by the request interceptor.

use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, OriginalUri, Request};
use axum::http::{Method, StatusCode, header};
use futures_util::{StreamExt, stream};

use ridepool_observability::{BodyReadError, RequestContext};

/// Owns the request while a controller call is intercepted.
///
/// The body is buffered on first read and put back as a fresh body holding the
/// same bytes, so the handler still sees an unread request. Past the read limit
/// buffering stops and the handler gets the buffered prefix followed by the
/// unread remainder of the stream.
pub struct HttpExchange {
    remote_addr: String,
    method: Method,
    path: String,
    body_limit: usize,
    request: Mutex<Option<Request>>,
    status: Mutex<Option<StatusCode>>,
}

impl HttpExchange {
    pub fn new(request: Request, body_limit: usize) -> Self {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        // Nested routers see a stripped URI; log the one the client sent.
        let path = request
            .extensions()
            .get::<OriginalUri>()
            .map(|OriginalUri(uri)| uri.path().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());

        Self {
            remote_addr,
            method: request.method().clone(),
            path,
            body_limit,
            request: Mutex::new(Some(request)),
            status: Mutex::new(None),
        }
    }

    /// Hand the request to the next handler. Returns `None` once taken.
    pub fn take_request(&self) -> Option<Request> {
        self.request_slot().take()
    }

    /// Status forced by the interceptor, if any.
    pub fn status_override(&self) -> Option<StatusCode> {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_slot(&self) -> MutexGuard<'_, Option<Request>> {
        self.request.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn declared_length(request: &Request) -> Option<u64> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[async_trait]
impl RequestContext for HttpExchange {
    fn remote_addr(&self) -> String {
        self.remote_addr.clone()
    }

    fn method(&self) -> String {
        self.method.to_string()
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    async fn duplicate_body(&self) -> Result<Bytes, BodyReadError> {
        let request = self.take_request().ok_or(BodyReadError::Consumed)?;
        let limit = self.body_limit;

        if declared_length(&request).is_some_and(|declared| declared > limit as u64) {
            *self.request_slot() = Some(request);
            return Err(BodyReadError::TooLarge { limit });
        }

        let (parts, body) = request.into_parts();
        let mut stream = body.into_data_stream();
        let mut buffered = Vec::new();

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => {
                    buffered.extend_from_slice(&chunk);
                    if buffered.len() > limit {
                        // Stop logging here; the handler gets what was read plus the rest.
                        let rest = Body::from_stream(
                            stream::iter([Ok(Bytes::from(buffered))]).chain(stream),
                        );
                        *self.request_slot() = Some(Request::from_parts(parts, rest));
                        return Err(BodyReadError::TooLarge { limit });
                    }
                }
                Err(e) => {
                    let reason = e.to_string();
                    // Replay the failure so the handler sees the same broken body.
                    let broken = Body::from_stream(stream::iter([
                        Ok(Bytes::from(buffered)),
                        Err(e),
                    ]));
                    *self.request_slot() = Some(Request::from_parts(parts, broken));
                    return Err(BodyReadError::Read(reason.into()));
                }
            }
        }

        let bytes = Bytes::from(buffered);
        *self.request_slot() = Some(Request::from_parts(parts, Body::from(bytes.clone())));
        Ok(bytes)
    }

    fn set_status(&self, status: u16) {
        if let Ok(code) = StatusCode::from_u16(status) {
            *self.status.lock().unwrap_or_else(PoisonError::into_inner) = Some(code);
        }
    }
}
