//! Distance lookups between free-form addresses.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// One row per origin; each row holds metres to every destination, in order.
/// `None` marks a pair the provider could not route.
pub type DistanceMatrix = Vec<Vec<Option<u64>>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DistanceError {
    #[error("distance request needs at least one origin")]
    NoOrigins,

    #[error("distance provider unavailable: {0}")]
    Unavailable(String),
}

/// Distance-matrix provider.
#[async_trait]
pub trait DistanceService: Send + Sync {
    async fn distance_matrix(
        &self,
        origins: &[String],
        destinations: &[String],
    ) -> Result<DistanceMatrix, DistanceError>;
}

#[async_trait]
impl<S> DistanceService for Arc<S>
where
    S: DistanceService + ?Sized,
{
    async fn distance_matrix(
        &self,
        origins: &[String],
        destinations: &[String],
    ) -> Result<DistanceMatrix, DistanceError> {
        (**self).distance_matrix(origins, destinations).await
    }
}

/// Answers from a preloaded route table (dev/test).
///
/// Routes are symmetric and address matching ignores ASCII case.
#[derive(Debug, Default, Clone)]
pub struct StaticDistanceService {
    routes: HashMap<(String, String), u64>,
}

fn route_key(a: &str, b: &str) -> (String, String) {
    let (a, b) = (a.trim().to_ascii_lowercase(), b.trim().to_ascii_lowercase());
    if a <= b { (a, b) } else { (b, a) }
}

impl StaticDistanceService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, from: &str, to: &str, metres: u64) -> Self {
        self.routes.insert(route_key(from, to), metres);
        self
    }

    pub fn lookup(&self, from: &str, to: &str) -> Option<u64> {
        if from.trim().eq_ignore_ascii_case(to.trim()) {
            return Some(0);
        }
        self.routes.get(&route_key(from, to)).copied()
    }
}

#[async_trait]
impl DistanceService for StaticDistanceService {
    async fn distance_matrix(
        &self,
        origins: &[String],
        destinations: &[String],
    ) -> Result<DistanceMatrix, DistanceError> {
        if origins.is_empty() {
            return Err(DistanceError::NoOrigins);
        }
        Ok(origins
            .iter()
            .map(|o| destinations.iter().map(|d| self.lookup(o, d)).collect())
            .collect())
    }
}
