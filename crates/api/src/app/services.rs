//! Service wiring: the log sink, both interceptors, and the timed backends.

use std::sync::Arc;

use ridepool_infra::{
    DistanceService, InMemoryUserService, StaticDistanceService, TimedDistanceService,
    TimedUserService, UserService,
};
use ridepool_observability::{LogSink, RequestInterceptor, TimingInterceptor, TracingSink};

use crate::config::{ConfigError, Settings};

/// Everything the routers need, composed once at startup.
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<dyn UserService>,
    pub distances: Arc<dyn DistanceService>,
    pub interceptor: Arc<RequestInterceptor>,
    pub body_limit: usize,
}

impl AppServices {
    /// Production wiring: tracing sink, in-memory store, static distance table.
    pub fn build(settings: &Settings) -> Result<Self, ConfigError> {
        Self::compose(
            Arc::new(TracingSink),
            settings,
            InMemoryUserService::new(),
            StaticDistanceService::new(),
        )
    }

    /// Wrap the given backends in timing and set up request interception, all
    /// writing to `sink`.
    pub fn compose<U, D>(
        sink: Arc<dyn LogSink>,
        settings: &Settings,
        users: U,
        distances: D,
    ) -> Result<Self, ConfigError>
    where
        U: UserService + 'static,
        D: DistanceService + 'static,
    {
        settings.validate()?;

        let timing = TimingInterceptor::new(sink.clone());
        let interceptor = RequestInterceptor::new(sink, &settings.sensitive_target_pattern)?;

        tracing::debug!(
            sensitive = %settings.sensitive_target_pattern,
            body_limit = settings.max_logged_body_bytes,
            "composed interception services"
        );

        Ok(Self {
            users: Arc::new(TimedUserService::new(users, timing.clone())),
            distances: Arc::new(TimedDistanceService::new(distances, timing)),
            interceptor: Arc::new(interceptor),
            body_limit: settings.max_logged_body_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridepool_core::{Batch, UserProfile};
    use ridepool_observability::{Category, MemorySink};

    #[test]
    fn composed_user_service_is_timed() {
        let sink = Arc::new(MemorySink::new());
        let services = AppServices::compose(
            sink.clone(),
            &Settings::default(),
            InMemoryUserService::new(),
            StaticDistanceService::new(),
        )
        .unwrap();

        services
            .users
            .add_user(UserProfile {
                user_name: "kim".to_string(),
                batch: Batch {
                    batch_number: 1,
                    batch_location: "Reston".to_string(),
                },
                first_name: "Kim".to_string(),
                last_name: "Lee".to_string(),
                email: "kim@example.com".to_string(),
                phone_number: "111-222-3333".to_string(),
                is_driver: false,
                is_active: true,
                is_accepting_rides: false,
                h_address: None,
                w_address: None,
            })
            .unwrap();

        let perf = sink.by_category(Category::Performance);
        assert_eq!(perf.len(), 1);
        assert_eq!(perf[0].source, "UserService::add_user");
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let settings = Settings {
            sensitive_target_pattern: "(".to_string(),
            ..Settings::default()
        };
        let result = AppServices::compose(
            Arc::new(MemorySink::new()),
            &settings,
            InMemoryUserService::new(),
            StaticDistanceService::new(),
        );
        assert!(matches!(result, Err(ConfigError::Pattern(_))));
    }
}
