//! Decorators that put service operations under the [`TimingInterceptor`].
//!
//! Each wrapped operation has its own [`Timed`] marker below; the decorator is
//! applied once, when the services are composed at startup.

use async_trait::async_trait;

use ridepool_core::{User, UserId, UserProfile};
use ridepool_observability::{Timed, TimingInterceptor};

use crate::distance::{DistanceError, DistanceMatrix, DistanceService};
use crate::users::{UserService, UserServiceError};

const USER_SERVICE: &str = "UserService";

pub const GET_USERS: Timed = Timed::new(USER_SERVICE, "get_users");
pub const GET_USER_BY_ID: Timed = Timed::new(USER_SERVICE, "get_user_by_id");
pub const GET_USER_BY_USERNAME: Timed = Timed::new(USER_SERVICE, "get_user_by_username");
pub const GET_USER_BY_ROLE: Timed = Timed::new(USER_SERVICE, "get_user_by_role");
pub const GET_USER_BY_ROLE_AND_LOCATION: Timed =
    Timed::new(USER_SERVICE, "get_user_by_role_and_location");
pub const GET_ACTIVE_DRIVERS: Timed = Timed::new(USER_SERVICE, "get_active_drivers");
pub const ADD_USER: Timed = Timed::new(USER_SERVICE, "add_user");
pub const UPDATE_USER: Timed = Timed::new(USER_SERVICE, "update_user");
pub const DELETE_USER_BY_ID: Timed = Timed::new(USER_SERVICE, "delete_user_by_id");

pub const DISTANCE_MATRIX: Timed = Timed::new("DistanceService", "distance_matrix");

/// [`UserService`] whose every operation is timed.
pub struct TimedUserService<S> {
    inner: S,
    timing: TimingInterceptor,
}

impl<S> TimedUserService<S> {
    pub fn new(inner: S, timing: TimingInterceptor) -> Self {
        Self { inner, timing }
    }
}

impl<S: UserService> UserService for TimedUserService<S> {
    fn get_users(&self) -> Result<Vec<User>, UserServiceError> {
        self.timing.time_blocking(GET_USERS, || self.inner.get_users())
    }

    fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, UserServiceError> {
        self.timing
            .time_blocking(GET_USER_BY_ID, || self.inner.get_user_by_id(id))
    }

    fn get_user_by_username(&self, user_name: &str) -> Result<Vec<User>, UserServiceError> {
        self.timing.time_blocking(GET_USER_BY_USERNAME, || {
            self.inner.get_user_by_username(user_name)
        })
    }

    fn get_user_by_role(&self, is_driver: bool) -> Result<Vec<User>, UserServiceError> {
        self.timing
            .time_blocking(GET_USER_BY_ROLE, || self.inner.get_user_by_role(is_driver))
    }

    fn get_user_by_role_and_location(
        &self,
        is_driver: bool,
        location: &str,
    ) -> Result<Vec<User>, UserServiceError> {
        self.timing.time_blocking(GET_USER_BY_ROLE_AND_LOCATION, || {
            self.inner.get_user_by_role_and_location(is_driver, location)
        })
    }

    fn get_active_drivers(&self) -> Result<Vec<User>, UserServiceError> {
        self.timing
            .time_blocking(GET_ACTIVE_DRIVERS, || self.inner.get_active_drivers())
    }

    fn add_user(&self, profile: UserProfile) -> Result<User, UserServiceError> {
        self.timing.time_blocking(ADD_USER, || self.inner.add_user(profile))
    }

    fn update_user(&self, id: UserId, profile: UserProfile) -> Result<User, UserServiceError> {
        self.timing
            .time_blocking(UPDATE_USER, || self.inner.update_user(id, profile))
    }

    fn delete_user_by_id(&self, id: UserId) -> Result<User, UserServiceError> {
        self.timing
            .time_blocking(DELETE_USER_BY_ID, || self.inner.delete_user_by_id(id))
    }
}

/// [`DistanceService`] whose lookups are timed.
pub struct TimedDistanceService<S> {
    inner: S,
    timing: TimingInterceptor,
}

impl<S> TimedDistanceService<S> {
    pub fn new(inner: S, timing: TimingInterceptor) -> Self {
        Self { inner, timing }
    }
}

#[async_trait]
impl<S: DistanceService> DistanceService for TimedDistanceService<S> {
    async fn distance_matrix(
        &self,
        origins: &[String],
        destinations: &[String],
    ) -> Result<DistanceMatrix, DistanceError> {
        self.timing
            .time(DISTANCE_MATRIX, || {
                self.inner.distance_matrix(origins, destinations)
            })
            .await
    }
}
