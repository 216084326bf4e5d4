//! Infrastructure layer: user storage, distance lookups, timed decorators.

pub mod distance;
pub mod timed;
pub mod users;

pub use distance::{DistanceError, DistanceMatrix, DistanceService, StaticDistanceService};
pub use timed::{TimedDistanceService, TimedUserService};
pub use users::{InMemoryUserService, UserService, UserServiceError};
