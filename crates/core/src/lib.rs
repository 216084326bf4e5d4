//! `ridepool-core`: user domain building blocks.
//!
//! This crate contains **pure domain** types (no HTTP, no storage).

pub mod entity;
pub mod error;
pub mod id;
pub mod user;

pub use entity::Entity;
pub use error::DomainError;
pub use id::UserId;
pub use user::{Address, Batch, User, UserProfile};
