//! User records and the value objects hanging off them.

use serde::{Deserialize, Serialize};

use crate::{Entity, UserId};

/// Postal address of a user (home or work).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl Address {
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            state: state.into(),
            zip: zip.into(),
        }
    }

    /// One-line form handed to the distance lookup: `"<street> <city>, <state>"`.
    pub fn one_line(&self) -> String {
        format!("{} {}, {}", self.street, self.city, self.state)
    }
}

/// Training batch a user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub batch_number: u32,
    pub batch_location: String,
}

/// Everything about a user except the identifier.
///
/// This is what clients submit; the store assigns the [`UserId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_name: String,
    pub batch: Batch,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub is_driver: bool,
    pub is_active: bool,
    pub is_accepting_rides: bool,
    pub h_address: Option<Address>,
    pub w_address: Option<Address>,
}

/// A stored user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: UserId,
    #[serde(flatten)]
    pub profile: UserProfile,
}

impl User {
    pub fn new(user_id: UserId, profile: UserProfile) -> Self {
        Self { user_id, profile }
    }

    /// Drivers that are active and accepting rides are eligible for matching.
    pub fn is_available_driver(&self) -> bool {
        self.profile.is_driver && self.profile.is_active && self.profile.is_accepting_rides
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.user_id
    }
}
