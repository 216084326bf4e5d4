use std::sync::OnceLock;

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use ridepool_core::{Address, Batch, UserId, UserProfile};

use crate::app::errors::Rejection;

// -------------------------
// Validation
// -------------------------

/// One failed rule on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
}

impl Violation {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub trait Validate {
    /// Every broken rule, in field order. Empty when the value is acceptable.
    fn violations(&self) -> Vec<Violation>;
}

fn username_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("username pattern is valid"))
}

fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z\x{00C0}-\x{017F}]+[- ]?[a-zA-Z\x{00C0}-\x{017F}]+$")
            .expect("name pattern is valid")
    })
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*$")
            .expect("email pattern is valid")
    })
}

fn phone_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{3}-\d{3}-\d{4}$").expect("phone pattern is valid"))
}

fn location_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9 ,]+$").expect("location pattern is valid"))
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Blank values only report the blank rule; the other rules need content.
struct Rules<'a> {
    out: &'a mut Vec<Violation>,
    field: &'static str,
    value: &'a str,
    blank: bool,
}

impl<'a> Rules<'a> {
    fn for_field(
        out: &'a mut Vec<Violation>,
        field: &'static str,
        value: &'a str,
        blank_message: &str,
    ) -> Self {
        let blank = is_blank(value);
        if blank {
            out.push(Violation::new(field, blank_message));
        }
        Self {
            out,
            field,
            value,
            blank,
        }
    }

    fn check(self, ok: impl FnOnce(&str) -> bool, message: &str) -> Self {
        if !self.blank && !ok(self.value) {
            self.out.push(Violation::new(self.field, message));
        }
        self
    }
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchDto {
    #[serde(default)]
    pub batch_number: u32,
    #[serde(default)]
    pub batch_location: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddressDto {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
}

/// Body of `POST /users` and `PUT /users/:id`.
///
/// Missing string fields deserialize as empty so that they surface as
/// "cannot be blank" violations instead of a JSON error.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    /// Ignored on input; the store assigns ids and `PUT` takes it from the path.
    #[serde(default)]
    pub user_id: Option<u32>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub batch: Option<BatchDto>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub is_driver: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_accepting_rides: bool,
    #[serde(default)]
    pub h_address: Option<AddressDto>,
    #[serde(default)]
    pub w_address: Option<AddressDto>,
}

impl Validate for UserDto {
    fn violations(&self) -> Vec<Violation> {
        let mut out = Vec::new();

        Rules::for_field(&mut out, "userName", &self.user_name, "Username cannot be blank.")
            .check(
                |v| (3..=12).contains(&v.chars().count()),
                "Number of characters must be between 3 and 12.",
            )
            .check(
                |v| username_pattern().is_match(v),
                "Username may only have letters and numbers.",
            );

        match &self.batch {
            None => out.push(Violation::new("batch", "Batch cannot be null.")),
            Some(batch) => {
                Rules::for_field(
                    &mut out,
                    "batch.batchLocation",
                    &batch.batch_location,
                    "Batch location cannot be blank.",
                );
            }
        }

        Rules::for_field(&mut out, "firstName", &self.first_name, "First name cannot be blank.")
            .check(
                |v| v.chars().count() <= 30,
                "Number of characters cannot be larger than 30.",
            )
            .check(
                |v| name_pattern().is_match(v),
                "First name format is incorrect",
            );

        Rules::for_field(&mut out, "lastName", &self.last_name, "Last name cannot be blank.")
            .check(
                |v| v.chars().count() <= 30,
                "Number of characters cannot be larger than 30.",
            )
            .check(
                |v| name_pattern().is_match(v),
                "Last name format is incorrect",
            );

        Rules::for_field(&mut out, "email", &self.email, "Email cannot be blank.").check(
            |v| email_pattern().is_match(v),
            "Email format is incorrect.",
        );

        Rules::for_field(
            &mut out,
            "phoneNumber",
            &self.phone_number,
            "Phone number cannot be blank.",
        )
        .check(
            |v| phone_pattern().is_match(v),
            "Phone number format is incorrect.",
        );

        out
    }
}

impl From<AddressDto> for Address {
    fn from(dto: AddressDto) -> Self {
        Address::new(dto.street, dto.city, dto.state, dto.zip)
    }
}

impl From<UserDto> for UserProfile {
    /// Call only on a validated DTO; a missing batch becomes the default batch.
    fn from(dto: UserDto) -> Self {
        let batch = dto.batch.unwrap_or_default();
        UserProfile {
            user_name: dto.user_name,
            batch: Batch {
                batch_number: batch.batch_number,
                batch_location: batch.batch_location,
            },
            first_name: dto.first_name,
            last_name: dto.last_name,
            email: dto.email,
            phone_number: dto.phone_number,
            is_driver: dto.is_driver,
            is_active: dto.is_active,
            is_accepting_rides: dto.is_accepting_rides,
            h_address: dto.h_address.map(Address::from),
            w_address: dto.w_address.map(Address::from),
        }
    }
}

/// Query string of `GET /users`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct UsersQuery {
    #[serde(rename = "is-driver")]
    pub is_driver: Option<bool>,
    pub username: Option<String>,
    pub location: Option<String>,
}

/// Which lookup a `GET /users` query selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    RoleAndLocation { is_driver: bool, location: String },
    Role(bool),
    Username(String),
    All,
}

impl UsersQuery {
    pub fn filter(self) -> UserFilter {
        match (self.is_driver, self.location, self.username) {
            (Some(is_driver), Some(location), _) => UserFilter::RoleAndLocation {
                is_driver,
                location,
            },
            (Some(is_driver), None, _) => UserFilter::Role(is_driver),
            (None, _, Some(username)) => UserFilter::Username(username),
            (None, _, None) => UserFilter::All,
        }
    }
}

impl Validate for UsersQuery {
    fn violations(&self) -> Vec<Violation> {
        let mut out = Vec::new();
        if let Some(username) = &self.username {
            if !username_pattern().is_match(username) {
                out.push(Violation::new(
                    "username",
                    "Username may only have letters and numbers.",
                ));
            }
        }
        if let Some(location) = &self.location {
            if !location_pattern().is_match(location) {
                out.push(Violation::new(
                    "location",
                    "Batch location may only contain letters, numbers, spaces, and commas",
                ));
            }
        }
        out
    }
}

// -------------------------
// Extractors
// -------------------------

/// JSON body that passed [`Validate`]; rejects with 400 and every violation otherwise.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        reject_violations(value).map(ValidatedJson)
    }
}

/// Query string that passed [`Validate`].
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: serde::de::DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        reject_violations(value).map(ValidatedQuery)
    }
}

fn reject_violations<T: Validate>(value: T) -> Result<T, Rejection> {
    let violations = value.violations();
    if violations.is_empty() {
        Ok(value)
    } else {
        Err(Rejection::Invalid(violations))
    }
}

/// A positive user id taken from the `:id` path segment.
#[derive(Debug, Clone, Copy)]
pub struct UserIdPath(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for UserIdPath
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state).await?;
        raw.parse::<UserId>()
            .map(UserIdPath)
            .map_err(Rejection::InvalidId)
    }
}

// -------------------------
// Response DTOs
// -------------------------

/// Plain-text confirmation returned by `DELETE /users/:id`.
pub fn deleted_message(id: UserId) -> String {
    format!("User with id: {id} was deleted")
}
