use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use ridepool_core::User;
use ridepool_infra::{DistanceService, UserService};
use ridepool_observability::Interceptable;

use crate::app::dto::{self, UserDto, UserFilter, UserIdPath, UsersQuery, ValidatedJson, ValidatedQuery};
use crate::app::errors::{ApiError, json_error};
use crate::middleware::Controller;

/// How many drivers `GET /users/driver/:address` returns.
pub const NEAREST_DRIVERS: usize = 5;

const USERS: &str = "/users";
const USER: &str = "/users/:id";
const NEAREST: &str = "/users/driver/:address";

/// Handles `/users`.
pub struct UserController {
    users: Arc<dyn UserService>,
    distances: Arc<dyn DistanceService>,
}

impl UserController {
    pub fn new(users: Arc<dyn UserService>, distances: Arc<dyn DistanceService>) -> Self {
        Self { users, distances }
    }
}

impl Interceptable for UserController {
    fn target(&self) -> &str {
        "UserController"
    }
}

impl Controller for UserController {
    fn routes(self: Arc<Self>) -> Router {
        Router::new()
            .route(USERS, get(get_users).post(add_user))
            .route(
                USER,
                get(get_user_by_id).put(update_user).delete(delete_user_by_id),
            )
            .route(NEAREST, get(get_top_five_drivers))
            .with_state(self)
    }

    fn operation(&self, method: &Method, route: &str) -> Option<&'static str> {
        let name = match (route, method.as_str()) {
            (USERS, "GET") => "get_users",
            (USERS, "POST") => "add_user",
            (USER, "GET") => "get_user_by_id",
            (USER, "PUT") => "update_user",
            (USER, "DELETE") => "delete_user_by_id",
            (NEAREST, "GET") => "get_top_five_drivers",
            _ => return None,
        };
        Some(name)
    }
}

pub async fn get_users(
    State(controller): State<Arc<UserController>>,
    ValidatedQuery(query): ValidatedQuery<UsersQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = &controller.users;
    let found = match query.filter() {
        UserFilter::RoleAndLocation {
            is_driver,
            location,
        } => users.get_user_by_role_and_location(is_driver, &location)?,
        UserFilter::Role(is_driver) => users.get_user_by_role(is_driver)?,
        UserFilter::Username(username) => users.get_user_by_username(&username)?,
        UserFilter::All => users.get_users()?,
    };
    Ok(Json(found))
}

pub async fn get_user_by_id(
    State(controller): State<Arc<UserController>>,
    UserIdPath(id): UserIdPath,
) -> Result<Response, ApiError> {
    Ok(match controller.users.get_user_by_id(id)? {
        Some(user) => Json(user).into_response(),
        None => json_error(StatusCode::NOT_FOUND, "not_found", format!("user {id} not found")),
    })
}

pub async fn add_user(
    State(controller): State<Arc<UserController>>,
    ValidatedJson(body): ValidatedJson<UserDto>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = controller.users.add_user(body.into())?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(controller): State<Arc<UserController>>,
    UserIdPath(id): UserIdPath,
    ValidatedJson(body): ValidatedJson<UserDto>,
) -> Result<Json<User>, ApiError> {
    let user = controller.users.update_user(id, body.into())?;
    Ok(Json(user))
}

pub async fn delete_user_by_id(
    State(controller): State<Arc<UserController>>,
    UserIdPath(id): UserIdPath,
) -> Result<String, ApiError> {
    let user = controller.users.delete_user_by_id(id)?;
    Ok(dto::deleted_message(user.user_id))
}

pub async fn get_top_five_drivers(
    State(controller): State<Arc<UserController>>,
    Path(address): Path<String>,
) -> Result<Json<Vec<User>>, ApiError> {
    let drivers: Vec<(User, String)> = controller
        .users
        .get_active_drivers()?
        .into_iter()
        .filter_map(|driver| {
            let home = driver.profile.h_address.as_ref()?.one_line();
            Some((driver, home))
        })
        .collect();

    if drivers.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let destinations: Vec<String> = drivers.iter().map(|(_, home)| home.clone()).collect();
    let matrix = controller
        .distances
        .distance_matrix(std::slice::from_ref(&address), &destinations)
        .await?;
    let row = matrix
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::internal("distance provider returned no rows"))?;

    tracing::debug!(
        origin = %address,
        candidates = drivers.len(),
        "ranking drivers by distance"
    );

    Ok(Json(nearest(drivers.into_iter().map(|(d, _)| d), row)))
}

/// Drivers ordered by distance, closest first; unroutable ones are dropped.
fn nearest(drivers: impl Iterator<Item = User>, distances: Vec<Option<u64>>) -> Vec<User> {
    let mut ranked: Vec<(u64, User)> = drivers
        .zip(distances)
        .filter_map(|(driver, metres)| Some((metres?, driver)))
        .collect();
    ranked.sort_by_key(|(metres, _)| *metres);
    ranked
        .into_iter()
        .take(NEAREST_DRIVERS)
        .map(|(_, driver)| driver)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridepool_core::{Batch, UserId, UserProfile};

    fn driver(id: u32) -> User {
        User::new(
            UserId::new(id).unwrap(),
            UserProfile {
                user_name: format!("driver{id}"),
                batch: Batch {
                    batch_number: 1,
                    batch_location: "Reston".to_string(),
                },
                first_name: "Dee".to_string(),
                last_name: "Ryver".to_string(),
                email: format!("d{id}@example.com"),
                phone_number: "111-222-3333".to_string(),
                is_driver: true,
                is_active: true,
                is_accepting_rides: true,
                h_address: None,
                w_address: None,
            },
        )
    }

    #[test]
    fn nearest_sorts_and_caps_at_five() {
        let drivers = (1..=7).map(driver);
        let distances = vec![
            Some(700),
            Some(100),
            None,
            Some(300),
            Some(200),
            Some(600),
            Some(500),
        ];

        let ids: Vec<u32> = nearest(drivers, distances)
            .into_iter()
            .map(|u| u.user_id.get())
            .collect();
        assert_eq!(ids, vec![2, 5, 4, 7, 6]);
    }

    #[test]
    fn every_route_names_its_handler() {
        let controller = UserController::new(
            Arc::new(ridepool_infra::InMemoryUserService::new()),
            Arc::new(ridepool_infra::StaticDistanceService::new()),
        );

        assert_eq!(controller.operation(&Method::GET, "/users"), Some("get_users"));
        assert_eq!(controller.operation(&Method::POST, "/users"), Some("add_user"));
        assert_eq!(
            controller.operation(&Method::DELETE, "/users/:id"),
            Some("delete_user_by_id")
        );
        assert_eq!(
            controller.operation(&Method::GET, "/users/driver/:address"),
            Some("get_top_five_drivers")
        );
        assert_eq!(controller.operation(&Method::PATCH, "/users/:id"), None);
    }

    #[test]
    fn nearest_keeps_input_order_on_ties() {
        let ids: Vec<u32> = nearest((1..=3).map(driver), vec![Some(5), Some(5), Some(1)])
            .into_iter()
            .map(|u| u.user_id.get())
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
