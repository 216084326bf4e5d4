//! User record storage.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use ridepool_core::{DomainError, Entity, User, UserId, UserProfile};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("user store unavailable: {0}")]
    Storage(String),
}

/// CRUD and query operations over user records.
pub trait UserService: Send + Sync {
    fn get_users(&self) -> Result<Vec<User>, UserServiceError>;
    fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, UserServiceError>;
    fn get_user_by_username(&self, user_name: &str) -> Result<Vec<User>, UserServiceError>;
    fn get_user_by_role(&self, is_driver: bool) -> Result<Vec<User>, UserServiceError>;
    /// Users of the given role whose batch sits at `location`.
    fn get_user_by_role_and_location(
        &self,
        is_driver: bool,
        location: &str,
    ) -> Result<Vec<User>, UserServiceError>;
    /// Drivers that are active and accepting rides.
    fn get_active_drivers(&self) -> Result<Vec<User>, UserServiceError>;
    fn add_user(&self, profile: UserProfile) -> Result<User, UserServiceError>;
    fn update_user(&self, id: UserId, profile: UserProfile) -> Result<User, UserServiceError>;
    /// Remove a user, returning the removed record.
    fn delete_user_by_id(&self, id: UserId) -> Result<User, UserServiceError>;
}

impl<S> UserService for Arc<S>
where
    S: UserService + ?Sized,
{
    fn get_users(&self) -> Result<Vec<User>, UserServiceError> {
        (**self).get_users()
    }

    fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, UserServiceError> {
        (**self).get_user_by_id(id)
    }

    fn get_user_by_username(&self, user_name: &str) -> Result<Vec<User>, UserServiceError> {
        (**self).get_user_by_username(user_name)
    }

    fn get_user_by_role(&self, is_driver: bool) -> Result<Vec<User>, UserServiceError> {
        (**self).get_user_by_role(is_driver)
    }

    fn get_user_by_role_and_location(
        &self,
        is_driver: bool,
        location: &str,
    ) -> Result<Vec<User>, UserServiceError> {
        (**self).get_user_by_role_and_location(is_driver, location)
    }

    fn get_active_drivers(&self) -> Result<Vec<User>, UserServiceError> {
        (**self).get_active_drivers()
    }

    fn add_user(&self, profile: UserProfile) -> Result<User, UserServiceError> {
        (**self).add_user(profile)
    }

    fn update_user(&self, id: UserId, profile: UserProfile) -> Result<User, UserServiceError> {
        (**self).update_user(id, profile)
    }

    fn delete_user_by_id(&self, id: UserId) -> Result<User, UserServiceError> {
        (**self).delete_user_by_id(id)
    }
}

#[derive(Debug, Default)]
struct Users {
    next_id: u32,
    by_id: BTreeMap<UserId, User>,
}

/// In-memory user store for tests/dev. Ids are assigned sequentially from 1.
#[derive(Debug, Default)]
pub struct InMemoryUserService {
    inner: RwLock<Users>,
}

impl InMemoryUserService {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Users) -> T) -> Result<T, UserServiceError> {
        let users = self
            .inner
            .read()
            .map_err(|e| UserServiceError::Storage(e.to_string()))?;
        Ok(f(&users))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut Users) -> Result<T, UserServiceError>,
    ) -> Result<T, UserServiceError> {
        let mut users = self
            .inner
            .write()
            .map_err(|e| UserServiceError::Storage(e.to_string()))?;
        f(&mut users)
    }

    fn filtered(&self, keep: impl Fn(&User) -> bool) -> Result<Vec<User>, UserServiceError> {
        self.read(|users| users.by_id.values().filter(|u| keep(u)).cloned().collect())
    }
}

fn ensure_unique_name(users: &Users, user_name: &str, except: Option<UserId>) -> Result<(), UserServiceError> {
    let taken = users
        .by_id
        .values()
        .any(|u| Some(u.user_id) != except && u.profile.user_name.eq_ignore_ascii_case(user_name));
    if taken {
        return Err(DomainError::conflict(format!("username {user_name} is taken")).into());
    }
    Ok(())
}

impl UserService for InMemoryUserService {
    fn get_users(&self) -> Result<Vec<User>, UserServiceError> {
        self.filtered(|_| true)
    }

    fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, UserServiceError> {
        self.read(|users| users.by_id.get(&id).cloned())
    }

    fn get_user_by_username(&self, user_name: &str) -> Result<Vec<User>, UserServiceError> {
        self.filtered(|u| u.profile.user_name.eq_ignore_ascii_case(user_name))
    }

    fn get_user_by_role(&self, is_driver: bool) -> Result<Vec<User>, UserServiceError> {
        self.filtered(|u| u.profile.is_driver == is_driver)
    }

    fn get_user_by_role_and_location(
        &self,
        is_driver: bool,
        location: &str,
    ) -> Result<Vec<User>, UserServiceError> {
        self.filtered(|u| {
            u.profile.is_driver == is_driver
                && u.profile.batch.batch_location.eq_ignore_ascii_case(location)
        })
    }

    fn get_active_drivers(&self) -> Result<Vec<User>, UserServiceError> {
        self.filtered(User::is_available_driver)
    }

    fn add_user(&self, profile: UserProfile) -> Result<User, UserServiceError> {
        self.write(|users| {
            ensure_unique_name(users, &profile.user_name, None)?;
            let id = UserId::new(users.next_id + 1)?;
            users.next_id = id.get();
            let user = User::new(id, profile);
            users.by_id.insert(*user.id(), user.clone());
            tracing::debug!(user_id = %id, "user added");
            Ok(user)
        })
    }

    fn update_user(&self, id: UserId, profile: UserProfile) -> Result<User, UserServiceError> {
        self.write(|users| {
            if !users.by_id.contains_key(&id) {
                return Err(DomainError::not_found().into());
            }
            ensure_unique_name(users, &profile.user_name, Some(id))?;
            let user = User::new(id, profile);
            users.by_id.insert(id, user.clone());
            tracing::debug!(user_id = %id, "user updated");
            Ok(user)
        })
    }

    fn delete_user_by_id(&self, id: UserId) -> Result<User, UserServiceError> {
        self.write(|users| {
            let removed = users.by_id.remove(&id).ok_or(DomainError::NotFound)?;
            tracing::debug!(user_id = %id, "user deleted");
            Ok(removed)
        })
    }
}
