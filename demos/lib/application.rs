// Commands, queries and their handlers.

use std::fmt;

use anyhow::anyhow;
use chrono::NaiveDate;
use mini_cqrs_bus::{Command, CommandHandler, Query, QueryHandler, Result};
use uuid::Uuid;

use crate::domain::{User, UserCreated, UserDeleted, UserProfile, UserStore};

const MIN_PASSWORD_LENGTH: usize = 8;

// Commands
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub date_of_birth: NaiveDate,
}

// Keeps the password out of the logs.
impl fmt::Debug for CreateUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUser")
            .field("username", &self.username)
            .field("password", &"***")
            .field("date_of_birth", &self.date_of_birth)
            .finish()
    }
}

impl Command for CreateUser {}

#[derive(Debug)]
pub struct DeleteUser {
    pub id: Uuid,
}

impl Command for DeleteUser {}

// Queries
#[derive(Debug)]
pub struct GetAllUsers;

impl Query for GetAllUsers {
    type Output = Vec<UserProfile>;
}

#[derive(Debug)]
pub struct GetUserById {
    pub id: Uuid,
}

impl Query for GetUserById {
    type Output = Option<UserProfile>;
}

// Command handlers
pub struct CreateUserHandler {
    pub store: UserStore,
}

impl CommandHandler for CreateUserHandler {
    type Command = CreateUser;

    fn handle(&self, command: &CreateUser) -> Result<()> {
        if command.username.trim().is_empty() {
            return Err(anyhow!("username must not be blank").into());
        }
        if command.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(
                anyhow!("password must have at least {MIN_PASSWORD_LENGTH} characters").into(),
            );
        }
        if self
            .store
            .all()
            .iter()
            .any(|user| user.username == command.username)
        {
            return Err(anyhow!("username `{}` is taken", command.username).into());
        }

        let user = User::new(&command.username, command.date_of_birth);
        user.root().apply(UserCreated {
            user: user.profile.clone(),
            store: self.store.clone(),
        })?;
        user.root().commit()
    }
}

pub struct DeleteUserHandler {
    pub store: UserStore,
}

impl CommandHandler for DeleteUserHandler {
    type Command = DeleteUser;

    fn handle(&self, command: &DeleteUser) -> Result<()> {
        let profile = self
            .store
            .get(&command.id)
            .ok_or_else(|| anyhow!("user `{}` not found", command.id))?;

        let user = User::existing(profile);
        user.root().apply(UserDeleted {
            id: user.profile.id,
            store: self.store.clone(),
        })?;
        user.root().commit()
    }
}

// Query handlers
pub struct GetAllUsersHandler {
    pub store: UserStore,
}

impl QueryHandler for GetAllUsersHandler {
    type Query = GetAllUsers;

    fn handle(&self, _query: &GetAllUsers) -> Result<Vec<UserProfile>> {
        Ok(self.store.all())
    }
}

pub struct GetUserByIdHandler {
    pub store: UserStore,
}

impl QueryHandler for GetUserByIdHandler {
    type Query = GetUserById;

    fn handle(&self, query: &GetUserById) -> Result<Option<UserProfile>> {
        Ok(self.store.get(&query.id))
    }
}
