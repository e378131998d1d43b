// The user aggregate, its events, and the in-memory store they write to.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use mini_cqrs_bus::{AggregateEvent, AggregateRoot};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub date_of_birth: NaiveDate,
    pub created_at: DateTime<Utc>,
}

// Read model
#[derive(Clone, Debug, Default)]
pub struct UserStore {
    users: Arc<RwLock<HashMap<Uuid, UserProfile>>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Uuid) -> Option<UserProfile> {
        self.users.read().get(id).cloned()
    }

    pub fn all(&self) -> Vec<UserProfile> {
        let mut users: Vec<_> = self.users.read().values().cloned().collect();
        users.sort_by_key(|user| user.created_at);
        users
    }

    fn insert(&self, user: UserProfile) {
        self.users.write().insert(user.id, user);
    }

    fn remove(&self, id: &Uuid) -> Option<UserProfile> {
        self.users.write().remove(id)
    }
}

// Aggregate
#[derive(Debug)]
pub struct User {
    pub profile: UserProfile,
    root: AggregateRoot,
}

impl User {
    /// Factory: a brand new user, with no event applied yet.
    pub fn new(username: &str, date_of_birth: NaiveDate) -> Self {
        Self {
            profile: UserProfile {
                id: Uuid::new_v4(),
                username: username.to_string(),
                date_of_birth,
                created_at: Utc::now(),
            },
            root: AggregateRoot::new(),
        }
    }

    /// Rebuilds an existing user from its stored profile.
    pub fn existing(profile: UserProfile) -> Self {
        Self {
            profile,
            root: AggregateRoot::new(),
        }
    }

    pub fn root(&self) -> &AggregateRoot {
        &self.root
    }
}

// Events
#[derive(Debug)]
pub struct UserCreated {
    pub user: UserProfile,
    pub store: UserStore,
}

impl AggregateEvent for UserCreated {
    fn handle(&self) -> anyhow::Result<()> {
        let user = serde_json::to_string(&self.user)?;
        tracing::info!(%user, "user created");
        self.store.insert(self.user.clone());
        Ok(())
    }
}

#[derive(Debug)]
pub struct UserDeleted {
    pub id: Uuid,
    pub store: UserStore,
}

impl AggregateEvent for UserDeleted {
    fn handle(&self) -> anyhow::Result<()> {
        match self.store.remove(&self.id) {
            Some(user) => {
                tracing::info!(id = %self.id, username = %user.username, "user deleted");
                Ok(())
            }
            None => Err(anyhow::anyhow!("user `{}` is already gone", self.id)),
        }
    }
}
