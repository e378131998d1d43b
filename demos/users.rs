//! # Mini CQRS Bus Example: Users
//!
//! A tiny user directory. Commands create and delete users through `User` aggregates whose
//! events write to an in-memory read model; queries read it back. Both buses log every
//! message through `LoggingMiddleware`.
//!
//! ## Usage
//!
//! ```sh
//! RUST_LOG=debug cargo run --example users
//! ```

use chrono::NaiveDate;
use mini_cqrs_bus::{CancellationGuard, CommandBus, LoggingMiddleware, QueryBus, Result};
use tracing_subscriber::EnvFilter;

#[path = "lib/domain.rs"]
mod domain;

#[path = "lib/application.rs"]
mod application;

use application::{
    CreateUser, CreateUserHandler, DeleteUser, DeleteUserHandler, GetAllUsers, GetAllUsersHandler,
    GetUserById, GetUserByIdHandler,
};
use domain::UserStore;

// Startup wiring: any registration error aborts the program.
fn register(commands: &CommandBus, queries: &QueryBus, store: &UserStore) -> Result<()> {
    commands.use_middleware(LoggingMiddleware::new("commands"));
    commands.use_middleware(CancellationGuard);
    queries.use_middleware(LoggingMiddleware::new("queries"));

    commands.register_handler(CreateUserHandler {
        store: store.clone(),
    })?;
    commands.register_handler(DeleteUserHandler {
        store: store.clone(),
    })?;

    queries.register_handler(GetAllUsersHandler {
        store: store.clone(),
    })?;
    queries.register_handler(GetUserByIdHandler {
        store: store.clone(),
    })?;

    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = UserStore::new();
    let commands = CommandBus::global();
    let queries = QueryBus::global();
    register(commands, queries, &store)?;

    for (username, born) in [("jane", "1990-04-12"), ("john", "1985-11-30")] {
        commands.dispatch(&CreateUser {
            username: username.to_string(),
            password: format!("{username}-secret"),
            date_of_birth: born.parse::<NaiveDate>()?,
        })?;
    }

    let users = queries.dispatch(&GetAllUsers)?;
    println!("MAIN: {} users registered", users.len());

    let jane = users.first().ok_or("no users registered")?;
    let found = queries.dispatch(&GetUserById { id: jane.id })?;
    println!("MAIN: found by id: {:?}", found.map(|user| user.username));

    commands.dispatch(&DeleteUser { id: jane.id })?;
    if let Err(err) = commands.dispatch(&DeleteUser { id: jane.id }) {
        println!("MAIN: {err}");
    }

    if let Err(err) = commands.dispatch(&CreateUser {
        username: "john".to_string(),
        password: "another-secret".to_string(),
        date_of_birth: "2000-01-01".parse::<NaiveDate>()?,
    }) {
        println!("MAIN: {err}");
    }

    let remaining = queries.dispatch(&GetAllUsers)?;
    println!(
        "MAIN: remaining users: {:?}",
        remaining.iter().map(|user| &user.username).collect::<Vec<_>>()
    );

    Ok(())
}
