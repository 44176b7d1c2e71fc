//! Command implementations
//!
//! Each submodule owns one subcommand tree. The helpers here wire the
//! shared pieces together: environment config, the on-disk store and
//! the backend clients.

use anyhow::Result;

use backend::{AuthClient, BackendClient};
use common::config::BackendConfig;
use common::store::LocalStore;
use ::food::{FoodManager, RemoteFoodStore};
use ::tasks::{LocalTaskStore, RemoteTaskStore, TaskManager};

pub mod auth;
pub mod food;
pub mod spending;
pub mod task;
pub mod watch;

pub(crate) struct Context {
    pub client: BackendClient,
    pub auth: AuthClient,
    pub store: LocalStore,
}

pub(crate) fn context() -> Result<Context> {
    let store = LocalStore::default_location()?;
    let client = BackendClient::new(BackendConfig::from_env());
    let auth = AuthClient::new(client.clone(), store.clone());
    Ok(Context {
        client,
        auth,
        store,
    })
}

/// Task manager in the mode the persisted session implies, with
/// remote failures echoed to stderr.
pub(crate) fn task_manager(ctx: &Context) -> TaskManager {
    let remote = RemoteTaskStore::new(ctx.client.clone(), ctx.auth.clone());
    let local = LocalTaskStore::new(ctx.store.clone());
    let mut manager = TaskManager::with_default_mode(remote, local, &ctx.auth);
    manager.on_error(|operation, message| {
        eprintln!("{operation} failed: {message}");
    });
    manager
}

pub(crate) fn food_manager(ctx: &Context) -> FoodManager {
    let remote = RemoteFoodStore::new(ctx.client.clone(), ctx.auth.clone());
    FoodManager::new(remote, ctx.store.clone())
}
