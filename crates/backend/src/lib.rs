//! Client for the hosted backend
//!
//! This crate wraps the three surfaces of the hosted
//! backend-as-a-service the application depends on: the auth API
//! (sign-up, sign-in, session refresh), the relational REST API
//! (row CRUD with column filters), and the realtime push channel
//! (row-level change notifications).

pub mod auth;
pub mod client;
pub mod error;
pub mod realtime;
pub mod validation;

pub use auth::{AuthClient, AuthEvent, AuthUser, Session};
pub use client::BackendClient;
pub use error::{BackendError, BackendResult};
pub use realtime::{ChangeEvent, ChangeKind, RealtimeClient, Subscription};
