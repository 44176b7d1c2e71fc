//! Common library for the Life Assistant application
//!
//! This crate provides shared functionality used across the different
//! crates of the Life Assistant application, including backend
//! configuration, error handling, and the on-disk local store used for
//! offline and unauthenticated use.

pub mod config;
pub mod error;
pub mod store;
