//! authproxy — library crate for the binary and integration tests.
//!
//! A loopback HTTP proxy that lets a sandboxed game authenticate against the
//! session and services hosts while only ever holding a placeholder token.

pub mod auth_proxy;
pub mod cli;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod proxy;
