//! LoginGuard web host — an axum login service in front of `loginguard-core`.
//!
//! The server binary and the `hash_password` tool both build on this library.

pub mod api;
pub mod auth;
pub mod client_ip;
pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod state;
pub mod sweeper;
