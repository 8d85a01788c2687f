//! Time tracker HTTP service library.
//!
//! This crate wires the core and store into transport-agnostic services and
//! exposes them over HTTP.

mod cli;
mod config;
pub mod http;
pub mod service;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use http::{AppState, build_router};
