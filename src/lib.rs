// ABOUTME: Library root for hoist - exposes the deployment pipeline and its building blocks.
// ABOUTME: The main binary is in main.rs.

pub mod backend;
pub mod config;
pub mod deploy;
pub mod error;
pub mod observer;
pub mod output;
pub mod registry;
pub mod request;
pub mod types;
