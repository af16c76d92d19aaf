// ABOUTME: Application-wide error type for the hoist binary and library entry points.
// ABOUTME: Wraps config, request and pipeline failures with thiserror.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::DeployError;
use crate::request::RequestError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid deployment request: {0}")]
    Request(#[from] RequestError),

    #[error("container engine unavailable: {0}")]
    Engine(String),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("deployment finished with {0} failed phase(s)")]
    PhaseFailures(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
