// ABOUTME: Container name validation following the engine's naming rules.
// ABOUTME: Names double as network aliases, so the character set is kept DNS-safe.

use std::fmt;
use thiserror::Error;

/// Longest name we accept; longer names break DNS aliasing on the network.
const MAX_LEN: usize = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerNameError {
    #[error("container name cannot be empty")]
    Empty,

    #[error("container name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("container name must start with a letter or digit")]
    InvalidStart,

    #[error("invalid character in container name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerName(String);

impl ContainerName {
    pub fn new(value: &str) -> Result<Self, ContainerNameError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ContainerNameError::Empty);
        }

        if value.len() > MAX_LEN {
            return Err(ContainerNameError::TooLong);
        }

        if !value.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(ContainerNameError::InvalidStart);
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
                return Err(ContainerNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    /// Join an instance prefix and a container name the way the engine
    /// backend names workloads: `{prefix}-{name}`, or just `name` when the
    /// prefix is empty.
    pub fn prefixed(prefix: &str, name: &str) -> Result<Self, ContainerNameError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            Self::new(name)
        } else {
            Self::new(&format!("{}-{}", prefix, name.trim()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
