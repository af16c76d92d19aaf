// ABOUTME: Resolved container image location: registry host, name and tag.
// ABOUTME: Built once per request and also parsed from plain references like nginx:1.25.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Tag assumed when a reference carries none.
pub const DEFAULT_TAG: &str = "latest";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseImageLocatorError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

/// Addressable reference to a container image.
///
/// An empty `host` means the engine's default registry. The locator is
/// immutable once built; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageLocator {
    host: String,
    name: String,
    tag: String,
}

impl ImageLocator {
    pub fn new(host: impl Into<String>, name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Parse a reference such as `nginx`, `nginx:1.25` or
    /// `registry.example.com:5000/team/app:v2`.
    pub fn parse(input: &str) -> Result<Self, ParseImageLocatorError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageLocatorError::Empty);
        }

        if let Some(c) = input
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_'))
        {
            return Err(ParseImageLocatorError::InvalidChar(c));
        }

        // A colon after the last slash separates the tag; one before it is a port.
        let (without_tag, tag) = match input.rsplit_once(':') {
            Some((before, after)) if !after.contains('/') => (before, after),
            _ => (input, ""),
        };

        let (host, name) = match without_tag.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (first, rest)
            }
            _ => ("", without_tag),
        };

        if name.is_empty() || name.starts_with('/') || name.ends_with('/') {
            return Err(ParseImageLocatorError::InvalidFormat(input.to_string()));
        }

        Ok(Self::new(host, name, tag))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Tag to pull, falling back to `latest` when the request left it blank.
    pub fn effective_tag(&self) -> &str {
        if self.tag.is_empty() {
            DEFAULT_TAG
        } else {
            &self.tag
        }
    }

    /// `host/name` (or just `name`), without a tag.
    pub fn repository(&self) -> String {
        if self.host.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.host, self.name)
        }
    }
}

impl fmt::Display for ImageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository(), self.effective_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_host() {
        let image = ImageLocator::new("", "nginx", "1.25");
        assert_eq!(image.to_string(), "nginx:1.25");
    }

    #[test]
    fn display_defaults_tag() {
        let image = ImageLocator::new("ghcr.io", "org/app", "");
        assert_eq!(image.to_string(), "ghcr.io/org/app:latest");
        assert_eq!(image.tag(), "");
    }

    #[test]
    fn parse_keeps_registry_port() {
        let image = ImageLocator::parse("localhost:5000/app").unwrap();
        assert_eq!(image.host(), "localhost:5000");
        assert_eq!(image.name(), "app");
        assert_eq!(image.tag(), "");
    }
}
