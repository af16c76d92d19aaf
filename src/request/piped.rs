// ABOUTME: Parsing for piped request entries: KEY|VALUE environment and name|/path mounts.
// ABOUTME: KEY=VALUE and name:/path are accepted as well.

use super::RequestError;

/// One environment variable from a piped list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
}

impl EnvEntry {
    pub fn parse(entry: &str) -> Result<Self, RequestError> {
        // The pipe wins so values may contain '='.
        let (key, value) = entry
            .split_once('|')
            .or_else(|| entry.split_once('='))
            .ok_or_else(|| RequestError::InvalidEnvironment(entry.to_string()))?;

        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(RequestError::InvalidEnvironment(entry.to_string()));
        }

        Ok(EnvEntry {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// `KEY=VALUE`, the form the engine expects.
    pub fn to_engine_format(&self) -> String {
        format!("{}={}", self.key, self.value)
    }
}

/// Parse a whole environment list, failing on the first malformed entry.
pub fn parse_env_list(entries: &[String]) -> Result<Vec<EnvEntry>, RequestError> {
    entries.iter().map(|e| EnvEntry::parse(e)).collect()
}

/// Key of an entry without validating it; used for description lines.
pub(crate) fn env_key(entry: &str) -> &str {
    entry
        .split_once('|')
        .or_else(|| entry.split_once('='))
        .map(|(k, _)| k.trim())
        .unwrap_or(entry.trim())
}

/// A named volume or host path mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

/// Parse `source|/target`, `source:/target` or either with a trailing `|ro` / `:ro`.
pub fn parse_mount(entry: &str) -> Result<MountEntry, RequestError> {
    let sep = if entry.contains('|') { '|' } else { ':' };
    let parts: Vec<&str> = entry.split(sep).map(str::trim).collect();

    let (source, target, read_only) = match parts.as_slice() {
        [source, target] => (*source, *target, false),
        [source, target, "ro"] => (*source, *target, true),
        [source, target, "rw"] => (*source, *target, false),
        _ => return Err(RequestError::InvalidMount(entry.to_string())),
    };

    if source.is_empty() || !target.starts_with('/') {
        return Err(RequestError::InvalidMount(entry.to_string()));
    }

    Ok(MountEntry {
        source: source.to_string(),
        target: target.to_string(),
        read_only,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_pipe_allows_equals_in_value() {
        let entry = EnvEntry::parse("DSN|postgres://u:p@db/app?sslmode=disable").unwrap();
        assert_eq!(entry.key, "DSN");
        assert_eq!(entry.value, "postgres://u:p@db/app?sslmode=disable");
    }

    #[test]
    fn env_accepts_equals_form() {
        let entry = EnvEntry::parse("LOG_LEVEL=debug").unwrap();
        assert_eq!(entry.to_engine_format(), "LOG_LEVEL=debug");
    }

    #[test]
    fn env_allows_empty_value() {
        let entry = EnvEntry::parse("EMPTY|").unwrap();
        assert_eq!(entry.value, "");
    }

    #[test]
    fn env_rejects_missing_separator() {
        assert!(EnvEntry::parse("JUSTAKEY").is_err());
        assert!(EnvEntry::parse("|value").is_err());
    }

    #[test]
    fn env_key_tolerates_malformed_entries() {
        assert_eq!(env_key("A|1"), "A");
        assert_eq!(env_key("B=2"), "B");
        assert_eq!(env_key("C"), "C");
    }

    #[test]
    fn mount_piped_form() {
        let mount = parse_mount("data|/var/lib/app").unwrap();
        assert_eq!(mount.source, "data");
        assert_eq!(mount.target, "/var/lib/app");
        assert!(!mount.read_only);
    }

    #[test]
    fn mount_read_only_suffix() {
        let mount = parse_mount("config:/etc/app:ro").unwrap();
        assert!(mount.read_only);
    }

    #[test]
    fn mount_requires_absolute_target() {
        assert!(parse_mount("data|relative").is_err());
        assert!(parse_mount("|/abs").is_err());
    }
}
