// ABOUTME: Resolves the registry host an image is pulled from.
// ABOUTME: Pure function of the request's registry reference and credentials.

use crate::request::RegistryAuth;

/// Host part of the image locator for a request.
///
/// Credentials carry the authoritative registry URL, so their URL wins over
/// the bare reference. The scheme and any trailing slash are dropped. An
/// absent or blank reference yields an empty host, which the engine treats as
/// its default registry.
pub fn resolve_registry_host(registry: Option<&str>, auth: Option<&RegistryAuth>) -> String {
    auth.map(|a| a.url.as_str())
        .filter(|url| !url.trim().is_empty())
        .or(registry)
        .map(normalize_host)
        .unwrap_or_default()
}

fn normalize_host(raw: &str) -> String {
    let raw = raw.trim();
    let without_scheme = raw
        .strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"))
        .unwrap_or(raw);
    without_scheme.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(url: &str) -> RegistryAuth {
        RegistryAuth {
            name: "private".to_string(),
            url: url.to_string(),
            ..RegistryAuth::default()
        }
    }

    #[test]
    fn plain_reference_is_used_as_is() {
        assert_eq!(
            resolve_registry_host(Some("registry.example.com"), None),
            "registry.example.com"
        );
    }

    #[test]
    fn credentials_url_wins() {
        let auth = auth("https://ghcr.io/");
        assert_eq!(
            resolve_registry_host(Some("registry.example.com"), Some(&auth)),
            "ghcr.io"
        );
    }

    #[test]
    fn blank_credentials_url_falls_back_to_reference() {
        let auth = auth("  ");
        assert_eq!(
            resolve_registry_host(Some("http://registry.example.com:5000"), Some(&auth)),
            "registry.example.com:5000"
        );
    }

    #[test]
    fn nothing_resolves_to_default_registry() {
        assert_eq!(resolve_registry_host(None, None), "");
    }

    #[test]
    fn path_component_is_kept() {
        assert_eq!(
            resolve_registry_host(Some("registry.example.com/team"), None),
            "registry.example.com/team"
        );
    }
}
