use url::Url;

const BLOCKED_HOSTNAMES: &[&str] = &["localhost", "localhost.", "0.0.0.0", "::1", "[::1]"];
const BLOCKED_SUFFIXES: &[&str] = &[".localhost", ".local", ".localdomain", ".internal"];

/// Normalizes a stream URL reported by an upstream catalog.
///
/// Protocol-relative URLs are promoted to HTTPS, anything that is not
/// http(s), carries credentials, or points at a loopback-style hostname is
/// dropped. The scheme of absolute URLs is left untouched: players decide
/// whether they can reach plain HTTP streams.
pub fn sanitize_stream_url(raw_url: &str) -> Option<String> {
    let trimmed = raw_url.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized_input = if trimmed.starts_with("//") {
        format!("https:{trimmed}")
    } else {
        trimmed.to_string()
    };

    let parsed = Url::parse(&normalized_input).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return None;
    }
    if parsed.host_str().map_or(true, is_blocked_hostname) {
        return None;
    }

    // Keep the upstream spelling: Url::to_string would add a trailing slash
    // to bare hosts and break exact-match de-duplication.
    if normalized_input.starts_with("https:") || normalized_input.starts_with("http:") {
        Some(normalized_input)
    } else {
        Some(parsed.to_string())
    }
}

/// Logos are cosmetic; blank or non-web values become `None`.
pub fn sanitize_logo_url(raw_url: Option<&str>) -> Option<String> {
    raw_url.and_then(sanitize_stream_url)
}

fn is_blocked_hostname(hostname: &str) -> bool {
    let normalized = hostname.to_ascii_lowercase();
    if normalized.is_empty() || BLOCKED_HOSTNAMES.contains(&normalized.as_str()) {
        return true;
    }
    BLOCKED_SUFFIXES
        .iter()
        .any(|suffix| normalized.ends_with(suffix))
}
