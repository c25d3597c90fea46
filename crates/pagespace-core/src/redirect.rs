//! Open-redirect guard for post-auth return URLs (spec.md §8 testable
//! property 2).
//!
//! A "return URL" is the `?returnTo=` style path the login flow bounces a
//! user back to after a redirect-based auth step. The only safe shape is a
//! same-origin path: no scheme, and no protocol-relative `//host` (browsers
//! treat a leading `//` as "same scheme, different host"). Percent-encoded
//! variants of the same tricks (`/%2f`, `/%5c`) must be caught too, since a
//! naive string check alone would pass them through to a browser that
//! decodes before navigating.

/// Returns `true` iff `url` is safe to redirect to after authentication.
///
/// Per spec.md §8.2, safe means: absent, empty, or a path beginning with
/// `/` that is neither protocol-relative (`//`, `/\`) nor a disguised
/// scheme (`(?i)[a-z]+:`), including after percent-decoding.
#[must_use]
pub fn is_safe_return_url(url: Option<&str>) -> bool {
    match url {
        None => true,
        Some("") => true,
        Some(u) => is_safe_path(u),
    }
}

fn is_safe_path(u: &str) -> bool {
    if !u.starts_with('/') {
        return false;
    }
    if is_protocol_relative_or_scheme(u) {
        return false;
    }
    let decoded = percent_decode(u);
    if decoded != u && is_protocol_relative_or_scheme(&decoded) {
        return false;
    }
    true
}

/// `true` if `u` is `//host`-style, `/\host`-style, or `scheme:...`.
fn is_protocol_relative_or_scheme(u: &str) -> bool {
    let mut chars = u.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if first == '/' {
        if let Some(second) = chars.next() {
            if second == '/' || second == '\\' {
                return true;
            }
        }
    }
    has_scheme_prefix(u)
}

/// `(?i)^[a-z]+:` — a bare scheme prefix, e.g. `javascript:`, `HTTP:`.
fn has_scheme_prefix(u: &str) -> bool {
    let Some(colon) = u.find(':') else {
        return false;
    };
    let prefix = &u[..colon];
    !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphabetic())
}

/// Minimal percent-decoder: only needs to reveal `%2f`/`%2F` → `/` and
/// `%5c`/`%5C` → `\` well enough to catch disguised protocol-relative
/// prefixes; any other byte is passed through undecoded on failure to
/// avoid pulling in a full decoder for a handful of checked characters.
fn percent_decode(u: &str) -> String {
    let bytes = u.as_bytes();
    let mut out = String::with_capacity(u.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte as char);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_and_empty_are_safe() {
        assert!(is_safe_return_url(None));
        assert!(is_safe_return_url(Some("")));
    }

    #[test]
    fn plain_path_is_safe() {
        assert!(is_safe_return_url(Some("/drives/123/pages/456")));
    }

    #[test]
    fn protocol_relative_is_unsafe() {
        assert!(!is_safe_return_url(Some("//evil.example.com")));
        assert!(!is_safe_return_url(Some("/\\evil.example.com")));
    }

    #[test]
    fn encoded_protocol_relative_is_unsafe() {
        assert!(!is_safe_return_url(Some("/%2fevil.example.com")));
        assert!(!is_safe_return_url(Some("/%2Fevil.example.com")));
        assert!(!is_safe_return_url(Some("/%5cevil.example.com")));
    }

    #[test]
    fn scheme_is_unsafe() {
        assert!(!is_safe_return_url(Some("javascript:alert(1)")));
        assert!(!is_safe_return_url(Some("HTTPS://evil.example.com")));
    }

    #[test]
    fn relative_without_leading_slash_is_unsafe() {
        assert!(!is_safe_return_url(Some("evil.example.com")));
        assert!(!is_safe_return_url(Some("drives/123")));
    }

    #[test]
    fn bare_colon_path_segment_is_safe() {
        // A literal colon inside a path segment (not a scheme prefix)
        // must not be flagged — only a leading `letters:` counts.
        assert!(is_safe_return_url(Some("/pages/foo:bar")));
    }
}
