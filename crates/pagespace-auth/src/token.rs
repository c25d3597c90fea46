//! Bearer-token classification and hashing shared by session and MCP
//! validation (spec.md §4.1.2, §3 "Tokens are stored hashed; validation
//! must compare by hash only").

use crate::error::AuthError;

/// Prefix for opaque session bearer tokens (spec.md §3).
pub const SESSION_TOKEN_PREFIX: &str = "ps_sess_";
/// Prefix for opaque MCP machine tokens (spec.md §3).
pub const MCP_TOKEN_PREFIX: &str = "mcp_";

/// Which credential family a bearer token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `ps_sess_*` presented as a bearer header (native clients).
    Session,
    /// `mcp_*`.
    Mcp,
}

/// Classify a raw `Authorization: Bearer <t>` value by prefix.
///
/// # Errors
/// Returns [`AuthError::InvalidTokenFormat`] for anything not matching
/// either known prefix, per spec.md §4.1.2.
pub fn classify_bearer(token: &str) -> Result<TokenKind, AuthError> {
    if token.starts_with(MCP_TOKEN_PREFIX) {
        Ok(TokenKind::Mcp)
    } else if token.starts_with(SESSION_TOKEN_PREFIX) {
        Ok(TokenKind::Session)
    } else {
        Err(AuthError::InvalidTokenFormat)
    }
}

/// Hash a raw token with the server's keyed hash, for at-rest comparison.
///
/// Tokens are never stored or compared in plaintext (spec.md §3): the
/// database only ever sees this digest, so a leaked database dump cannot be
/// replayed as a bearer credential. `key` is the server's token-hashing
/// key, resolved once at startup; using a keyed hash (rather than plain
/// BLAKE3) means an attacker who obtains the digest table cannot brute
/// force tokens offline without also having the key.
#[must_use]
pub fn hash_token(key: &[u8; 32], raw_token: &str) -> String {
    blake3::keyed_hash(key, raw_token.as_bytes())
        .to_hex()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_prefixes() {
        assert_eq!(
            classify_bearer("mcp_abc123").unwrap(),
            TokenKind::Mcp
        );
        assert_eq!(
            classify_bearer("ps_sess_abc123").unwrap(),
            TokenKind::Session
        );
    }

    #[test]
    fn rejects_unknown_prefix() {
        assert!(matches!(
            classify_bearer("Bearer abc"),
            Err(AuthError::InvalidTokenFormat)
        ));
        assert!(matches!(classify_bearer(""), Err(AuthError::InvalidTokenFormat)));
    }

    #[test]
    fn hash_is_deterministic_and_keyed() {
        let key_a = [1u8; 32];
        let key_b = [2u8; 32];
        let h1 = hash_token(&key_a, "ps_sess_xyz");
        let h2 = hash_token(&key_a, "ps_sess_xyz");
        let h3 = hash_token(&key_b, "ps_sess_xyz");
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }
}
