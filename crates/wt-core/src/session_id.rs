//! `SessionId` — opaque short identifier for a terminal session.

use std::fmt;

use uuid::Uuid;

/// Opaque session identifier, rendered as lowercase hex. Always at least 8
/// hex characters (>= 32 bits), generated fresh from >= 64 bits of entropy
/// when the registry creates a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh id from a v4 UUID's 122 bits of randomness, rendered
    /// as its first 16 hex characters (64+ bits of entropy).
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4();
        let hex = uuid.simple().to_string();
        Self(hex[..16].to_string())
    }

    /// Parse a client-supplied id. Accepts any non-empty string of at least
    /// 8 hex characters; anything else is rejected so that path segments
    /// like `favicon.ico` never get treated as a session id to resolve.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() < 8 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_yields_16_hex_chars() {
        let id = SessionId::generate();
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_is_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_rejects_short_ids() {
        assert!(SessionId::parse("abc").is_none());
    }

    #[test]
    fn parse_rejects_non_hex() {
        assert!(SessionId::parse("not-a-hex-id").is_none());
    }

    #[test]
    fn parse_accepts_valid_hex() {
        let id = SessionId::parse("DEADBEEF01234567").unwrap();
        assert_eq!(id.as_str(), "deadbeef01234567");
    }
}
