//! # Identity Resolver
//!
//! Turns the opaque caller identity handed over by the platform into the
//! username used for ownership checks and owner indexes.
//!
//! ```text
//! "x509::CN=alice,OU=client::CN=ca,O=Org"  ──►  username "alice"   (CommonName)
//! "service-account-7"                      ──►  username as-is     (Raw)
//! ```

use serde::Serialize;

const COMMON_NAME_MARKER: &str = "CN=";

/// Where the resolved username came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NameSource {
    /// First `CN=` segment of the identity string.
    CommonName,
    /// No marker found; the raw identity is the username.
    Raw,
}

/// A resolved caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    raw: String,
    username: String,
    source: NameSource,
}

impl CallerIdentity {
    /// Resolves an opaque identity string. Never fails.
    pub fn resolve(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let (username, source) = match parse_common_name(&raw) {
            Some(name) => (name.to_string(), NameSource::CommonName),
            None => (raw.clone(), NameSource::Raw),
        };
        CallerIdentity {
            raw,
            username,
            source,
        }
    }

    /// The original identity string.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The stable username.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn source(&self) -> NameSource {
        self.source
    }
}

/// Returns the value of the first `CN=` segment, up to the next comma.
pub fn parse_common_name(identity: &str) -> Option<&str> {
    let start = identity.find(COMMON_NAME_MARKER)? + COMMON_NAME_MARKER.len();
    let rest = &identity[start..];
    let end = rest.find(',').unwrap_or(rest.len());
    Some(&rest[..end])
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_common_name_wins() {
        let id = CallerIdentity::resolve(
            "x509::CN=alice,OU=org1+OU=client::CN=fabric-ca-server,OU=Fabric,O=Hyperledger",
        );
        assert_eq!(id.username(), "alice");
        assert_eq!(id.source(), NameSource::CommonName);
    }

    #[test]
    fn test_common_name_at_end_of_string() {
        assert_eq!(parse_common_name("OU=x,CN=bob"), Some("bob"));
    }

    #[test]
    fn test_fallback_to_raw() {
        let id = CallerIdentity::resolve("service-account-7");
        assert_eq!(id.username(), "service-account-7");
        assert_eq!(id.raw(), "service-account-7");
        assert_eq!(id.source(), NameSource::Raw);
    }

    #[test]
    fn test_empty_common_name() {
        let id = CallerIdentity::resolve("CN=,OU=x");
        assert_eq!(id.username(), "");
        assert_eq!(id.source(), NameSource::CommonName);
    }
}
