//! Verified identity and caller-supplied request context.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use uuid::Uuid;

/// A role name carried in the `role` claim (e.g. `admin`, `educator`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Create a role from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The role name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The verified identity extracted from an accepted token.
///
/// Built fresh per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The `sub` claim.
    pub subject: String,
    /// The `role` claim, if present.
    pub role: Option<Role>,
    /// Name of the trusted source whose key and claims matched.
    pub source: String,
}

impl Principal {
    /// Create a principal.
    #[must_use]
    pub fn new(subject: impl Into<String>, role: Option<Role>, source: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            role,
            source: source.into(),
        }
    }

    /// Whether this principal holds the given role.
    #[must_use]
    pub fn has_role(&self, role: &Role) -> bool {
        self.role.as_ref() == Some(role)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.role {
            Some(role) => write!(f, "{}[{role}]@{}", self.subject, self.source),
            None => write!(f, "{}@{}", self.subject, self.source),
        }
    }
}

/// Request context supplied by the transport layer for auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    /// Correlation identifier for this request.
    pub request_id: Uuid,
    /// Client address, when known.
    pub source_ip: Option<IpAddr>,
    /// Client user agent, when known.
    pub user_agent: Option<String>,
    /// The endpoint being served (e.g. `GET /children/{id}`).
    pub endpoint: Option<String>,
}

impl RequestMeta {
    /// Create request metadata with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            source_ip: None,
            user_agent: None,
            endpoint: None,
        }
    }

    /// Set the client address.
    #[must_use]
    pub fn with_source_ip(mut self, ip: IpAddr) -> Self {
        self.source_ip = Some(ip);
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_display() {
        let p = Principal::new("u1", Some(Role::new("admin")), "primary");
        assert_eq!(p.to_string(), "u1[admin]@primary");

        let p = Principal::new("u2", None, "partner");
        assert_eq!(p.to_string(), "u2@partner");
    }

    #[test]
    fn test_has_role() {
        let p = Principal::new("u1", Some(Role::new("educator")), "primary");
        assert!(p.has_role(&Role::new("educator")));
        assert!(!p.has_role(&Role::new("admin")));
    }

    #[test]
    fn test_request_meta_builder() {
        let meta = RequestMeta::new()
            .with_source_ip("10.0.0.1".parse().unwrap())
            .with_user_agent("curl/8")
            .with_endpoint("GET /documents/7");

        assert_eq!(meta.user_agent.as_deref(), Some("curl/8"));
        assert_eq!(meta.endpoint.as_deref(), Some("GET /documents/7"));
        assert!(meta.source_ip.is_some());
    }

    #[test]
    fn test_role_serializes_as_string() {
        let json = serde_json::to_string(&Role::new("director")).unwrap();
        assert_eq!(json, "\"director\"");
    }
}
