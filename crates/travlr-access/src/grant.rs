//! Principal roles, grant records, and delegation edges.

use serde::{Deserialize, Serialize};

use travlr_core::{DataKey, Did, Timestamp};

/// Role a principal is registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A natural person.
    Individual,
    /// An organization. May revoke any grant and may hold delegation edges.
    Organization,
}

impl Role {
    /// Map the boolean flag used on the wire (`isOrganization`).
    pub fn from_is_organization(is_organization: bool) -> Self {
        if is_organization {
            Role::Organization
        } else {
            Role::Individual
        }
    }

    /// Check if this is the organization role.
    pub fn is_organization(self) -> bool {
        matches!(self, Role::Organization)
    }
}

/// A stored grant of read access.
///
/// Keyed by `(data_key, grantee)`: at most one grant exists per pair, and a
/// new grant for the same pair replaces the old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// The key access is granted to.
    pub data_key: DataKey,

    /// Who received access.
    pub grantee: Did,

    /// Who authorized it. Only this principal (or an organization) may revoke.
    pub granted_by: Did,

    /// When the grant stops being honoured (Unix milliseconds), if ever.
    pub expires_at: Option<Timestamp>,

    /// When the grant was recorded locally (Unix milliseconds).
    pub granted_at: Timestamp,
}

impl Grant {
    /// Check if this grant is honoured at `now`.
    ///
    /// A grant with an expiration is honoured strictly before it.
    pub fn is_active(&self, now: Timestamp) -> bool {
        match self.expires_at {
            Some(expires) => expires > now,
            None => true,
        }
    }

    /// Check if this grant has passed its expiration at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        !self.is_active(now)
    }
}

/// A record that `from` may authorize `to` to read `data_key` on its behalf.
///
/// Carries no access by itself; whether it is actionable is re-derived from
/// `from`'s own grant at query time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DelegationEdge {
    /// The delegating principal.
    pub from: Did,
    /// The delegate.
    pub to: Did,
    /// The key the delegation covers.
    pub data_key: DataKey,
}

impl DelegationEdge {
    /// Create a new delegation edge.
    pub fn new(from: Did, to: Did, data_key: DataKey) -> Self {
        Self { from, to, data_key }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(expires_at: Option<Timestamp>) -> Grant {
        Grant {
            data_key: DataKey::from("personal_info"),
            grantee: Did::from("did:example:user1"),
            granted_by: Did::from("did:example:org1"),
            expires_at,
            granted_at: 0,
        }
    }

    #[test]
    fn test_grant_without_expiry_is_always_active() {
        let g = grant(None);
        assert!(g.is_active(0));
        assert!(g.is_active(i64::MAX));
    }

    #[test]
    fn test_grant_expiration_boundary() {
        let g = grant(Some(1000));

        assert!(g.is_active(500)); // Before expiration
        assert!(!g.is_active(1000)); // At expiration
        assert!(g.is_expired(1001)); // After expiration
    }

    #[test]
    fn test_role_wire_flag() {
        assert_eq!(Role::from_is_organization(true), Role::Organization);
        assert_eq!(Role::from_is_organization(false), Role::Individual);
        assert!(Role::Organization.is_organization());
        assert!(!Role::Individual.is_organization());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Organization).unwrap();
        assert_eq!(json, "\"organization\"");
    }
}
