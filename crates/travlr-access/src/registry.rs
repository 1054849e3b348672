//! The access registry.
//!
//! Holds principal roles, grants, and delegation edges behind a single
//! lock, and answers authorization queries against the wall clock.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use travlr_core::{now_millis, DataKey, Did, Timestamp};

use crate::grant::{DelegationEdge, Grant, Role};

/// Authorization registry.
///
/// Every operation takes the lock once, so a reader never observes a
/// partially applied write. Nothing here returns an error: an unknown
/// principal or key is indistinguishable from one without access.
#[derive(Debug, Default)]
pub struct AccessRegistry {
    state: RwLock<RegistryState>,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Registered principals.
    roles: HashMap<Did, Role>,

    /// Grants indexed by data key, then grantee.
    grants: HashMap<DataKey, HashMap<Did, Grant>>,

    /// Delegation edges indexed by delegator, then data key.
    delegations: HashMap<Did, HashMap<DataKey, HashSet<Did>>>,
}

impl RegistryState {
    fn is_organization(&self, id: &Did) -> bool {
        self.roles.get(id).is_some_and(|r| r.is_organization())
    }

    fn grant(&self, key: &DataKey, grantee: &Did) -> Option<&Grant> {
        self.grants.get(key).and_then(|by_grantee| by_grantee.get(grantee))
    }

    fn has_access_at(&self, principal: &Did, key: &DataKey, now: Timestamp) -> bool {
        self.grant(key, principal)
            .is_some_and(|grant| grant.is_active(now))
    }

    fn has_edge(&self, from: &Did, to: &Did, key: &DataKey) -> bool {
        self.delegations
            .get(from)
            .and_then(|by_key| by_key.get(key))
            .is_some_and(|delegates| delegates.contains(to))
    }
}

impl AccessRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        // State is only mutated through complete single-step updates, so a
        // poisoned lock still guards consistent data.
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Principals
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a principal, overwriting any previous role.
    pub fn register_principal(&self, id: &Did, role: Role) {
        let previous = self.write().roles.insert(id.clone(), role);
        if previous != Some(role) {
            tracing::debug!(principal = %id, ?role, "registered principal");
        }
    }

    /// Get the role a principal was registered with.
    pub fn role_of(&self, id: &Did) -> Option<Role> {
        self.read().roles.get(id).copied()
    }

    /// Check if a principal is registered as an organization.
    pub fn is_organization(&self, id: &Did) -> bool {
        self.read().is_organization(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grants
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant `grantee` read access to `key`, replacing any prior grant for the
    /// same pair.
    ///
    /// The granter's own authority is not checked here; callers authenticate
    /// and authorize the request before it reaches the registry.
    pub fn grant_access(
        &self,
        granter: &Did,
        grantee: &Did,
        key: &DataKey,
        expires_at: Option<Timestamp>,
    ) -> Grant {
        let grant = Grant {
            data_key: key.clone(),
            grantee: grantee.clone(),
            granted_by: granter.clone(),
            expires_at,
            granted_at: now_millis(),
        };

        self.write()
            .grants
            .entry(key.clone())
            .or_default()
            .insert(grantee.clone(), grant.clone());

        tracing::debug!(%granter, %grantee, %key, ?expires_at, "granted access");
        grant
    }

    /// Revoke `grantee`'s access to `key`.
    ///
    /// Succeeds only when `revoker` is the grant's original granter or is an
    /// organization. Otherwise, or when no grant exists, this is a no-op.
    /// Returns whether a grant was removed.
    pub fn revoke_access(&self, revoker: &Did, grantee: &Did, key: &DataKey) -> bool {
        let mut state = self.write();

        let permitted = match state.grant(key, grantee) {
            Some(grant) => &grant.granted_by == revoker || state.is_organization(revoker),
            None => return false,
        };

        if !permitted {
            tracing::debug!(%revoker, %grantee, %key, "revoke ignored: not granter or organization");
            return false;
        }

        if let Some(by_grantee) = state.grants.get_mut(key) {
            by_grantee.remove(grantee);
            if by_grantee.is_empty() {
                state.grants.remove(key);
            }
        }

        tracing::debug!(%revoker, %grantee, %key, "revoked access");
        true
    }

    /// Check if `principal` can read `key` right now.
    pub fn has_access(&self, principal: &Did, key: &DataKey) -> bool {
        self.has_access_at(principal, key, now_millis())
    }

    /// Check if `principal` can read `key` at the given instant.
    pub fn has_access_at(&self, principal: &Did, key: &DataKey, now: Timestamp) -> bool {
        self.read().has_access_at(principal, key, now)
    }

    /// Get the stored grant for a pair, whether or not it has expired.
    pub fn grant(&self, key: &DataKey, grantee: &Did) -> Option<Grant> {
        self.read().grant(key, grantee).cloned()
    }

    /// List every stored grant held by `grantee`, expired ones included.
    pub fn grants_for(&self, grantee: &Did) -> Vec<Grant> {
        let state = self.read();
        let mut grants: Vec<Grant> = state
            .grants
            .values()
            .filter_map(|by_grantee| by_grantee.get(grantee).cloned())
            .collect();
        grants.sort_by(|a, b| a.data_key.cmp(&b.data_key));
        grants
    }

    /// Remove every grant that has expired at `now`.
    ///
    /// Never called implicitly. Returns how many grants were removed.
    pub fn purge_expired(&self, now: Timestamp) -> usize {
        let mut state = self.write();
        let mut purged = 0;

        state.grants.retain(|_, by_grantee| {
            let before = by_grantee.len();
            by_grantee.retain(|_, grant| grant.is_active(now));
            purged += before - by_grantee.len();
            !by_grantee.is_empty()
        });

        if purged > 0 {
            tracing::info!(purged, "purged expired grants");
        }
        purged
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Delegation
    // ─────────────────────────────────────────────────────────────────────────

    /// Record that `from` intends to let `to` read `key` on its behalf.
    ///
    /// Not validated here; see [`AccessRegistry::can_delegate`].
    pub fn add_delegation(&self, from: &Did, to: &Did, key: &DataKey) {
        self.write()
            .delegations
            .entry(from.clone())
            .or_default()
            .entry(key.clone())
            .or_default()
            .insert(to.clone());
    }

    /// Remove a delegation edge. Returns whether it existed.
    pub fn remove_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> bool {
        let mut state = self.write();

        let Some(by_key) = state.delegations.get_mut(from) else {
            return false;
        };
        let Some(delegates) = by_key.get_mut(key) else {
            return false;
        };

        let removed = delegates.remove(to);
        if delegates.is_empty() {
            by_key.remove(key);
        }
        if by_key.is_empty() {
            state.delegations.remove(from);
        }
        removed
    }

    /// Check if `from` may currently authorize `to` to read `key`.
    ///
    /// Holds only when `from` is an organization, `from` itself has access to
    /// `key` right now, and the edge `(from, to, key)` exists.
    pub fn can_delegate(&self, from: &Did, to: &Did, key: &DataKey) -> bool {
        self.can_delegate_at(from, to, key, now_millis())
    }

    /// [`AccessRegistry::can_delegate`] evaluated at the given instant.
    pub fn can_delegate_at(&self, from: &Did, to: &Did, key: &DataKey, now: Timestamp) -> bool {
        let state = self.read();
        state.is_organization(from)
            && state.has_access_at(from, key, now)
            && state.has_edge(from, to, key)
    }

    /// List the delegation edges recorded for `from`.
    pub fn delegations_from(&self, from: &Did) -> Vec<DelegationEdge> {
        let state = self.read();
        let mut edges: Vec<DelegationEdge> = state
            .delegations
            .get(from)
            .map(|by_key| {
                by_key
                    .iter()
                    .flat_map(|(key, delegates)| {
                        delegates
                            .iter()
                            .map(|to| DelegationEdge::new(from.clone(), to.clone(), key.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        edges.sort_by(|a, b| (&a.data_key, &a.to).cmp(&(&b.data_key, &b.to)));
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DAY_MS: i64 = 86_400_000;

    fn did(s: &str) -> Did {
        Did::from(s)
    }

    fn key(s: &str) -> DataKey {
        DataKey::from(s)
    }

    fn org_and_user() -> (AccessRegistry, Did, Did) {
        let registry = AccessRegistry::new();
        let org = did("did:org1");
        let user = did("did:user1");
        registry.register_principal(&org, Role::Organization);
        registry.register_principal(&user, Role::Individual);
        (registry, org, user)
    }

    #[test]
    fn test_grant_then_revoke_scenario() {
        let (registry, org, user) = org_and_user();
        let k = key("personal_info");

        registry.grant_access(&org, &user, &k, Some(now_millis() + DAY_MS));
        assert!(registry.has_access(&user, &k));

        assert!(registry.revoke_access(&org, &user, &k));
        assert!(!registry.has_access(&user, &k));
    }

    #[test]
    fn test_unknown_principal_and_key_have_no_access() {
        let registry = AccessRegistry::new();
        assert!(!registry.has_access(&did("did:nobody"), &key("nothing")));
        assert!(!registry.can_delegate(&did("a"), &did("b"), &key("c")));
        assert_eq!(registry.role_of(&did("did:nobody")), None);
    }

    #[test]
    fn test_expired_grant_masked_at_query_time() {
        let (registry, org, user) = org_and_user();
        let k = key("k");

        registry.grant_access(&org, &user, &k, Some(1000));

        assert!(registry.has_access_at(&user, &k, 500));
        assert!(!registry.has_access_at(&user, &k, 1000));
        assert!(!registry.has_access_at(&user, &k, 1500));
    }

    #[test]
    fn test_expiry_elapses_without_further_calls() {
        let (registry, org, user) = org_and_user();
        let k = key("k");

        registry.grant_access(&org, &user, &k, Some(now_millis() + 50));
        assert!(registry.has_access(&user, &k));

        std::thread::sleep(std::time::Duration::from_millis(120));
        assert!(!registry.has_access(&user, &k));
    }

    #[test]
    fn test_expired_grant_stays_inspectable_until_purged() {
        let (registry, org, user) = org_and_user();
        let k = key("k");

        registry.grant_access(&org, &user, &k, Some(1000));
        assert!(!registry.has_access_at(&user, &k, 2000));

        let stored = registry.grant(&k, &user).unwrap();
        assert_eq!(stored.granted_by, org);

        assert_eq!(registry.purge_expired(2000), 1);
        assert!(registry.grant(&k, &user).is_none());
    }

    #[test]
    fn test_purge_keeps_active_grants() {
        let (registry, org, user) = org_and_user();

        registry.grant_access(&org, &user, &key("old"), Some(1000));
        registry.grant_access(&org, &user, &key("forever"), None);

        assert_eq!(registry.purge_expired(2000), 1);
        assert!(registry.has_access_at(&user, &key("forever"), 2000));
        assert_eq!(registry.grants_for(&user).len(), 1);
    }

    #[test]
    fn test_new_grant_overwrites_previous() {
        let (registry, org, user) = org_and_user();
        let other = did("did:user2");
        let k = key("k");

        registry.grant_access(&org, &user, &k, Some(1000));
        registry.grant_access(&other, &user, &k, None);

        let stored = registry.grant(&k, &user).unwrap();
        assert_eq!(stored.granted_by, other);
        assert_eq!(stored.expires_at, None);
        assert!(registry.has_access_at(&user, &k, 5000));
    }

    #[test]
    fn test_revoke_by_non_granter_individual_is_noop() {
        let (registry, org, user) = org_and_user();
        let stranger = did("did:user2");
        registry.register_principal(&stranger, Role::Individual);
        let k = key("k");

        registry.grant_access(&org, &user, &k, None);
        assert!(!registry.revoke_access(&stranger, &user, &k));
        assert!(registry.has_access(&user, &k));
    }

    #[test]
    fn test_revoke_by_original_individual_granter() {
        let (registry, _org, user) = org_and_user();
        let friend = did("did:user2");
        let k = key("k");

        registry.grant_access(&user, &friend, &k, None);
        assert!(registry.revoke_access(&user, &friend, &k));
        assert!(!registry.has_access(&friend, &k));
    }

    #[test]
    fn test_any_organization_may_revoke() {
        let (registry, _org, user) = org_and_user();
        let other_org = did("did:org2");
        registry.register_principal(&other_org, Role::Organization);
        let friend = did("did:user2");
        let k = key("k");

        registry.grant_access(&user, &friend, &k, None);
        assert!(registry.revoke_access(&other_org, &friend, &k));
        assert!(!registry.has_access(&friend, &k));
    }

    #[test]
    fn test_revoke_missing_grant_is_noop() {
        let (registry, org, user) = org_and_user();
        assert!(!registry.revoke_access(&org, &user, &key("never-granted")));
    }

    #[test]
    fn test_reregistration_overwrites_role() {
        let registry = AccessRegistry::new();
        let id = did("did:x");

        registry.register_principal(&id, Role::Organization);
        registry.register_principal(&id, Role::Individual);

        assert_eq!(registry.role_of(&id), Some(Role::Individual));
        assert!(!registry.is_organization(&id));
    }

    #[test]
    fn test_can_delegate_requires_all_three_conditions() {
        let (registry, org, user) = org_and_user();
        let k = key("k");

        registry.grant_access(&org, &org, &k, None);
        registry.add_delegation(&org, &user, &k);
        assert!(registry.can_delegate(&org, &user, &k));

        // Edge removed
        assert!(registry.remove_delegation(&org, &user, &k));
        assert!(!registry.can_delegate(&org, &user, &k));
        registry.add_delegation(&org, &user, &k);

        // Access revoked
        registry.revoke_access(&org, &org, &k);
        assert!(!registry.can_delegate(&org, &user, &k));
        registry.grant_access(&org, &org, &k, None);

        // No longer an organization
        registry.register_principal(&org, Role::Individual);
        assert!(!registry.can_delegate(&org, &user, &k));
    }

    #[test]
    fn test_delegation_confers_no_access() {
        let (registry, org, user) = org_and_user();
        let k = key("k");

        registry.grant_access(&org, &org, &k, None);
        registry.add_delegation(&org, &user, &k);

        assert!(registry.can_delegate(&org, &user, &k));
        assert!(!registry.has_access(&user, &k));
    }

    #[test]
    fn test_can_delegate_follows_granter_expiry() {
        let (registry, org, user) = org_and_user();
        let k = key("k");

        registry.grant_access(&org, &org, &k, Some(1000));
        registry.add_delegation(&org, &user, &k);

        assert!(registry.can_delegate_at(&org, &user, &k, 999));
        assert!(!registry.can_delegate_at(&org, &user, &k, 1000));
    }

    #[test]
    fn test_delegations_from_lists_edges() {
        let (registry, org, user) = org_and_user();
        registry.add_delegation(&org, &user, &key("b"));
        registry.add_delegation(&org, &user, &key("a"));

        let edges = registry.delegations_from(&org);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].data_key, key("a"));
        assert!(!registry.remove_delegation(&user, &org, &key("a")));
    }

    proptest! {
        #[test]
        fn prop_future_grant_gives_access(
            offset in 1i64..=10_000_000,
            now in 0i64..=1_700_000_000_000,
        ) {
            let (registry, org, user) = org_and_user();
            let k = key("k");

            registry.grant_access(&org, &user, &k, Some(now + offset));
            prop_assert!(registry.has_access_at(&user, &k, now));
            prop_assert!(!registry.has_access_at(&user, &k, now + offset));
        }

        #[test]
        fn prop_can_delegate_is_conjunction(
            is_org in any::<bool>(),
            granted in any::<bool>(),
            edge in any::<bool>(),
        ) {
            let registry = AccessRegistry::new();
            let from = did("did:from");
            let to = did("did:to");
            let k = key("k");

            registry.register_principal(&from, Role::from_is_organization(is_org));
            if granted {
                registry.grant_access(&from, &from, &k, None);
            }
            if edge {
                registry.add_delegation(&from, &to, &k);
            }

            prop_assert_eq!(registry.can_delegate(&from, &to, &k), is_org && granted && edge);
        }
    }
}
