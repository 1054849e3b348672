//! Scripted walkthrough of the access lifecycle, run by `travlr-node --demo`.

use serde_json::{json, Map, Value};

use travlr_access::Role;
use travlr_core::{now_millis, DataKey};
use travlr_identity::IdentityProvider;

use crate::error::Result;
use crate::node::Node;

/// One day in milliseconds.
const GRANT_TTL_MS: i64 = 86_400_000;

/// What the walkthrough observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoReport {
    /// Access right after the grant.
    pub granted: bool,
    /// Whether the credential recording the grant verified.
    pub credential_valid: bool,
    /// Access after the organization revoked it.
    pub after_revoke: bool,
}

/// Create an organization and a user, grant the user a day of access to
/// `personal_info` and record the grant as a credential. Then revoke and
/// check again.
pub async fn run(node: &Node) -> Result<DemoReport> {
    let key = DataKey::from("personal_info");
    let credentials = node.credentials();
    let org = credentials.provider().create_identity().await?.did;
    let user = credentials.provider().create_identity().await?.did;
    let registry = node.registry();

    registry.register_principal(&org, Role::Organization).await?;
    registry.register_principal(&user, Role::Individual).await?;
    tracing::info!(%org, %user, "registered principals");

    let expires_at = now_millis() + GRANT_TTL_MS;
    let tx = registry
        .grant_access(&org, &user, &key, Some(expires_at))
        .await?;
    let granted = registry.refresh_access(&user, &key).await?;
    tracing::info!(%tx, granted, "user access after grant");

    let credential = credentials
        .generate(&org, &user, grant_claims(&key, expires_at))
        .await?;
    let credential_valid = credentials.verify(&credential).await?;
    tracing::info!(id = %credential.id, credential_valid, "issued access credential");

    let tx = registry.revoke_access(&org, &user, &key).await?;
    let after_revoke = registry.refresh_access(&user, &key).await?;
    tracing::info!(%tx, after_revoke, "user access after revoke");

    Ok(DemoReport {
        granted,
        credential_valid,
        after_revoke,
    })
}

fn grant_claims(key: &DataKey, expires_at: i64) -> Map<String, Value> {
    let mut claims = Map::new();
    claims.insert("dataKey".into(), json!(key));
    claims.insert("accessGranted".into(), json!(true));
    claims.insert("expirationTime".into(), json!(expires_at));
    claims
}
