//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::Value;

use travlr_access::{AccessRegistry, Role};
use travlr_core::{DataKey, Did, Timestamp};

/// A DID drawn from a small pool, so generated operations collide.
pub fn did() -> impl Strategy<Value = Did> {
    (0u8..4).prop_map(|n| Did::new(format!("did:example:p{}", n)))
}

/// A data key drawn from a small pool.
pub fn data_key() -> impl Strategy<Value = DataKey> {
    prop_oneof![
        Just(DataKey::from("personal_info")),
        Just(DataKey::from("passport")),
        Just(DataKey::from("itinerary")),
    ]
}

pub fn role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Individual), Just(Role::Organization)]
}

/// Expiry relative to a fixed instant: none, already past, or still ahead.
pub fn expiry(now: Timestamp) -> impl Strategy<Value = Option<Timestamp>> {
    prop_oneof![
        Just(None),
        (1i64..1_000).prop_map(move |d| Some(now - d)),
        (1i64..1_000).prop_map(move |d| Some(now + d)),
    ]
}

/// A JSON value of bounded depth.
pub fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// One mutation of an [`AccessRegistry`].
#[derive(Debug, Clone)]
pub enum RegistryOp {
    Register(Did, Role),
    Grant {
        granter: Did,
        grantee: Did,
        key: DataKey,
        expires_at: Option<Timestamp>,
    },
    Revoke {
        revoker: Did,
        grantee: Did,
        key: DataKey,
    },
    AddDelegation(Did, Did, DataKey),
    RemoveDelegation(Did, Did, DataKey),
}

impl RegistryOp {
    /// Apply the operation.
    pub fn apply(&self, registry: &AccessRegistry) {
        match self {
            RegistryOp::Register(id, role) => registry.register_principal(id, *role),
            RegistryOp::Grant {
                granter,
                grantee,
                key,
                expires_at,
            } => {
                registry.grant_access(granter, grantee, key, *expires_at);
            }
            RegistryOp::Revoke {
                revoker,
                grantee,
                key,
            } => {
                registry.revoke_access(revoker, grantee, key);
            }
            RegistryOp::AddDelegation(from, to, key) => registry.add_delegation(from, to, key),
            RegistryOp::RemoveDelegation(from, to, key) => {
                registry.remove_delegation(from, to, key);
            }
        }
    }
}

/// A single registry operation, with expiries relative to `now`.
pub fn registry_op(now: Timestamp) -> impl Strategy<Value = RegistryOp> {
    prop_oneof![
        (did(), role()).prop_map(|(id, role)| RegistryOp::Register(id, role)),
        (did(), did(), data_key(), expiry(now)).prop_map(|(granter, grantee, key, expires_at)| {
            RegistryOp::Grant {
                granter,
                grantee,
                key,
                expires_at,
            }
        }),
        (did(), did(), data_key()).prop_map(|(revoker, grantee, key)| RegistryOp::Revoke {
            revoker,
            grantee,
            key,
        }),
        (did(), did(), data_key()).prop_map(|(f, t, k)| RegistryOp::AddDelegation(f, t, k)),
        (did(), did(), data_key()).prop_map(|(f, t, k)| RegistryOp::RemoveDelegation(f, t, k)),
    ]
}

/// Up to `max` registry operations.
pub fn registry_ops(now: Timestamp, max: usize) -> impl Strategy<Value = Vec<RegistryOp>> {
    prop::collection::vec(registry_op(now), 0..=max)
}
