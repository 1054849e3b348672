//! Request and response bodies of the registry service.
//!
//! Shared by the REST client and the service routes so both ends agree on
//! field names.

use std::fmt;

use serde::{Deserialize, Serialize};

use travlr_core::{DataKey, Did, Timestamp};

/// Route paths of the registry service.
pub mod routes {
    pub const REGISTER_NODE: &str = "/register-node";
    pub const GRANT_ACCESS: &str = "/grant-access";
    pub const REVOKE_ACCESS: &str = "/revoke-access";
    pub const ADD_DELEGATION: &str = "/add-delegation";
    pub const REMOVE_DELEGATION: &str = "/remove-delegation";
    pub const REQUEST_DATA_FORWARDING: &str = "/request-data-forwarding";
    pub const CHECK_ACCESS: &str = "/check-access";
    pub const CHECK_DELEGATION: &str = "/check-delegation";
}

/// Identifier of a write accepted by the system of record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `POST /register-node`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterNode {
    pub did: Did,
    #[serde(rename = "isOrganization")]
    pub is_organization: bool,
}

/// Body of `POST /grant-access`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantAccess {
    #[serde(rename = "granterDID")]
    pub granter: Did,
    #[serde(rename = "granteeDID")]
    pub grantee: Did,
    #[serde(rename = "dataKey")]
    pub data_key: DataKey,
    /// Unix milliseconds. Absent means the grant never expires.
    #[serde(
        rename = "expirationTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<Timestamp>,
}

/// Body of `POST /revoke-access`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeAccess {
    #[serde(rename = "revokerDID")]
    pub revoker: Did,
    #[serde(rename = "granteeDID")]
    pub grantee: Did,
    #[serde(rename = "dataKey")]
    pub data_key: DataKey,
}

/// Body of `POST /add-delegation` and `POST /remove-delegation`, and the
/// query of `GET /check-delegation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    #[serde(rename = "fromDID")]
    pub from: Did,
    #[serde(rename = "toDID")]
    pub to: Did,
    #[serde(rename = "dataKey")]
    pub data_key: DataKey,
}

/// Body of `POST /request-data-forwarding`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataForwarding {
    #[serde(rename = "requesterDID")]
    pub requester: Did,
    #[serde(rename = "targetDID")]
    pub target: Did,
    #[serde(rename = "dataKey")]
    pub data_key: DataKey,
}

/// Response of every write route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    #[serde(rename = "transactionId")]
    pub transaction_id: TransactionId,
}

/// Query of `GET /check-access`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckAccess {
    pub did: Did,
    #[serde(rename = "dataKey")]
    pub data_key: DataKey,
}

/// Response of `GET /check-access`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessAnswer {
    #[serde(rename = "hasAccess")]
    pub has_access: bool,
}

/// Response of `GET /check-delegation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationAnswer {
    #[serde(rename = "hasDelegation")]
    pub has_delegation: bool,
}
