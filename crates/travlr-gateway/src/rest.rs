//! REST gateway: a client for the registry service routes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use travlr_access::Role;
use travlr_core::{DataKey, Did, Timestamp};

use crate::error::{GatewayError, Result};
use crate::traits::RegistryGateway;
use crate::wire::{
    routes, AccessAnswer, DataForwarding, Delegation, DelegationAnswer, GrantAccess, RegisterNode,
    RevokeAccess, TransactionId, TransactionReceipt,
};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A gateway that talks to a registry service over HTTP.
#[derive(Debug, Clone)]
pub struct RestGateway {
    client: Client,
    base_url: String,
}

impl RestGateway {
    /// Create a client for the service at `base_url`, e.g. `http://127.0.0.1:4000`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Url::parse(base_url).map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("travlr-node/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// The service base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str, params: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, route);
        Url::parse_with_params(&raw, params).map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    async fn decode<R: DeserializeOwned>(response: Response) -> Result<R> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    async fn post<B: Serialize + Sync>(&self, route: &str, body: &B) -> Result<TransactionId> {
        let url = self.url(route, &[])?;
        let response = self.client.post(url).json(body).send().await?;
        let receipt: TransactionReceipt = Self::decode(response).await?;

        tracing::debug!(route, tx = %receipt.transaction_id, "registry write accepted");
        Ok(receipt.transaction_id)
    }

    async fn get<R: DeserializeOwned>(&self, route: &str, params: &[(&str, &str)]) -> Result<R> {
        let url = self.url(route, params)?;
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl RegistryGateway for RestGateway {
    /// Probe the service with an access check for an empty principal.
    async fn connect(&self) -> Result<()> {
        let _: AccessAnswer = self
            .get(routes::CHECK_ACCESS, &[("did", ""), ("dataKey", "")])
            .await?;
        tracing::info!(base_url = %self.base_url, "connected to registry service");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn register_principal(&self, id: &Did, role: Role) -> Result<TransactionId> {
        let body = RegisterNode {
            did: id.clone(),
            is_organization: role.is_organization(),
        };
        self.post(routes::REGISTER_NODE, &body).await
    }

    async fn grant_access(
        &self,
        granter: &Did,
        grantee: &Did,
        key: &DataKey,
        expires_at: Option<Timestamp>,
    ) -> Result<TransactionId> {
        let body = GrantAccess {
            granter: granter.clone(),
            grantee: grantee.clone(),
            data_key: key.clone(),
            expires_at,
        };
        self.post(routes::GRANT_ACCESS, &body).await
    }

    async fn revoke_access(&self, revoker: &Did, grantee: &Did, key: &DataKey) -> Result<TransactionId> {
        let body = RevokeAccess {
            revoker: revoker.clone(),
            grantee: grantee.clone(),
            data_key: key.clone(),
        };
        self.post(routes::REVOKE_ACCESS, &body).await
    }

    async fn add_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<TransactionId> {
        let body = Delegation {
            from: from.clone(),
            to: to.clone(),
            data_key: key.clone(),
        };
        self.post(routes::ADD_DELEGATION, &body).await
    }

    async fn remove_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<TransactionId> {
        let body = Delegation {
            from: from.clone(),
            to: to.clone(),
            data_key: key.clone(),
        };
        self.post(routes::REMOVE_DELEGATION, &body).await
    }

    async fn request_data_forwarding(
        &self,
        requester: &Did,
        target: &Did,
        key: &DataKey,
    ) -> Result<TransactionId> {
        let body = DataForwarding {
            requester: requester.clone(),
            target: target.clone(),
            data_key: key.clone(),
        };
        self.post(routes::REQUEST_DATA_FORWARDING, &body).await
    }

    async fn check_access(&self, id: &Did, key: &DataKey) -> Result<bool> {
        let answer: AccessAnswer = self
            .get(
                routes::CHECK_ACCESS,
                &[("did", id.as_str()), ("dataKey", key.as_str())],
            )
            .await?;
        Ok(answer.has_access)
    }

    async fn check_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<bool> {
        let answer: DelegationAnswer = self
            .get(
                routes::CHECK_DELEGATION,
                &[
                    ("fromDID", from.as_str()),
                    ("toDID", to.as_str()),
                    ("dataKey", key.as_str()),
                ],
            )
            .await?;
        Ok(answer.has_delegation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let gateway = RestGateway::new("http://127.0.0.1:4000/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(gateway.base_url(), "http://127.0.0.1:4000");

        let url = gateway
            .url(routes::CHECK_ACCESS, &[("did", "did:example:a b"), ("dataKey", "k")])
            .unwrap();
        assert_eq!(url.path(), "/check-access");
        assert_eq!(url.query(), Some("did=did%3Aexample%3Aa+b&dataKey=k"));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            RestGateway::new("not a url", DEFAULT_TIMEOUT),
            Err(GatewayError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        // Port 9 (discard) is closed on test machines.
        let gateway = RestGateway::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let result = gateway
            .check_access(&Did::from("did:a"), &DataKey::from("k"))
            .await;
        assert!(matches!(result, Err(GatewayError::Http(_))));
    }
}
