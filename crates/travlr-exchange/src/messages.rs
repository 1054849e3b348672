//! Wire messages for the data exchange.
//!
//! Messages are JSON objects published on one of two named topics. Field
//! names are camelCase on the wire.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use travlr_core::{DataKey, Did};

use crate::error::{ExchangeError, Result};

/// Message size limits.
pub mod limits {
    /// Max encoded size of one inbound payload.
    pub const MAX_PAYLOAD_BYTES: usize = 4 * 1024 * 1024;
}

/// A named pub/sub channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Requests for a key, answered by any peer holding it.
    DataRequest,
    /// Responses carrying a key's latest value.
    DataResponse,
}

impl Topic {
    /// The channel name on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::DataRequest => "data-request",
            Topic::DataResponse => "data-response",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "data-request" => Ok(Topic::DataRequest),
            "data-response" => Ok(Topic::DataResponse),
            _ => Err(ExchangeError::InvalidMessage(format!("unknown topic: {}", s))),
        }
    }
}

/// Published on [`Topic::DataRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataRequest {
    /// Who is asking.
    #[serde(rename = "requesterDID")]
    pub requester: Did,

    /// What they are asking for.
    #[serde(rename = "dataKey")]
    pub data_key: DataKey,
}

impl DataRequest {
    /// Create a new request.
    pub fn new(requester: Did, data_key: DataKey) -> Self {
        Self {
            requester,
            data_key,
        }
    }
}

/// Published on [`Topic::DataResponse`] (or sent directly to one peer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    /// The principal the data is released to.
    #[serde(rename = "requesterDID")]
    pub requester: Did,

    /// The key the data belongs to.
    #[serde(rename = "dataKey")]
    pub data_key: DataKey,

    /// The record's value.
    pub data: Value,
}

/// Encode a message as a JSON payload.
pub fn encode<M: Serialize>(message: &M) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(message)?))
}

/// Decode a JSON payload, enforcing [`limits::MAX_PAYLOAD_BYTES`].
pub fn decode<M: DeserializeOwned>(payload: &[u8]) -> Result<M> {
    if payload.len() > limits::MAX_PAYLOAD_BYTES {
        return Err(ExchangeError::InvalidMessage(format!(
            "payload of {} bytes exceeds limit",
            payload.len()
        )));
    }
    serde_json::from_slice(payload).map_err(|e| ExchangeError::InvalidMessage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let req = DataRequest::new(Did::from("did:user1"), DataKey::from("personal_info"));
        let value: Value = serde_json::from_slice(&encode(&req).unwrap()).unwrap();

        assert_eq!(
            value,
            json!({"requesterDID": "did:user1", "dataKey": "personal_info"})
        );
    }

    #[test]
    fn test_response_decodes_from_wire() {
        let payload = br#"{"requesterDID":"did:user1","dataKey":"k","data":{"a":[1,2]}}"#;
        let resp: DataResponse = decode(payload).unwrap();

        assert_eq!(resp.requester, Did::from("did:user1"));
        assert_eq!(resp.data, json!({"a": [1, 2]}));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode::<DataRequest>(b"not json"),
            Err(ExchangeError::InvalidMessage(_))
        ));
        assert!(matches!(
            decode::<DataRequest>(br#"{"dataKey":"k"}"#),
            Err(ExchangeError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_payload() {
        let payload = vec![b' '; limits::MAX_PAYLOAD_BYTES + 1];
        assert!(decode::<Value>(&payload).is_err());
    }

    #[test]
    fn test_topic_names() {
        assert_eq!(Topic::DataRequest.to_string(), "data-request");
        assert_eq!("data-response".parse::<Topic>().unwrap(), Topic::DataResponse);
        assert!("other".parse::<Topic>().is_err());
    }
}
