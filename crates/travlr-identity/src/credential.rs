//! Signed credentials and the self-certifying DIDs that issue them.
//!
//! An issuer DID is `did:travlr:<hex ed25519 public key>`, so a credential
//! can be checked without asking anyone for the issuer's key. The credential
//! id is the Blake3 hash of the signed bytes.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use travlr_core::{Did, Timestamp};

use crate::error::{IdentityError, Result};

/// DID method prefix of identities created here.
pub const DID_PREFIX: &str = "did:travlr:";

/// Proof type written into every credential.
pub const PROOF_TYPE: &str = "Ed25519Signature2020";

/// The DID naming `key`.
pub fn did_for(key: &VerifyingKey) -> Did {
    Did::new(format!("{}{}", DID_PREFIX, hex::encode(key.to_bytes())))
}

/// Recover the public key named by a `did:travlr:` DID.
pub fn verifying_key_of(did: &Did) -> Option<VerifyingKey> {
    let encoded = did.as_str().strip_prefix(DID_PREFIX)?;
    let bytes: [u8; 32] = hex::decode(encoded).ok()?.try_into().ok()?;
    VerifyingKey::from_bytes(&bytes).ok()
}

/// A DID together with its public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub did: Did,
    /// Hex-encoded Ed25519 public key.
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

impl Identity {
    pub(crate) fn from_key(key: &VerifyingKey) -> Self {
        Self {
            did: did_for(key),
            public_key: hex::encode(key.to_bytes()),
        }
    }
}

/// Who a credential is about, and what it says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialSubject {
    pub id: Did,
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

/// Signature over the rest of the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    #[serde(rename = "type")]
    pub kind: String,
    /// Hex-encoded Ed25519 signature.
    #[serde(rename = "signatureValue")]
    pub signature: String,
}

/// A signed statement by `issuer` about `credential_subject.id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub issuer: Did,
    #[serde(rename = "issuanceDate")]
    pub issued_at: Timestamp,
    #[serde(rename = "credentialSubject")]
    pub credential_subject: CredentialSubject,
    pub proof: Proof,
}

#[derive(Serialize)]
struct Unsigned<'a> {
    issuer: &'a Did,
    #[serde(rename = "issuanceDate")]
    issued_at: Timestamp,
    #[serde(rename = "credentialSubject")]
    credential_subject: &'a CredentialSubject,
}

fn signed_bytes(issuer: &Did, issued_at: Timestamp, subject: &CredentialSubject) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&Unsigned {
        issuer,
        issued_at,
        credential_subject: subject,
    })?)
}

impl Credential {
    /// Sign `claims` about `subject` with `key`.
    ///
    /// `id` is reserved for the subject and may not appear among the claims.
    pub fn issue(
        key: &SigningKey,
        subject: &Did,
        claims: Map<String, Value>,
        issued_at: Timestamp,
    ) -> Result<Self> {
        if claims.contains_key("id") {
            return Err(IdentityError::InvalidClaims("\"id\" is reserved for the subject".into()));
        }

        let issuer = did_for(&key.verifying_key());
        let credential_subject = CredentialSubject {
            id: subject.clone(),
            claims,
        };
        let message = signed_bytes(&issuer, issued_at, &credential_subject)?;
        let signature = key.sign(&message);

        Ok(Self {
            id: blake3::hash(&message).to_hex().to_string(),
            issuer,
            issued_at,
            credential_subject,
            proof: Proof {
                kind: PROOF_TYPE.to_owned(),
                signature: hex::encode(signature.to_bytes()),
            },
        })
    }

    /// The subject's DID.
    pub fn subject(&self) -> &Did {
        &self.credential_subject.id
    }

    /// The claims, without the subject id.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.credential_subject.claims
    }

    /// Check the id and the issuer's signature.
    ///
    /// Any change to the issuer, issuance time, subject or claims after
    /// signing makes this return `false`.
    pub fn verify(&self) -> bool {
        if self.proof.kind != PROOF_TYPE {
            return false;
        }
        let Some(key) = verifying_key_of(&self.issuer) else {
            return false;
        };
        let Ok(message) = signed_bytes(&self.issuer, self.issued_at, &self.credential_subject) else {
            return false;
        };
        if blake3::hash(&message).to_hex().as_str() != self.id {
            return false;
        }
        let Some(signature) = hex::decode(&self.proof.signature)
            .ok()
            .and_then(|bytes| Signature::from_slice(&bytes).ok())
        else {
            return false;
        };

        key.verify(&message, &signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn claims() -> Map<String, Value> {
        let Value::Object(map) = json!({"dataKey": "personal_info", "accessGranted": true}) else {
            unreachable!()
        };
        map
    }

    #[test]
    fn test_did_names_the_key() {
        let key = key();
        let did = did_for(&key.verifying_key());
        assert!(did.as_str().starts_with(DID_PREFIX));
        assert_eq!(verifying_key_of(&did), Some(key.verifying_key()));
        assert_eq!(verifying_key_of(&Did::from("did:example:org1")), None);
        assert_eq!(verifying_key_of(&Did::from("did:travlr:abcd")), None);
    }

    #[test]
    fn test_issue_and_verify() {
        let subject = Did::from("did:example:user1");
        let credential = Credential::issue(&key(), &subject, claims(), 1_000).unwrap();

        assert!(credential.verify());
        assert_eq!(credential.subject(), &subject);
        assert_eq!(credential.claims()["dataKey"], json!("personal_info"));
        assert_eq!(credential.id.len(), 64);
    }

    #[test]
    fn test_wire_shape() {
        let credential =
            Credential::issue(&key(), &Did::from("did:example:user1"), claims(), 1_000).unwrap();
        let value = serde_json::to_value(&credential).unwrap();

        assert_eq!(value["credentialSubject"]["id"], json!("did:example:user1"));
        assert_eq!(value["credentialSubject"]["accessGranted"], json!(true));
        assert_eq!(value["issuanceDate"], json!(1_000));
        assert_eq!(value["proof"]["type"], json!(PROOF_TYPE));

        let back: Credential = serde_json::from_value(value).unwrap();
        assert_eq!(back, credential);
        assert!(back.verify());
    }

    #[test]
    fn test_tampering_is_detected() {
        let original =
            Credential::issue(&key(), &Did::from("did:example:user1"), claims(), 1_000).unwrap();

        let mut claims_changed = original.clone();
        claims_changed
            .credential_subject
            .claims
            .insert("accessGranted".into(), json!(false));
        assert!(!claims_changed.verify());

        let mut subject_changed = original.clone();
        subject_changed.credential_subject.id = Did::from("did:example:mallory");
        assert!(!subject_changed.verify());

        let mut reissued = original.clone();
        reissued.issued_at += 1;
        assert!(!reissued.verify());

        let other = SigningKey::from_bytes(&[9u8; 32]);
        let mut issuer_changed = original.clone();
        issuer_changed.issuer = did_for(&other.verifying_key());
        assert!(!issuer_changed.verify());

        let mut bad_signature = original.clone();
        bad_signature.proof.signature = "00".repeat(64);
        assert!(!bad_signature.verify());

        let mut bad_id = original;
        bad_id.id = "0".repeat(64);
        assert!(!bad_id.verify());
    }

    #[test]
    fn test_subject_id_claim_is_rejected() {
        let mut claims = claims();
        claims.insert("id".into(), json!("did:example:other"));
        let result = Credential::issue(&key(), &Did::from("did:example:user1"), claims, 0);
        assert!(matches!(result, Err(IdentityError::InvalidClaims(_))));
    }
}
