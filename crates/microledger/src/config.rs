//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use microledger_core::{SignatureAlgorithm, SignerIdentity};

/// Configuration for the ledger client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Algorithm for newly generated keys.
    pub algorithm: SignatureAlgorithm,
    /// Identifier type written into every block's controlling identifier.
    pub identifier_type: String,
    /// Identifier value written into every block's controlling identifier.
    pub identifier_value: String,
    /// Location of the PKCS#8 PEM private key.
    pub key_path: PathBuf,
    /// Upper bound on each ledger request, in milliseconds.
    pub request_timeout_ms: u64,
    /// Re-validate a freshly signed block against the tip before submitting.
    pub verify_before_submit: bool,
    /// Validate the whole chain whenever one is fetched for building.
    pub verify_on_fetch: bool,
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn signer_identity(&self) -> SignerIdentity {
        SignerIdentity::new(self.identifier_type.clone(), self.identifier_value.clone())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::Ed25519,
            identifier_type: "Custodian".to_string(),
            identifier_value: "ExampleCustodian".to_string(),
            key_path: PathBuf::from("private_key.pem"),
            request_timeout_ms: 10_000,
            verify_before_submit: true,
            verify_on_fetch: false,
        }
    }
}
