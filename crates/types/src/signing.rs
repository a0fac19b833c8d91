use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::EnvelopeError;

pub const PUBLIC_NETWORK_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
pub const TEST_NETWORK_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Network a transaction is bound to. The passphrase is mixed into every
/// transaction hash so an envelope signed for one network is invalid on another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Network {
    passphrase: String,
}

impl Network {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }

    pub fn public() -> Self {
        Self::new(PUBLIC_NETWORK_PASSPHRASE)
    }

    pub fn testnet() -> Self {
        Self::new(TEST_NETWORK_PASSPHRASE)
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// SHA-256 of the passphrase
    pub fn id(&self) -> [u8; 32] {
        Sha256::digest(self.passphrase.as_bytes()).into()
    }
}

/// Hex-encoded SHA-256 transaction hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHash(String);

impl TransactionHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parse a hex string, normalising to lower case
    pub fn parse(s: &str) -> Result<Self, EnvelopeError> {
        let bytes = hex::decode(s).map_err(|e| EnvelopeError::Encoding(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(EnvelopeError::Encoding(format!(
                "transaction hash must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signature plus the last four bytes of the signer's public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratedSignature {
    pub hint: String,
    pub signature: String,
}

impl DecoratedSignature {
    /// Check this signature against `key` for the given hash payload
    pub fn verify(&self, key: &VerifyingKey, hash: &[u8; 32]) -> Result<(), EnvelopeError> {
        if self.hint != signature_hint(&key.to_bytes()) {
            return Err(EnvelopeError::InvalidSignature("hint mismatch".to_string()));
        }
        let raw = hex::decode(&self.signature)
            .map_err(|e| EnvelopeError::InvalidSignature(e.to_string()))?;
        let signature = Signature::from_slice(&raw)
            .map_err(|e| EnvelopeError::InvalidSignature(e.to_string()))?;
        key.verify(hash, &signature)
            .map_err(|e| EnvelopeError::InvalidSignature(e.to_string()))
    }
}

/// Anything able to sign a transaction hash with an ed25519 key.
///
/// Implemented for [`SigningKey`]; remote signers and HSM adapters implement
/// it on their own handles.
pub trait EnvelopeSigner: Send + Sync {
    fn public_key(&self) -> [u8; 32];

    fn sign_hash(&self, hash: &[u8; 32]) -> [u8; 64];

    fn decorated_signature(&self, hash: &[u8; 32]) -> DecoratedSignature {
        DecoratedSignature {
            hint: signature_hint(&self.public_key()),
            signature: hex::encode(self.sign_hash(hash)),
        }
    }

    fn account_id(&self) -> String {
        account_id(&self.public_key())
    }
}

impl EnvelopeSigner for SigningKey {
    fn public_key(&self) -> [u8; 32] {
        self.verifying_key().to_bytes()
    }

    fn sign_hash(&self, hash: &[u8; 32]) -> [u8; 64] {
        self.sign(hash).to_bytes()
    }
}

/// Account identifier derived from an ed25519 public key
pub fn account_id(public_key: &[u8; 32]) -> String {
    format!("G{}", hex::encode_upper(public_key))
}

fn signature_hint(public_key: &[u8; 32]) -> String {
    hex::encode(&public_key[28..])
}

/// Hash payload: network id, a kind tag, then the canonical body bytes
pub(crate) fn payload_hash(network: &Network, tag: &[u8], body: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(network.id());
    hasher.update(tag);
    hasher.update(body);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    #[test]
    fn test_network_ids_differ() {
        assert_ne!(Network::public().id(), Network::testnet().id());
        assert_eq!(Network::testnet().passphrase(), TEST_NETWORK_PASSPHRASE);
    }

    #[test]
    fn test_transaction_hash_parse() {
        let hash = TransactionHash::from_bytes([0xab; 32]);
        let parsed = TransactionHash::parse(&hash.as_str().to_ascii_uppercase()).unwrap();
        assert_eq!(parsed, hash);

        assert!(TransactionHash::parse("abcd").is_err());
        assert!(TransactionHash::parse("not hex").is_err());
    }

    #[test]
    fn test_signature_verifies() {
        let key = test_key();
        let hash = [3u8; 32];
        let sig = key.decorated_signature(&hash);

        assert!(sig.verify(&key.verifying_key(), &hash).is_ok());
        assert!(sig.verify(&key.verifying_key(), &[4u8; 32]).is_err());
    }

    #[test]
    fn test_signature_rejects_other_key() {
        let key = test_key();
        let other = SigningKey::from_bytes(&[9u8; 32]);
        let sig = key.decorated_signature(&[1u8; 32]);

        assert!(sig.verify(&other.verifying_key(), &[1u8; 32]).is_err());
    }

    #[test]
    fn test_account_id_format() {
        let id = test_key().account_id();
        assert!(id.starts_with('G'));
        assert_eq!(id.len(), 65);
    }
}
