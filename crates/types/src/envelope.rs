use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::signing::payload_hash;
use crate::{DecoratedSignature, EnvelopeSigner, Network, TransactionHash, MAX_OPERATIONS};

const TX_TAG: &[u8] = b"tx";
const FEE_BUMP_TAG: &[u8] = b"tx_fee_bump";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("transaction has no operations")]
    MissingOperation,

    #[error("too many operations: {0}")]
    TooManyOperations(usize),

    #[error("invalid time bounds: min {min} is after max {max}")]
    InvalidTimeBounds { min: u64, max: u64 },

    #[error("at least one signer is required")]
    NoSigners,

    #[error("fee bump max fee {max_fee} is below inner fee {inner_fee}")]
    FeeBumpTooLow { max_fee: u64, inner_fee: u64 },

    #[error("a fee bump cannot wrap another fee bump")]
    NestedFeeBump,

    #[error("fee bump envelopes must be rebuilt from their inner transaction")]
    FeeBumpRebuild,

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Validity window of a transaction (Unix seconds, inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeBounds {
    /// Earliest close time; 0 means no lower bound
    pub min_time: u64,

    /// Latest close time; `None` means the envelope never expires
    pub max_time: Option<u64>,
}

impl TimeBounds {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn until(max_time: u64) -> Self {
        Self {
            min_time: 0,
            max_time: Some(max_time),
        }
    }

    pub fn between(min_time: u64, max_time: u64) -> Self {
        Self {
            min_time,
            max_time: Some(max_time),
        }
    }

    /// True once `now` is past the max time. Unbounded envelopes never expire.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.max_time.is_some_and(|max| now > max)
    }

    pub fn is_premature_at(&self, now: u64) -> bool {
        self.min_time > 0 && now < self.min_time
    }

    fn validate(&self) -> Result<(), EnvelopeError> {
        match self.max_time {
            Some(max) if max < self.min_time => Err(EnvelopeError::InvalidTimeBounds {
                min: self.min_time,
                max,
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    Native,
    Credit { code: String, issuer: String },
}

/// Ledger operation carried by a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    CreateAccount {
        destination: String,
        starting_balance: u64,
    },
    Payment {
        destination: String,
        asset: Asset,
        amount: u64,
    },
    BumpSequence {
        bump_to: u64,
    },
    ManageData {
        name: String,
        value: Option<String>,
    },
}

/// Unsigned transaction content. Field order is the canonical encoding order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub source_account: String,
    pub fee: u32,
    pub sequence_number: u64,
    pub time_bounds: TimeBounds,
    pub memo: Option<String>,
    pub operations: Vec<Operation>,
}

impl TransactionBody {
    /// Copy of this body with a new sequence number and validity window
    pub fn rebuilt(&self, sequence_number: u64, time_bounds: TimeBounds) -> Self {
        Self {
            sequence_number,
            time_bounds,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.operations.is_empty() {
            return Err(EnvelopeError::MissingOperation);
        }
        if self.operations.len() > MAX_OPERATIONS {
            return Err(EnvelopeError::TooManyOperations(self.operations.len()));
        }
        self.time_bounds.validate()
    }

    pub fn hash_bytes(&self, network: &Network) -> Result<[u8; 32], EnvelopeError> {
        let body = canonical_bytes(self)?;
        Ok(payload_hash(network, TX_TAG, &body))
    }

    /// Validate, hash and sign this body
    pub fn sign(
        self,
        network: &Network,
        signers: &[&dyn EnvelopeSigner],
    ) -> Result<SignedTransaction, EnvelopeError> {
        self.validate()?;
        if signers.is_empty() {
            return Err(EnvelopeError::NoSigners);
        }
        let hash = self.hash_bytes(network)?;
        let signatures = signers
            .iter()
            .map(|s| s.decorated_signature(&hash))
            .collect();
        Ok(SignedTransaction {
            body: self,
            signatures,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub body: TransactionBody,
    pub signatures: Vec<DecoratedSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBumpBody {
    pub fee_source: String,
    pub max_fee: u64,
    pub inner: SignedTransaction,
}

/// Wrapper raising the effective fee of an inner transaction without touching it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBumpTransaction {
    pub body: FeeBumpBody,
    pub signatures: Vec<DecoratedSignature>,
}

/// Signed payload submitted to the ledger.
///
/// Resubmission is only safe with byte-identical content: any change to a
/// field yields a different hash and therefore a different logical submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionEnvelope {
    Transaction(SignedTransaction),
    FeeBump(FeeBumpTransaction),
}

impl TransactionEnvelope {
    /// Body of the transaction whose sequence number gets consumed
    pub fn transaction_body(&self) -> &TransactionBody {
        match self {
            Self::Transaction(tx) => &tx.body,
            Self::FeeBump(bump) => &bump.body.inner.body,
        }
    }

    pub fn source_account(&self) -> &str {
        &self.transaction_body().source_account
    }

    pub fn sequence_number(&self) -> u64 {
        self.transaction_body().sequence_number
    }

    pub fn time_bounds(&self) -> TimeBounds {
        self.transaction_body().time_bounds
    }

    pub fn time_bound_max(&self) -> Option<u64> {
        self.time_bounds().max_time
    }

    pub fn operations(&self) -> &[Operation] {
        &self.transaction_body().operations
    }

    pub fn is_fee_bump(&self) -> bool {
        matches!(self, Self::FeeBump(_))
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        self.time_bounds().is_expired_at(now)
    }

    pub fn signatures(&self) -> &[DecoratedSignature] {
        match self {
            Self::Transaction(tx) => &tx.signatures,
            Self::FeeBump(bump) => &bump.signatures,
        }
    }

    pub fn hash_bytes(&self, network: &Network) -> Result<[u8; 32], EnvelopeError> {
        match self {
            Self::Transaction(tx) => tx.body.hash_bytes(network),
            Self::FeeBump(bump) => {
                let body = canonical_bytes(&bump.body)?;
                Ok(payload_hash(network, FEE_BUMP_TAG, &body))
            }
        }
    }

    pub fn hash(&self, network: &Network) -> Result<TransactionHash, EnvelopeError> {
        self.hash_bytes(network).map(TransactionHash::from_bytes)
    }

    /// Canonical wire bytes of the whole envelope
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        canonical_bytes(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Encoding(e.to_string()))
    }
}

impl From<SignedTransaction> for TransactionEnvelope {
    fn from(tx: SignedTransaction) -> Self {
        Self::Transaction(tx)
    }
}

impl From<FeeBumpTransaction> for TransactionEnvelope {
    fn from(bump: FeeBumpTransaction) -> Self {
        Self::FeeBump(bump)
    }
}

fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, EnvelopeError> {
    serde_json::to_vec(value).map_err(|e| EnvelopeError::Encoding(e.to_string()))
}

/// Builder for signed transaction envelopes
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    source_account: String,
    fee: u32,
    sequence_number: u64,
    time_bounds: TimeBounds,
    memo: Option<String>,
    operations: Vec<Operation>,
}

impl EnvelopeBuilder {
    pub fn new(source_account: impl Into<String>, sequence_number: u64) -> Self {
        Self {
            source_account: source_account.into(),
            fee: crate::BASE_FEE,
            sequence_number,
            time_bounds: TimeBounds::unbounded(),
            memo: None,
            operations: vec![],
        }
    }

    pub fn with_fee(mut self, fee: u32) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_time_bounds(mut self, time_bounds: TimeBounds) -> Self {
        self.time_bounds = time_bounds;
        self
    }

    /// Expire the envelope at `max_time`
    pub fn with_max_time(mut self, max_time: u64) -> Self {
        self.time_bounds.max_time = Some(max_time);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn add_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn with_operations(mut self, operations: Vec<Operation>) -> Self {
        self.operations = operations;
        self
    }

    pub fn build_body(self) -> Result<TransactionBody, EnvelopeError> {
        let body = TransactionBody {
            source_account: self.source_account,
            fee: self.fee,
            sequence_number: self.sequence_number,
            time_bounds: self.time_bounds,
            memo: self.memo,
            operations: self.operations,
        };
        body.validate()?;
        Ok(body)
    }

    pub fn sign(
        self,
        network: &Network,
        signers: &[&dyn EnvelopeSigner],
    ) -> Result<TransactionEnvelope, EnvelopeError> {
        let tx = self.build_body()?.sign(network, signers)?;
        Ok(TransactionEnvelope::Transaction(tx))
    }
}

/// Builder for fee-bump envelopes around an already signed transaction
#[derive(Debug, Clone)]
pub struct FeeBumpBuilder {
    fee_source: String,
    max_fee: u64,
}

impl FeeBumpBuilder {
    pub fn new(fee_source: impl Into<String>, max_fee: u64) -> Self {
        Self {
            fee_source: fee_source.into(),
            max_fee,
        }
    }

    pub fn wrap(
        self,
        inner: TransactionEnvelope,
        network: &Network,
        fee_signer: &dyn EnvelopeSigner,
    ) -> Result<TransactionEnvelope, EnvelopeError> {
        let inner = match inner {
            TransactionEnvelope::Transaction(tx) => tx,
            TransactionEnvelope::FeeBump(_) => return Err(EnvelopeError::NestedFeeBump),
        };

        let inner_fee = u64::from(inner.body.fee);
        if self.max_fee < inner_fee {
            return Err(EnvelopeError::FeeBumpTooLow {
                max_fee: self.max_fee,
                inner_fee,
            });
        }

        let body = FeeBumpBody {
            fee_source: self.fee_source,
            max_fee: self.max_fee,
            inner,
        };
        let hash = payload_hash(network, FEE_BUMP_TAG, &canonical_bytes(&body)?);
        Ok(TransactionEnvelope::FeeBump(FeeBumpTransaction {
            body,
            signatures: vec![fee_signer.decorated_signature(&hash)],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    fn key() -> SigningKey {
        SigningKey::from_bytes(&[1u8; 32])
    }

    fn payment() -> Operation {
        Operation::Payment {
            destination: "GDEST".to_string(),
            asset: Asset::Native,
            amount: 10_000_000,
        }
    }

    fn envelope(seq: u64) -> TransactionEnvelope {
        let key = key();
        EnvelopeBuilder::new(key.account_id(), seq)
            .with_max_time(1_700_000_100)
            .add_operation(payment())
            .sign(&Network::testnet(), &[&key])
            .unwrap()
    }

    #[test]
    fn test_builder_rejects_empty_operations() {
        let key = key();
        let result = EnvelopeBuilder::new(key.account_id(), 1).sign(&Network::testnet(), &[&key]);
        assert_eq!(result.unwrap_err(), EnvelopeError::MissingOperation);
    }

    #[test]
    fn test_builder_rejects_inverted_bounds() {
        let result = EnvelopeBuilder::new("GSRC", 1)
            .with_time_bounds(TimeBounds::between(200, 100))
            .add_operation(payment())
            .build_body();
        assert!(matches!(
            result,
            Err(EnvelopeError::InvalidTimeBounds { min: 200, max: 100 })
        ));
    }

    #[test]
    fn test_builder_requires_signer() {
        let result = EnvelopeBuilder::new("GSRC", 1)
            .add_operation(payment())
            .sign(&Network::testnet(), &[]);
        assert_eq!(result.unwrap_err(), EnvelopeError::NoSigners);
    }

    #[test]
    fn test_builder_rejects_too_many_operations() {
        let result = EnvelopeBuilder::new("GSRC", 1)
            .with_operations(vec![payment(); MAX_OPERATIONS + 1])
            .build_body();
        assert_eq!(
            result.unwrap_err(),
            EnvelopeError::TooManyOperations(MAX_OPERATIONS + 1)
        );
    }

    #[test]
    fn test_hash_is_stable_and_network_bound() {
        let env = envelope(5);
        let h1 = env.hash(&Network::testnet()).unwrap();
        let h2 = env.clone().hash(&Network::testnet()).unwrap();
        assert_eq!(h1, h2);
        assert_ne!(h1, env.hash(&Network::public()).unwrap());
    }

    #[test]
    fn test_sequence_change_changes_hash() {
        let network = Network::testnet();
        assert_ne!(
            envelope(5).hash(&network).unwrap(),
            envelope(6).hash(&network).unwrap()
        );
    }

    #[test]
    fn test_signature_covers_hash() {
        let network = Network::testnet();
        let env = envelope(5);
        let hash = env.hash_bytes(&network).unwrap();
        assert!(env.signatures()[0]
            .verify(&key().verifying_key(), &hash)
            .is_ok());
    }

    #[test]
    fn test_bytes_roundtrip_preserves_hash() {
        let network = Network::testnet();
        let env = envelope(9);
        let decoded = TransactionEnvelope::from_bytes(&env.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, env);
        assert_eq!(decoded.hash(&network).unwrap(), env.hash(&network).unwrap());
    }

    #[test]
    fn test_time_bounds_expiry() {
        let bounds = TimeBounds::until(100);
        assert!(!bounds.is_expired_at(100));
        assert!(bounds.is_expired_at(101));

        let open = TimeBounds::unbounded();
        assert!(!open.is_expired_at(u64::MAX));

        assert!(TimeBounds::between(50, 100).is_premature_at(49));
        assert!(!TimeBounds::between(50, 100).is_premature_at(50));
    }

    #[test]
    fn test_rebuilt_body_keeps_operations() {
        let env = envelope(5);
        let rebuilt = env
            .transaction_body()
            .rebuilt(8, TimeBounds::until(1_800_000_000));
        assert_eq!(rebuilt.sequence_number, 8);
        assert_eq!(rebuilt.operations, env.operations());
        assert_eq!(rebuilt.source_account, env.source_account());
    }

    #[test]
    fn test_fee_bump_wraps_inner() {
        let network = Network::testnet();
        let fee_key = SigningKey::from_bytes(&[2u8; 32]);
        let inner = envelope(5);
        let inner_hash = inner.hash(&network).unwrap();

        let bumped = FeeBumpBuilder::new(fee_key.account_id(), 10_000)
            .wrap(inner.clone(), &network, &fee_key)
            .unwrap();

        assert!(bumped.is_fee_bump());
        assert_eq!(bumped.sequence_number(), 5);
        assert_eq!(bumped.time_bound_max(), inner.time_bound_max());
        assert_ne!(bumped.hash(&network).unwrap(), inner_hash);
        // inner envelope is untouched
        match &bumped {
            TransactionEnvelope::FeeBump(b) => {
                assert_eq!(TransactionEnvelope::from(b.body.inner.clone()), inner)
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_fee_bump_validation() {
        let network = Network::testnet();
        let fee_key = SigningKey::from_bytes(&[2u8; 32]);

        let low = FeeBumpBuilder::new("GFEE", 10).wrap(envelope(1), &network, &fee_key);
        assert!(matches!(low, Err(EnvelopeError::FeeBumpTooLow { .. })));

        let bumped = FeeBumpBuilder::new("GFEE", 1_000)
            .wrap(envelope(1), &network, &fee_key)
            .unwrap();
        let nested = FeeBumpBuilder::new("GFEE", 2_000).wrap(bumped, &network, &fee_key);
        assert_eq!(nested.unwrap_err(), EnvelopeError::NestedFeeBump);
    }
}
