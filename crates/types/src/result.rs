use serde::{Deserialize, Serialize};

/// Transaction-level result code reported by the ledger for a rejected envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    /// One of the operations failed; see the operation results
    #[serde(rename = "tx_failed")]
    Failed,
    #[serde(rename = "tx_too_early")]
    TooEarly,
    #[serde(rename = "tx_too_late")]
    TooLate,
    #[serde(rename = "tx_missing_operation")]
    MissingOperation,
    #[serde(rename = "tx_bad_seq")]
    BadSeq,
    #[serde(rename = "tx_bad_auth")]
    BadAuth,
    /// Fee would take the account below its minimum reserve
    #[serde(rename = "tx_insufficient_balance")]
    InsufficientBalance,
    #[serde(rename = "tx_no_account")]
    NoAccount,
    #[serde(rename = "tx_insufficient_fee")]
    InsufficientFee,
    #[serde(rename = "tx_bad_auth_extra")]
    BadAuthExtra,
    #[serde(rename = "tx_internal_error")]
    InternalError,
    #[serde(rename = "tx_not_supported")]
    NotSupported,
    #[serde(rename = "tx_fee_bump_inner_failed")]
    FeeBumpInnerFailed,
    #[serde(rename = "tx_bad_sponsorship")]
    BadSponsorship,
}

/// Coarse error taxonomy used for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The envelope itself is wrong; retrying it unchanged cannot succeed
    Structural,
    /// Rate limits, congestion, network trouble; retry unchanged after a delay
    Transient,
    /// Local view of account state is stale; re-fetch and rebuild
    StateDivergence,
    /// Definitive failure that needs outside action
    Terminal,
}

/// What the caller has to do before a rejected transaction can land
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Remedy {
    InspectOperationResults,
    AdjustTimeBounds,
    RebuildWithNewBounds,
    AddOperations,
    RefreshSequence,
    FixSignatures,
    AddFunds,
    CreateSourceAccount,
    RaiseFee,
    RemoveExtraSignatures,
    Surface,
    InspectInnerResult,
    ResolveSponsorship,
}

impl ResultCode {
    pub const ALL: [ResultCode; 14] = [
        ResultCode::Failed,
        ResultCode::TooEarly,
        ResultCode::TooLate,
        ResultCode::MissingOperation,
        ResultCode::BadSeq,
        ResultCode::BadAuth,
        ResultCode::InsufficientBalance,
        ResultCode::NoAccount,
        ResultCode::InsufficientFee,
        ResultCode::BadAuthExtra,
        ResultCode::InternalError,
        ResultCode::NotSupported,
        ResultCode::FeeBumpInnerFailed,
        ResultCode::BadSponsorship,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::Failed => "tx_failed",
            ResultCode::TooEarly => "tx_too_early",
            ResultCode::TooLate => "tx_too_late",
            ResultCode::MissingOperation => "tx_missing_operation",
            ResultCode::BadSeq => "tx_bad_seq",
            ResultCode::BadAuth => "tx_bad_auth",
            ResultCode::InsufficientBalance => "tx_insufficient_balance",
            ResultCode::NoAccount => "tx_no_account",
            ResultCode::InsufficientFee => "tx_insufficient_fee",
            ResultCode::BadAuthExtra => "tx_bad_auth_extra",
            ResultCode::InternalError => "tx_internal_error",
            ResultCode::NotSupported => "tx_not_supported",
            ResultCode::FeeBumpInnerFailed => "tx_fee_bump_inner_failed",
            ResultCode::BadSponsorship => "tx_bad_sponsorship",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ResultCode::TooEarly
            | ResultCode::TooLate
            | ResultCode::MissingOperation
            | ResultCode::BadAuth
            | ResultCode::BadAuthExtra
            | ResultCode::InsufficientFee => ErrorCategory::Structural,
            ResultCode::BadSeq => ErrorCategory::StateDivergence,
            ResultCode::Failed
            | ResultCode::InsufficientBalance
            | ResultCode::NoAccount
            | ResultCode::InternalError
            | ResultCode::NotSupported
            | ResultCode::FeeBumpInnerFailed
            | ResultCode::BadSponsorship => ErrorCategory::Terminal,
        }
    }

    pub fn remedy(&self) -> Remedy {
        match self {
            ResultCode::Failed => Remedy::InspectOperationResults,
            ResultCode::TooEarly => Remedy::AdjustTimeBounds,
            ResultCode::TooLate => Remedy::RebuildWithNewBounds,
            ResultCode::MissingOperation => Remedy::AddOperations,
            ResultCode::BadSeq => Remedy::RefreshSequence,
            ResultCode::BadAuth => Remedy::FixSignatures,
            ResultCode::InsufficientBalance => Remedy::AddFunds,
            ResultCode::NoAccount => Remedy::CreateSourceAccount,
            ResultCode::InsufficientFee => Remedy::RaiseFee,
            ResultCode::BadAuthExtra => Remedy::RemoveExtraSignatures,
            ResultCode::InternalError | ResultCode::NotSupported => Remedy::Surface,
            ResultCode::FeeBumpInnerFailed => Remedy::InspectInnerResult,
            ResultCode::BadSponsorship => Remedy::ResolveSponsorship,
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResultCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResultCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| format!("unknown result code: {s}"))
    }
}

/// Create-account operation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateAccountResult {
    Success,
    /// Invalid destination
    Malformed,
    /// Source cannot fund the destination's minimum reserve
    Underfunded,
    /// Starting balance would leave the destination under the minimum reserve
    LowReserve,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentResult {
    Success,
    Malformed,
    Underfunded,
    NoDestination,
    LineFull,
    Other(i32),
}

/// Per-operation result attached to a `tx_failed` rejection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "code", rename_all = "snake_case")]
pub enum OperationResult {
    CreateAccount(CreateAccountResult),
    Payment(PaymentResult),
    Other(String),
}

impl OperationResult {
    pub fn is_success(&self) -> bool {
        match self {
            OperationResult::CreateAccount(r) => *r == CreateAccountResult::Success,
            OperationResult::Payment(r) => *r == PaymentResult::Success,
            OperationResult::Other(code) => code.ends_with("_success"),
        }
    }
}

/// Ledger rejection of an envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub code: ResultCode,

    #[serde(default)]
    pub operation_results: Vec<OperationResult>,

    /// Result of the wrapped transaction when a fee bump failed
    #[serde(default)]
    pub inner: Option<Box<Rejection>>,

    #[serde(default)]
    pub diagnostic: Option<String>,

    #[serde(default)]
    pub fee_charged: u64,
}

impl Rejection {
    pub fn new(code: ResultCode) -> Self {
        Self {
            code,
            operation_results: vec![],
            inner: None,
            diagnostic: None,
            fee_charged: 0,
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    pub fn with_operation_results(mut self, results: Vec<OperationResult>) -> Self {
        self.operation_results = results;
        self
    }

    pub fn with_inner(mut self, inner: Rejection) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    pub fn with_fee_charged(mut self, fee: u64) -> Self {
        self.fee_charged = fee;
        self
    }

    /// Operation results that did not succeed, with their index
    pub fn failed_operations(&self) -> impl Iterator<Item = (usize, &OperationResult)> {
        self.operation_results
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_success())
    }

    /// The innermost rejection, following fee-bump nesting
    pub fn root_cause(&self) -> &Rejection {
        match &self.inner {
            Some(inner) => inner.root_cause(),
            None => self,
        }
    }

    /// Whether the ledger definitively refused the envelope for being past its max time
    pub fn confirms_expiry(&self) -> bool {
        self.root_cause().code == ResultCode::TooLate
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(inner) = &self.inner {
            write!(f, " (inner: {inner})")?;
        }
        if let Some(diagnostic) = &self.diagnostic {
            write!(f, ": {diagnostic}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_code_wire_names() {
        for code in ResultCode::ALL {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
            assert_eq!(code.as_str().parse::<ResultCode>().unwrap(), code);
        }
        assert!("tx_success".parse::<ResultCode>().is_err());
    }

    #[test]
    fn test_categories() {
        assert_eq!(ResultCode::BadSeq.category(), ErrorCategory::StateDivergence);
        assert_eq!(ResultCode::MissingOperation.category(), ErrorCategory::Structural);
        assert_eq!(ResultCode::BadAuth.category(), ErrorCategory::Structural);
        assert_eq!(ResultCode::NoAccount.category(), ErrorCategory::Terminal);
        assert_eq!(ResultCode::NotSupported.category(), ErrorCategory::Terminal);
        assert_eq!(ResultCode::InsufficientBalance.category(), ErrorCategory::Terminal);

        // no ledger result code is ever retryable unchanged
        assert!(ResultCode::ALL
            .iter()
            .all(|c| c.category() != ErrorCategory::Transient));
    }

    #[test]
    fn test_remedies() {
        assert_eq!(ResultCode::BadSeq.remedy(), Remedy::RefreshSequence);
        assert_eq!(ResultCode::InsufficientFee.remedy(), Remedy::RaiseFee);
        assert_eq!(ResultCode::TooLate.remedy(), Remedy::RebuildWithNewBounds);
        assert_eq!(
            ResultCode::FeeBumpInnerFailed.remedy(),
            Remedy::InspectInnerResult
        );
    }

    #[test]
    fn test_failed_operations() {
        let rejection = Rejection::new(ResultCode::Failed).with_operation_results(vec![
            OperationResult::Payment(PaymentResult::Success),
            OperationResult::CreateAccount(CreateAccountResult::AlreadyExists),
        ]);

        let failed: Vec<_> = rejection.failed_operations().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, 1);
        assert_eq!(
            failed[0].1,
            &OperationResult::CreateAccount(CreateAccountResult::AlreadyExists)
        );
    }

    #[test]
    fn test_expiry_confirmation_through_fee_bump() {
        let direct = Rejection::new(ResultCode::TooLate);
        assert!(direct.confirms_expiry());

        let bumped = Rejection::new(ResultCode::FeeBumpInnerFailed)
            .with_inner(Rejection::new(ResultCode::TooLate));
        assert!(bumped.confirms_expiry());
        assert_eq!(bumped.to_string(), "tx_fee_bump_inner_failed (inner: tx_too_late)");

        assert!(!Rejection::new(ResultCode::BadSeq).confirms_expiry());
    }

    #[test]
    fn test_rejection_deserialize_defaults() {
        let rejection: Rejection = serde_json::from_str(r#"{"code":"tx_bad_auth"}"#).unwrap();
        assert_eq!(rejection, Rejection::new(ResultCode::BadAuth));

        let json = r#"{"code":"tx_failed","operation_results":[{"type":"create_account","code":"low_reserve"}]}"#;
        let rejection: Rejection = serde_json::from_str(json).unwrap();
        assert_eq!(
            rejection.operation_results,
            vec![OperationResult::CreateAccount(CreateAccountResult::LowReserve)]
        );
    }
}
