//! Mint and token-codec collaborator interfaces
//!
//! The wallet never talks to a mint or parses interchange tokens itself. The
//! surrounding application plugs in a [`MintClient`] and a [`TokenCodec`].
//! Fresh outputs are always supplied as [`PreparedOutput`]s derived by the
//! wallet, so a mint client never picks counter indices.

use crate::{total_amount, KeysetId, PreparedOutput, Proof, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for mint calls
pub type MintResult<T> = std::result::Result<T, MintError>;

/// Mint client errors
#[derive(Debug, thiserror::Error)]
pub enum MintError {
    /// Transport failure reaching the mint
    #[error("Network error: {0}")]
    Network(String),

    /// Mint answered with something the client could not use
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Mint refused the request (spent inputs, unknown keyset, ...)
    #[error("Rejected by mint: {0}")]
    Rejected(String),

    /// Local planning could not satisfy the request
    #[error("Planning error: {0}")]
    Planning(String),
}

/// Token codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Token could not be parsed
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Token version or feature not supported
    #[error("Unsupported token: {0}")]
    Unsupported(String),
}

/// Decoded interchange token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedToken {
    /// Mint that issued the proofs
    pub mint_url: String,
    /// Unit of the amounts
    pub unit: String,
    /// Carried proofs
    pub proofs: Vec<Proof>,
    /// Optional memo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl DecodedToken {
    /// Total value carried by the token
    pub fn value(&self) -> Result<u64> {
        total_amount(&self.proofs)
    }
}

/// Input selection and output counts for a send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    /// Proofs to spend
    pub inputs: Vec<Proof>,
    /// Fresh outputs returning change to the wallet
    pub keep_outputs: u32,
    /// Fresh outputs forming the outgoing token
    pub send_outputs: u32,
}

impl SplitPlan {
    /// Total fresh outputs, or `None` on overflow
    pub fn output_count(&self) -> Option<u32> {
        self.keep_outputs.checked_add(self.send_outputs)
    }
}

/// Proofs returned by a split
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SplitOutcome {
    /// Change proofs kept by the wallet
    pub keep: Vec<Proof>,
    /// Proofs handed to the recipient
    pub send: Vec<Proof>,
}

/// Mint-client capability
#[async_trait]
pub trait MintClient: Send + Sync {
    /// URL of the mint, written into outgoing tokens
    fn mint_url(&self) -> &str;

    /// Active keyset fresh outputs are requested from
    async fn load_keyset(&self) -> MintResult<KeysetId>;

    /// Number of fresh outputs needed to redeem `amount`
    fn outputs_for_amount(&self, amount: u64) -> u32;

    /// Choose inputs and output counts for sending `amount`
    fn plan_split(&self, amount: u64, available: &[Proof]) -> MintResult<SplitPlan>;

    /// Swap the proofs of a received token for fresh proofs on `outputs`
    async fn swap(&self, token: &DecodedToken, outputs: &[PreparedOutput])
        -> MintResult<Vec<Proof>>;

    /// Spend `inputs`, minting `amount` on `send_outputs` and the change on `keep_outputs`
    async fn split(
        &self,
        amount: u64,
        inputs: &[Proof],
        keep_outputs: &[PreparedOutput],
        send_outputs: &[PreparedOutput],
    ) -> MintResult<SplitOutcome>;
}

/// Token-codec capability
pub trait TokenCodec: Send + Sync {
    /// Decode an interchange token
    fn decode(&self, token: &str) -> std::result::Result<DecodedToken, CodecError>;

    /// Encode an interchange token
    fn encode(&self, token: &DecodedToken) -> std::result::Result<String, CodecError>;
}
