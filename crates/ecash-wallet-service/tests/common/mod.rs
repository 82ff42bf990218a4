//! Shared fixtures: an in-process mint and a JSON token codec

#![allow(dead_code)]

use async_trait::async_trait;
use ecash_core::{
    CodecError, DecodedToken, KeysetId, MintClient, MintError, MintResult, PreparedOutput, Proof,
    SplitOutcome, SplitPlan, TokenCodec,
};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const PHRASE: &str = "half depart obvious quality work element tank \
                          gorilla view sugar picture humble";
pub const OTHER_PHRASE: &str = "abandon abandon abandon abandon abandon abandon \
                                abandon abandon abandon abandon abandon about";
pub const KEYSET: &str = "009a1f293253e41e";
pub const MINT_URL: &str = "https://mint.example.com";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn keyset() -> KeysetId {
    KeysetId::parse(KEYSET).unwrap()
}

/// Power-of-two denominations of `amount`, largest first
pub fn denominations(amount: u64) -> Vec<u64> {
    (0..64)
        .rev()
        .map(|bit| 1u64 << bit)
        .filter(|value| amount & value != 0)
        .collect()
}

/// One mint call as the mint saw it
#[derive(Debug, Clone)]
pub struct ObservedCall {
    /// Counter indices of the outputs supplied
    pub counters: Vec<u32>,
    /// Counter persisted in the wallet store when the call arrived
    pub persisted_next: Option<u32>,
}

#[derive(Debug, Default)]
pub struct MintLog {
    pub issued_secrets: Vec<String>,
    pub spent: HashSet<String>,
    pub calls: Vec<ObservedCall>,
    pub fail_calls: bool,
    pub hang_calls: bool,
    pub tamper_responses: bool,
    pub short_responses: bool,
}

/// Mint issuing binary denominations under a single keyset
#[derive(Clone)]
pub struct FakeMint {
    keyset: KeysetId,
    store_path: Arc<Mutex<Option<PathBuf>>>,
    log: Arc<Mutex<MintLog>>,
}

impl FakeMint {
    pub fn new() -> Self {
        Self {
            keyset: keyset(),
            store_path: Arc::new(Mutex::new(None)),
            log: Arc::new(Mutex::new(MintLog::default())),
        }
    }

    /// Read the wallet's persisted counter from `path` on every call
    pub fn observe_store(&self, path: PathBuf) {
        *self.store_path.lock() = Some(path);
    }

    pub fn set_fail(&self, fail: bool) {
        self.log.lock().fail_calls = fail;
    }

    pub fn set_hang(&self, hang: bool) {
        self.log.lock().hang_calls = hang;
    }

    pub fn set_tamper(&self, tamper: bool) {
        self.log.lock().tamper_responses = tamper;
    }

    /// Answer swaps with only the first issued proof
    pub fn set_short(&self, short: bool) {
        self.log.lock().short_responses = short;
    }

    pub fn issued_secrets(&self) -> Vec<String> {
        self.log.lock().issued_secrets.clone()
    }

    pub fn calls(&self) -> Vec<ObservedCall> {
        self.log.lock().calls.clone()
    }

    fn persisted_next(&self) -> Option<u32> {
        let path = self.store_path.lock().clone()?;
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).ok()?;
        conn.query_row(
            "SELECT next FROM counters WHERE keyset_id = ?1",
            [self.keyset.as_str()],
            |row| row.get::<_, u32>(0),
        )
        .optional()
        .ok()
        .flatten()
    }

    /// Record the call, then fail, hang, or let it through
    async fn enter_call(&self, outputs: &[&PreparedOutput]) -> MintResult<()> {
        let observed = ObservedCall {
            counters: outputs.iter().map(|o| o.counter).collect(),
            persisted_next: self.persisted_next(),
        };
        let (fail, hang) = {
            let mut log = self.log.lock();
            log.issued_secrets
                .extend(outputs.iter().map(|o| o.secret.clone()));
            log.calls.push(observed);
            (log.fail_calls, log.hang_calls)
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if fail {
            return Err(MintError::Network("connection reset".to_string()));
        }
        Ok(())
    }

    fn spend(&self, inputs: &[Proof]) -> MintResult<u64> {
        let mut log = self.log.lock();
        if let Some(spent) = inputs.iter().find(|p| log.spent.contains(&p.secret)) {
            return Err(MintError::Rejected(format!("proof {} already spent", spent.secret)));
        }
        log.spent.extend(inputs.iter().map(|p| p.secret.clone()));
        Ok(inputs.iter().map(|p| p.amount).sum())
    }

    fn sign(&self, amount: u64, outputs: &[PreparedOutput]) -> MintResult<Vec<Proof>> {
        let values = denominations(amount);
        if values.len() != outputs.len() {
            return Err(MintError::Protocol(format!(
                "{} needs {} outputs, got {}",
                amount,
                values.len(),
                outputs.len()
            )));
        }
        let tamper = self.log.lock().tamper_responses;

        Ok(values
            .into_iter()
            .zip(outputs)
            .map(|(value, output)| {
                let secret = if tamper {
                    format!("{}00", output.secret)
                } else {
                    output.secret.clone()
                };
                Proof::new(self.keyset.clone(), value, secret, format!("02{}", output.secret))
            })
            .collect())
    }
}

#[async_trait]
impl MintClient for FakeMint {
    fn mint_url(&self) -> &str {
        MINT_URL
    }

    async fn load_keyset(&self) -> MintResult<KeysetId> {
        Ok(self.keyset.clone())
    }

    fn outputs_for_amount(&self, amount: u64) -> u32 {
        amount.count_ones()
    }

    fn plan_split(&self, amount: u64, available: &[Proof]) -> MintResult<SplitPlan> {
        let mut inputs = Vec::new();
        let mut total = 0u64;
        for proof in available {
            if total >= amount {
                break;
            }
            total += proof.amount;
            inputs.push(proof.clone());
        }
        if total < amount {
            return Err(MintError::Planning(format!("cannot cover {}", amount)));
        }

        Ok(SplitPlan {
            inputs,
            keep_outputs: (total - amount).count_ones(),
            send_outputs: amount.count_ones(),
        })
    }

    async fn swap(&self, token: &DecodedToken, outputs: &[PreparedOutput]) -> MintResult<Vec<Proof>> {
        self.enter_call(&outputs.iter().collect::<Vec<_>>()).await?;
        let value = self.spend(&token.proofs)?;
        let mut proofs = self.sign(value, outputs)?;
        if self.log.lock().short_responses {
            proofs.truncate(1);
        }
        Ok(proofs)
    }

    async fn split(
        &self,
        amount: u64,
        inputs: &[Proof],
        keep_outputs: &[PreparedOutput],
        send_outputs: &[PreparedOutput],
    ) -> MintResult<SplitOutcome> {
        let all: Vec<&PreparedOutput> = keep_outputs.iter().chain(send_outputs).collect();
        self.enter_call(&all).await?;

        let total = self.spend(inputs)?;
        let change = total
            .checked_sub(amount)
            .ok_or_else(|| MintError::Protocol("inputs below amount".to_string()))?;

        Ok(SplitOutcome {
            keep: self.sign(change, keep_outputs)?,
            send: self.sign(amount, send_outputs)?,
        })
    }
}

const TOKEN_PREFIX: &str = "ecashJ";

/// Prefixed JSON token encoding
#[derive(Clone, Default)]
pub struct JsonCodec;

impl TokenCodec for JsonCodec {
    fn decode(&self, token: &str) -> Result<DecodedToken, CodecError> {
        let body = token
            .strip_prefix(TOKEN_PREFIX)
            .ok_or_else(|| CodecError::Unsupported("unknown token prefix".to_string()))?;
        serde_json::from_str(body).map_err(|e| CodecError::Malformed(e.to_string()))
    }

    fn encode(&self, token: &DecodedToken) -> Result<String, CodecError> {
        let body = serde_json::to_string(token).map_err(|e| CodecError::Malformed(e.to_string()))?;
        Ok(format!("{}{}", TOKEN_PREFIX, body))
    }
}

static EXTERNAL_SECRETS: AtomicU64 = AtomicU64::new(0);

/// Encoded token worth `amount`, made of proofs issued to someone else
pub fn external_token(amount: u64, unit: &str) -> String {
    let proofs = denominations(amount)
        .into_iter()
        .map(|value| {
            let n = EXTERNAL_SECRETS.fetch_add(1, Ordering::Relaxed);
            Proof::new(keyset(), value, format!("external-{:08}", n), "02ee")
        })
        .collect();

    JsonCodec
        .encode(&DecodedToken {
            mint_url: MINT_URL.to_string(),
            unit: unit.to_string(),
            proofs,
            memo: None,
        })
        .unwrap()
}
