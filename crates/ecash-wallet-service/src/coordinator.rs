//! Receive and send orchestration
//!
//! Every operation that asks a mint for fresh outputs follows the same
//! ordering: reserve a counter range in memory, persist it, and only then
//! derive outputs from it and call the mint. The proof set is changed only
//! after the mint answered and the answer checked out. A range whose mint call
//! failed is abandoned, never reused.

use crate::state::{OperationKind, OperationState, OperationTrace};
use crate::{Error, Result};
use ecash_core::{
    total_amount, DecodedToken, KeysetId, MintClient, PreparedOutput, Proof, Reservation,
    SecretDeriver, Seed, TokenCodec,
};
use ecash_storage_sqlite::{CounterStore, Database, ProofStore};
use std::collections::{HashMap, HashSet};

/// Outcome of a completed receive
#[derive(Debug, Clone)]
pub struct ReceiveResult {
    /// Value added to the store
    pub amount: u64,
    /// Proofs stored
    pub proofs: Vec<Proof>,
    /// Counter range the outputs were derived from
    pub reservation: Reservation,
    /// States passed through
    pub trace: OperationTrace,
}

/// Outcome of a completed send
#[derive(Debug, Clone)]
pub struct SendResult {
    /// Encoded outgoing token
    pub token: String,
    /// Value carried by the token
    pub amount: u64,
    /// Proofs inside the token; not stored
    pub send_proofs: Vec<Proof>,
    /// Change proofs stored
    pub change: Vec<Proof>,
    /// Proofs spent and removed from the store
    pub consumed: Vec<Proof>,
    /// Counter range the outputs were derived from
    pub reservation: Reservation,
    /// States passed through
    pub trace: OperationTrace,
}

/// Runs receive and send against one store
pub struct OperationCoordinator<M, C> {
    db: Database,
    seed: Seed,
    mint: M,
    codec: C,
    unit: String,
    max_outputs: u32,
    last_trace: Option<OperationTrace>,
}

impl<M, C> OperationCoordinator<M, C>
where
    M: MintClient,
    C: TokenCodec,
{
    /// Create coordinator
    pub fn new(
        db: Database,
        seed: Seed,
        mint: M,
        codec: C,
        unit: impl Into<String>,
        max_outputs: u32,
    ) -> Self {
        Self {
            db,
            seed,
            mint,
            codec,
            unit: unit.into(),
            max_outputs,
            last_trace: None,
        }
    }

    /// Backing database
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Mint client
    pub fn mint(&self) -> &M {
        &self.mint
    }

    /// Trace of the most recent receive or send, successful or not
    pub fn last_trace(&self) -> Option<&OperationTrace> {
        self.last_trace.as_ref()
    }

    /// Redeem an incoming token into fresh stored proofs
    pub async fn receive(&mut self, encoded: &str) -> Result<ReceiveResult> {
        let mut trace = OperationTrace::new(OperationKind::Receive);
        let result = self.run_receive(encoded, &mut trace).await;
        self.finish(trace, result)
    }

    /// Split stored proofs into an outgoing token of `amount` and change
    pub async fn send(&mut self, amount: u64) -> Result<SendResult> {
        let mut trace = OperationTrace::new(OperationKind::Send);
        let result = self.run_send(amount, &mut trace).await;
        self.finish(trace, result)
    }

    async fn run_receive(
        &mut self,
        encoded: &str,
        trace: &mut OperationTrace,
    ) -> Result<ReceiveResult> {
        let token = self.codec.decode(encoded)?;
        if token.unit != self.unit {
            return Err(Error::Token(format!(
                "token unit '{}' does not match wallet unit '{}'",
                token.unit, self.unit
            )));
        }
        if token.proofs.is_empty() {
            return Err(Error::Token("token carries no proofs".to_string()));
        }
        for proof in &token.proofs {
            proof.validate().map_err(|e| Error::Token(e.to_string()))?;
        }
        let value = token.value()?;

        let needed = self.mint.outputs_for_amount(value);
        self.check_output_count(needed, value)?;

        let keyset = load_keyset(&self.mint).await?;
        let (reservation, outputs) = self.reserve_and_persist(&keyset, needed, trace)?;

        trace.advance(OperationState::MintCallInFlight)?;
        let response = self.mint.swap(&token, &outputs).await;

        let (proofs, amount) = match response.map_err(Error::from).and_then(|proofs| {
            check_issued(&proofs, &keyset, &outputs)?;
            let amount = check_received(&proofs, value, &outputs)?;
            Ok((proofs, amount))
        }) {
            Ok(received) => received,
            Err(e) => return Err(abandon(trace, &reservation, e)),
        };

        if let Err(e) = ProofStore::new(&self.db).replace(&[], &proofs) {
            return Err(unstored(trace, &reservation, e.into()));
        }
        trace.advance(OperationState::Applied)?;

        tracing::info!(
            "Received {} {} as {} proofs (keyset {}, counters [{}, {}))",
            amount,
            self.unit,
            proofs.len(),
            keyset,
            reservation.start,
            reservation.next
        );

        Ok(ReceiveResult {
            amount,
            proofs,
            reservation,
            trace: trace.clone(),
        })
    }

    async fn run_send(&mut self, amount: u64, trace: &mut OperationTrace) -> Result<SendResult> {
        if amount == 0 {
            return Err(Error::InvalidAmount("send amount must be positive".to_string()));
        }

        let available = ProofStore::new(&self.db).load_all()?;
        let balance = total_amount(&available)?;
        if balance < amount {
            return Err(Error::InsufficientFunds {
                available: balance,
                requested: amount,
            });
        }

        let plan = self
            .mint
            .plan_split(amount, &available)
            .map_err(|e| Error::Internal(format!("split planning: {}", e)))?;
        let input_total = check_plan_inputs(&plan.inputs, &available, amount)?;

        let fresh = plan
            .output_count()
            .ok_or_else(|| Error::Internal("split plan output count overflows".to_string()))?;
        self.check_output_count(fresh, amount)?;
        if plan.send_outputs == 0 {
            return Err(Error::Internal("split plan has no send outputs".to_string()));
        }

        let keyset = load_keyset(&self.mint).await?;
        let (reservation, mut outputs) = self.reserve_and_persist(&keyset, fresh, trace)?;
        // First keep_outputs indices carry change, the rest the outgoing token
        let send_outputs = outputs.split_off(plan.keep_outputs as usize);
        let keep_outputs = outputs;

        trace.advance(OperationState::MintCallInFlight)?;
        let response = self
            .mint
            .split(amount, &plan.inputs, &keep_outputs, &send_outputs)
            .await;

        let outcome = match response.map_err(Error::from).and_then(|outcome| {
            check_split(&outcome.keep, &outcome.send, amount, input_total)?;
            check_issued(&outcome.keep, &keyset, &keep_outputs)?;
            check_issued(&outcome.send, &keyset, &send_outputs)?;
            Ok(outcome)
        }) {
            Ok(outcome) => outcome,
            Err(e) => return Err(abandon(trace, &reservation, e)),
        };

        if let Err(e) = ProofStore::new(&self.db).replace(&plan.inputs, &outcome.keep) {
            return Err(unstored(trace, &reservation, e.into()));
        }
        trace.advance(OperationState::Applied)?;

        tracing::info!(
            "Sent {} {}: spent {} proofs, kept {} change proofs (keyset {}, counters [{}, {}))",
            amount,
            self.unit,
            plan.inputs.len(),
            outcome.keep.len(),
            keyset,
            reservation.start,
            reservation.next
        );

        let outgoing = DecodedToken {
            mint_url: self.mint.mint_url().to_string(),
            unit: self.unit.clone(),
            proofs: outcome.send.clone(),
            memo: None,
        };
        // The store already reflects the split; send proofs stay re-derivable
        let token = self.codec.encode(&outgoing).map_err(|e| {
            tracing::warn!(
                "Encoding outgoing token failed after split was applied: {}",
                e
            );
            Error::from(e)
        })?;

        Ok(SendResult {
            token,
            amount,
            send_proofs: outcome.send,
            change: outcome.keep,
            consumed: plan.inputs,
            reservation,
            trace: trace.clone(),
        })
    }

    /// Close out `trace` and keep it as the last operation's trace
    fn finish<T>(&mut self, mut trace: OperationTrace, result: Result<T>) -> Result<T> {
        if result.is_err() && !trace.current().is_terminal() {
            trace.fail()?;
        }
        self.last_trace = Some(trace);
        result
    }

    fn check_output_count(&self, count: u32, amount: u64) -> Result<()> {
        if count == 0 {
            return Err(Error::Internal(format!(
                "mint client requested no outputs for {}",
                amount
            )));
        }
        if count > self.max_outputs {
            return Err(Error::InvalidAmount(format!(
                "{} needs {} outputs, limit is {}",
                amount, count, self.max_outputs
            )));
        }
        Ok(())
    }

    /// Reserve `count` indices, persist them, and derive their outputs.
    ///
    /// Leaves `trace` in `CountersPersisted` on success.
    fn reserve_and_persist(
        &self,
        keyset: &KeysetId,
        count: u32,
        trace: &mut OperationTrace,
    ) -> Result<(Reservation, Vec<PreparedOutput>)> {
        let counters = CounterStore::new(&self.db);
        let mut snapshot = counters.load_all()?;

        let reservation = match snapshot.reserve(keyset, count) {
            Ok(reservation) => reservation,
            Err(e) => {
                trace.fail()?;
                return Err(e.into());
            }
        };
        trace.advance(OperationState::CountersReserved)?;
        tracing::debug!(
            "Reserved counters [{}, {}) for keyset {}",
            reservation.start,
            reservation.next,
            keyset
        );

        if let Err(e) = counters.persist(&reservation) {
            trace.fail()?;
            return Err(e.into());
        }
        trace.advance(OperationState::CountersPersisted)?;

        // Derivation only ever sees a persisted range
        let outputs = match SecretDeriver::new(&self.seed).derive_reservation(&reservation) {
            Ok(outputs) => outputs,
            Err(e) => return Err(abandon(trace, &reservation, e.into())),
        };

        Ok((reservation, outputs))
    }
}

async fn load_keyset<M: MintClient>(mint: &M) -> Result<KeysetId> {
    mint.load_keyset()
        .await
        .map_err(|e| Error::MintCallFailed(format!("load keyset: {}", e)))
}

/// Mark the operation failed and log the range that can no longer be used
fn abandon(trace: &mut OperationTrace, reservation: &Reservation, err: Error) -> Error {
    if let Err(state_err) = trace.fail() {
        return state_err;
    }
    tracing::warn!(
        "Abandoned counters [{}, {}) for keyset {}: {}",
        reservation.start,
        reservation.next,
        reservation.keyset_id,
        err
    );

    if matches!(err, Error::MintCallFailed(_)) {
        err
    } else {
        Error::MintCallFailed(err.to_string())
    }
}

/// Mark the operation failed after the mint answered but the store refused it
fn unstored(trace: &mut OperationTrace, reservation: &Reservation, err: Error) -> Error {
    if let Err(state_err) = trace.fail() {
        return state_err;
    }
    tracing::warn!(
        "Mint answered for counters [{}, {}) of keyset {} but storing the result failed: {}",
        reservation.start,
        reservation.next,
        reservation.keyset_id,
        err
    );
    err
}

/// Inputs must be distinct stored proofs covering `amount`; returns their total
fn check_plan_inputs(inputs: &[Proof], available: &[Proof], amount: u64) -> Result<u64> {
    let stored: HashMap<&str, &Proof> = available.iter().map(|p| (p.secret.as_str(), p)).collect();
    let mut seen = HashSet::with_capacity(inputs.len());

    for input in inputs {
        if stored.get(input.secret.as_str()) != Some(&input) {
            return Err(Error::Internal(format!(
                "split plan input {} is not a stored proof",
                input.secret
            )));
        }
        if !seen.insert(input.secret.as_str()) {
            return Err(Error::Internal(format!(
                "split plan spends {} twice",
                input.secret
            )));
        }
    }

    let total = total_amount(inputs)?;
    if total < amount {
        return Err(Error::Internal(format!(
            "split plan inputs total {} below amount {}",
            total, amount
        )));
    }
    Ok(total)
}

/// Returned proofs must be valid, distinct, and sit on prepared secrets
fn check_issued(proofs: &[Proof], keyset: &KeysetId, outputs: &[PreparedOutput]) -> Result<()> {
    let prepared: HashSet<&str> = outputs.iter().map(|o| o.secret.as_str()).collect();
    let mut seen = HashSet::with_capacity(proofs.len());

    for proof in proofs {
        proof
            .validate()
            .map_err(|e| Error::MintCallFailed(format!("mint returned {}", e)))?;
        if &proof.keyset_id != keyset {
            return Err(Error::MintCallFailed(format!(
                "proof {} issued under keyset {}, expected {}",
                proof.secret, proof.keyset_id, keyset
            )));
        }
        if !prepared.contains(proof.secret.as_str()) {
            return Err(Error::MintCallFailed(format!(
                "proof {} was not requested",
                proof.secret
            )));
        }
        if !seen.insert(proof.secret.as_str()) {
            return Err(Error::MintCallFailed(format!(
                "proof {} returned twice",
                proof.secret
            )));
        }
    }
    Ok(())
}

/// A swap must use every prepared output and carry the token's full value
fn check_received(proofs: &[Proof], value: u64, outputs: &[PreparedOutput]) -> Result<u64> {
    if proofs.len() != outputs.len() {
        return Err(Error::MintCallFailed(format!(
            "mint returned {} proofs for {} outputs",
            proofs.len(),
            outputs.len()
        )));
    }
    let received = total_amount(proofs).map_err(|e| Error::MintCallFailed(e.to_string()))?;
    if received != value {
        return Err(Error::MintCallFailed(format!(
            "received proofs total {}, token carries {}",
            received, value
        )));
    }
    Ok(received)
}

/// Split amounts must balance exactly
fn check_split(keep: &[Proof], send: &[Proof], amount: u64, input_total: u64) -> Result<()> {
    let sent = total_amount(send).map_err(|e| Error::MintCallFailed(e.to_string()))?;
    let kept = total_amount(keep).map_err(|e| Error::MintCallFailed(e.to_string()))?;

    if sent != amount {
        return Err(Error::MintCallFailed(format!(
            "send proofs total {}, expected {}",
            sent, amount
        )));
    }
    if kept.checked_add(amount) != Some(input_total) {
        return Err(Error::MintCallFailed(format!(
            "change {} plus amount {} does not equal inputs {}",
            kept, amount, input_total
        )));
    }
    Ok(())
}
