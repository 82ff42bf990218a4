//! Wallet facade
//!
//! Binds one recovery phrase to its fingerprinted store and exposes the
//! balance, receive and send operations.

use crate::balance::{Balance, BalanceView};
use crate::coordinator::{OperationCoordinator, ReceiveResult, SendResult};
use crate::state::OperationTrace;
use crate::{Result, WalletConfig};
use ecash_core::{CounterSnapshot, Fingerprint, MintClient, SeedDerivation, TokenCodec};
use ecash_storage_sqlite::{CounterStore, Database, ProofStore};

/// Open wallet session
pub struct Wallet<M, C> {
    fingerprint: Fingerprint,
    config: WalletConfig,
    coordinator: OperationCoordinator<M, C>,
}

impl<M, C> Wallet<M, C>
where
    M: MintClient,
    C: TokenCodec,
{
    /// Open the store belonging to `phrase`, creating it on first use.
    ///
    /// The phrase is validated before anything touches the filesystem.
    pub fn open(
        config: WalletConfig,
        phrase: &str,
        passphrase: &str,
        mint: M,
        codec: C,
    ) -> Result<Self> {
        config.validate()?;
        let identity = SeedDerivation::derive(phrase, passphrase)?;

        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            crate::Error::Storage(format!("create {}: {}", config.data_dir.display(), e))
        })?;
        let db = Database::open_for_identity(
            &config.data_dir,
            &identity.fingerprint,
            config.busy_timeout(),
        )?;

        tracing::info!(
            "Opened wallet {} at {}",
            identity.fingerprint,
            db.path().display()
        );

        let coordinator = OperationCoordinator::new(
            db,
            identity.seed,
            mint,
            codec,
            config.unit.clone(),
            config.max_outputs_per_operation,
        );

        Ok(Self {
            fingerprint: identity.fingerprint,
            config,
            coordinator,
        })
    }

    /// Fingerprint selecting this wallet's store
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Active configuration
    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Total stored value
    pub fn get_balance(&self) -> Result<u64> {
        Ok(self.balance()?.total)
    }

    /// Stored value with per-keyset breakdown
    pub fn balance(&self) -> Result<Balance> {
        BalanceView::load(&ProofStore::new(self.coordinator.database()))
    }

    /// Persisted counters of every keyset used so far
    pub fn counters(&self) -> Result<CounterSnapshot> {
        Ok(CounterStore::new(self.coordinator.database()).load_all()?)
    }

    /// Redeem an incoming token
    pub async fn receive(&mut self, token: &str) -> Result<ReceiveResult> {
        self.coordinator.receive(token).await
    }

    /// Create an outgoing token worth `amount`
    pub async fn send(&mut self, amount: u64) -> Result<SendResult> {
        self.coordinator.send(amount).await
    }

    /// Trace of the most recent receive or send
    pub fn last_trace(&self) -> Option<&OperationTrace> {
        self.coordinator.last_trace()
    }

    /// Mint client in use
    pub fn mint(&self) -> &M {
        self.coordinator.mint()
    }
}
