// Chain signer module
// This file defines the signer capability every chain family implements,
// the keyring collaborator and the factory resolving a signer per chain
//
// Numan Thabit 2025 Nov

pub mod evm;
pub mod solana;

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::ChainRegistry;
use crate::errors::{SignerError, SwapError};
use crate::router::routes::TxTemplate;
use crate::transport::jsonrpc::JsonRpc;
use crate::types::{ChainFamily, ChainId};

pub use evm::EvmSigner;
pub use solana::SolanaSigner;

/// Signs and submits transactions for one chain.
#[async_trait]
pub trait ChainSigner: Send + Sync {
    fn family(&self) -> ChainFamily;

    /// Signer address in the chain's native encoding.
    fn address(&self) -> String;

    /// Allowance granted by the signer to `spender` for `token`.
    async fn allowance(&self, token: &str, spender: &str) -> Result<u128, SignerError>;

    /// Unsigned approval transaction granting `spender` `amount` of `token`.
    fn approval_template(
        &self,
        token: &str,
        spender: &str,
        amount: u128,
    ) -> Result<TxTemplate, SignerError>;

    /// Sign, broadcast and wait for inclusion. Returns the transaction hash.
    async fn sign_and_send(&self, template: &TxTemplate) -> Result<String, SignerError>;
}

/// Key material provider. Keys are handed out on demand and never cached here.
pub trait Keyring: Send + Sync {
    fn secp256k1_secret(&self, chain: ChainId) -> Result<[u8; 32], SignerError>;
    fn ed25519_seed(&self, chain: ChainId) -> Result<[u8; 32], SignerError>;
}

/// Resolves the signer for a chain.
pub trait SignerResolver: Send + Sync {
    fn signer_for(&self, chain: ChainId) -> Result<Arc<dyn ChainSigner>, SwapError>;
}

/// Builds signers from the chain registry and a keyring.
#[derive(Clone)]
pub struct SignerFactory {
    chains: ChainRegistry,
    keyring: Arc<dyn Keyring>,
    inclusion_timeout: Duration,
}

impl SignerFactory {
    pub fn new(chains: ChainRegistry, keyring: Arc<dyn Keyring>, inclusion_timeout: Duration) -> Self {
        Self {
            chains,
            keyring,
            inclusion_timeout,
        }
    }
}

impl SignerResolver for SignerFactory {
    fn signer_for(&self, chain: ChainId) -> Result<Arc<dyn ChainSigner>, SwapError> {
        let cfg = self
            .chains
            .get(chain)
            .ok_or(SwapError::UnsupportedChain(chain.as_u64()))?;
        let key_err = |e: SignerError| SwapError::StepSubmissionFailed {
            step: 0,
            reason: format!("signer for chain {chain}: {e}"),
            tx_hash: None,
            may_have_landed: false,
        };
        let signer: Arc<dyn ChainSigner> = match cfg.family {
            ChainFamily::Evm => {
                let secret = self.keyring.secp256k1_secret(chain).map_err(key_err)?;
                let rpc = JsonRpc::new(cfg.rpc_url.as_str(), "evm_rpc");
                Arc::new(
                    EvmSigner::new(&secret, chain, rpc, self.inclusion_timeout).map_err(key_err)?,
                )
            }
            ChainFamily::Solana => {
                let seed = self.keyring.ed25519_seed(chain).map_err(key_err)?;
                let rpc = JsonRpc::new(cfg.rpc_url.as_str(), "solana_rpc");
                Arc::new(SolanaSigner::new(&seed, rpc, self.inclusion_timeout))
            }
        };
        debug!(chain = %chain, family = cfg.family.as_str(), "signer resolved");
        Ok(signer)
    }
}

/// Observed inclusion state of a broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Inclusion {
    Pending,
    Included,
    Reverted,
}

/// Poll `probe` until the transaction is included or `limit` elapses.
/// Only polls; the transaction is never resubmitted.
pub(crate) async fn wait_for_inclusion<F, Fut>(
    tx_hash: &str,
    limit: Duration,
    mut probe: F,
) -> Result<(), SignerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Inclusion, SignerError>>,
{
    let policy = ExponentialBackoff {
        initial_interval: Duration::from_millis(500),
        max_interval: Duration::from_secs(5),
        max_elapsed_time: Some(limit),
        multiplier: 1.5,
        ..Default::default()
    };
    let outcome = retry(policy, || {
        let pending = probe();
        async move {
            match pending.await {
                Ok(Inclusion::Included) => Ok(true),
                Ok(Inclusion::Reverted) => Ok(false),
                Ok(Inclusion::Pending) => Err(backoff::Error::transient(SignerError::Rpc(
                    "not yet included".into(),
                ))),
                Err(err) => {
                    debug!(error = %err, "inclusion probe failed");
                    Err(backoff::Error::transient(err))
                }
            }
        }
    })
    .await;

    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => Err(SignerError::Reverted {
            tx_hash: tx_hash.to_string(),
        }),
        Err(_) => Err(SignerError::InclusionTimeout {
            tx_hash: tx_hash.to_string(),
        }),
    }
}
