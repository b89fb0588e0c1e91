// Solana chain signer
// Signs venue-built serialized transactions (legacy or versioned) with an
// Ed25519 keypair, submits them and waits for confirmation
//
// Numan Thabit 2025 Nov

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use ed25519_dalek::{Signer, SigningKey};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

use crate::errors::SignerError;
use crate::router::routes::TxTemplate;
use crate::signers::{wait_for_inclusion, ChainSigner, Inclusion};
use crate::transport::jsonrpc::JsonRpc;
use crate::types::ChainFamily;

const SIGNATURE_LEN: usize = 64;
const PUBKEY_LEN: usize = 32;
const VERSION_PREFIX_MASK: u8 = 0x80;

pub struct SolanaSigner {
    key: SigningKey,
    rpc: JsonRpc,
    inclusion_timeout: Duration,
}

impl SolanaSigner {
    pub fn new(seed: &[u8; 32], rpc: JsonRpc, inclusion_timeout: Duration) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
            rpc,
            inclusion_timeout,
        }
    }

    fn pubkey(&self) -> [u8; PUBKEY_LEN] {
        self.key.verifying_key().to_bytes()
    }

    async fn signature_status(&self, signature: &str) -> Result<Inclusion, SignerError> {
        let result: Value = self
            .rpc
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;
        let status = result
            .get("value")
            .and_then(|v| v.get(0))
            .filter(|s| !s.is_null());
        Ok(match status {
            None => Inclusion::Pending,
            Some(status) if status.get("err").is_some_and(|e| !e.is_null()) => Inclusion::Reverted,
            Some(status) => match status.get("confirmationStatus").and_then(Value::as_str) {
                Some("confirmed") | Some("finalized") => Inclusion::Included,
                _ => Inclusion::Pending,
            },
        })
    }
}

/// Read a compact-u16 length prefix. Returns (value, bytes consumed).
fn read_shortvec(bytes: &[u8]) -> Result<(usize, usize), SignerError> {
    let mut value = 0usize;
    for (i, byte) in bytes.iter().take(3).enumerate() {
        value |= usize::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(SignerError::Rejected("truncated length prefix".into()))
}

/// Wire layout of a serialized transaction, as offsets into its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WireLayout {
    signatures_at: usize,
    message_at: usize,
    required_signers: usize,
    keys_at: usize,
}

fn parse_layout(tx: &[u8]) -> Result<WireLayout, SignerError> {
    let truncated = || SignerError::Rejected("transaction bytes truncated".into());
    let (signature_count, prefix) = read_shortvec(tx)?;
    let signatures_at = prefix;
    let message_at = signatures_at + signature_count * SIGNATURE_LEN;

    let mut cursor = message_at;
    let first = *tx.get(cursor).ok_or_else(truncated)?;
    if first & VERSION_PREFIX_MASK != 0 {
        // versioned message
        cursor += 1;
    }
    let header = tx.get(cursor..cursor + 3).ok_or_else(truncated)?;
    let required_signers = usize::from(header[0]);
    cursor += 3;

    let (key_count, prefix) = read_shortvec(tx.get(cursor..).ok_or_else(truncated)?)?;
    let keys_at = cursor + prefix;
    if tx.len() < keys_at + key_count * PUBKEY_LEN {
        return Err(truncated());
    }
    if required_signers > key_count || signature_count != required_signers {
        return Err(SignerError::Rejected(format!(
            "transaction has {signature_count} signature slots for {required_signers} required signers"
        )));
    }
    Ok(WireLayout {
        signatures_at,
        message_at,
        required_signers,
        keys_at,
    })
}

/// Sign the message of `tx` in place with `key`. Returns our signature.
fn sign_in_place(tx: &mut [u8], key: &SigningKey) -> Result<[u8; SIGNATURE_LEN], SignerError> {
    let layout = parse_layout(tx)?;
    let pubkey = key.verifying_key().to_bytes();
    let slot = (0..layout.required_signers)
        .find(|i| {
            let at = layout.keys_at + i * PUBKEY_LEN;
            tx[at..at + PUBKEY_LEN] == pubkey
        })
        .ok_or_else(|| {
            SignerError::Rejected("signer is not a required signer of the transaction".into())
        })?;

    let signature = key.sign(&tx[layout.message_at..]).to_bytes();
    let at = layout.signatures_at + slot * SIGNATURE_LEN;
    tx[at..at + SIGNATURE_LEN].copy_from_slice(&signature);
    Ok(signature)
}

/// Serialized transaction out of a template payload.
fn encoded_transaction(payload: &Value) -> Result<&str, SignerError> {
    payload
        .as_str()
        .or_else(|| payload.get("data").and_then(Value::as_str))
        .or_else(|| payload.get("transaction").and_then(Value::as_str))
        .ok_or_else(|| SignerError::Rejected("template carries no serialized transaction".into()))
}

#[async_trait]
impl ChainSigner for SolanaSigner {
    fn family(&self) -> ChainFamily {
        ChainFamily::Solana
    }

    fn address(&self) -> String {
        bs58::encode(self.pubkey()).into_string()
    }

    /// No allowance model: token transfers are authorized by the signature.
    async fn allowance(&self, _token: &str, _spender: &str) -> Result<u128, SignerError> {
        Ok(u128::MAX)
    }

    fn approval_template(
        &self,
        _token: &str,
        _spender: &str,
        _amount: u128,
    ) -> Result<TxTemplate, SignerError> {
        Err(SignerError::Unsupported {
            family: "solana",
            operation: "approve",
        })
    }

    #[tracing::instrument(skip_all)]
    async fn sign_and_send(&self, template: &TxTemplate) -> Result<String, SignerError> {
        let mut tx = B64
            .decode(encoded_transaction(&template.payload)?)
            .map_err(|e| SignerError::Rejected(format!("base64 transaction: {e}")))?;
        let signature = sign_in_place(&mut tx, &self.key)?;
        let expected = bs58::encode(signature).into_string();

        let submitted = self
            .rpc
            .call_raw(
                "sendTransaction",
                json!([
                    B64.encode(&tx),
                    { "encoding": "base64", "preflightCommitment": "confirmed" }
                ]),
            )
            .await;
        let tx_hash = match submitted {
            Ok(Ok(sig)) => sig.as_str().map(str::to_string).unwrap_or(expected),
            Ok(Err(fault)) => {
                return Err(SignerError::Rejected(format!(
                    "node rejected transaction: {} (code {})",
                    fault.message, fault.code
                )))
            }
            Err(_) => return Err(SignerError::InclusionTimeout { tx_hash: expected }),
        };
        info!(tx_hash = %tx_hash, "transaction broadcast");

        wait_for_inclusion(&tx_hash, self.inclusion_timeout, || {
            self.signature_status(&tx_hash)
        })
        .await?;
        info!(tx_hash = %tx_hash, "transaction confirmed");
        Ok(tx_hash)
    }
}
