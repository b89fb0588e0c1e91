// EVM chain signer
// Builds legacy or EIP-1559 transactions from venue templates, signs them
// with a local secp256k1 wallet and waits for the receipt
//
// Numan Thabit 2025 Nov

use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, TransactionRequest, H256, U256};
use ethers::utils::keccak256;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::SignerError;
use crate::router::routes::TxTemplate;
use crate::signers::{wait_for_inclusion, ChainSigner, Inclusion};
use crate::transport::jsonrpc::JsonRpc;
use crate::types::{ChainFamily, ChainId};

// ERC-20 selectors
const ALLOWANCE_SELECTOR: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e];
const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

pub struct EvmSigner {
    wallet: LocalWallet,
    chain: ChainId,
    rpc: JsonRpc,
    inclusion_timeout: Duration,
}

impl EvmSigner {
    pub fn new(
        secret: &[u8; 32],
        chain: ChainId,
        rpc: JsonRpc,
        inclusion_timeout: Duration,
    ) -> Result<Self, SignerError> {
        let wallet = LocalWallet::from_bytes(secret)
            .map_err(|e| SignerError::Rejected(format!("invalid secp256k1 key: {e}")))?
            .with_chain_id(chain.as_u64());
        Ok(Self {
            wallet,
            chain,
            rpc,
            inclusion_timeout,
        })
    }

    async fn fill_missing(&self, tx: &mut TypedTransaction) -> Result<(), SignerError> {
        if tx.nonce().is_none() {
            let nonce: String = self
                .rpc
                .call(
                    "eth_getTransactionCount",
                    json!([format!("{:#x}", self.wallet.address()), "pending"]),
                )
                .await?;
            tx.set_nonce(parse_hex_quantity(&nonce)?);
        }
        if tx.gas().is_none() {
            let gas: String = self.rpc.call("eth_estimateGas", json!([&*tx])).await?;
            tx.set_gas(parse_hex_quantity(&gas)?);
        }
        if let TypedTransaction::Eip1559(inner) = tx {
            if inner.max_priority_fee_per_gas.is_none() {
                let tip: String = self
                    .rpc
                    .call("eth_maxPriorityFeePerGas", json!([]))
                    .await?;
                inner.max_priority_fee_per_gas = Some(parse_hex_quantity(&tip)?);
            }
        } else if tx.gas_price().is_none() {
            let price: String = self.rpc.call("eth_gasPrice", json!([])).await?;
            tx.set_gas_price(parse_hex_quantity(&price)?);
        }
        Ok(())
    }

    async fn receipt_status(&self, tx_hash: &str) -> Result<Inclusion, SignerError> {
        let receipt: Option<Value> = self
            .rpc
            .call("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        Ok(match receipt {
            None => Inclusion::Pending,
            Some(receipt) => match receipt.get("status").and_then(Value::as_str) {
                Some("0x0") => Inclusion::Reverted,
                _ => Inclusion::Included,
            },
        })
    }
}

/// Parse a JSON quantity: number, `0x` hex string or decimal string.
fn quantity(payload: &Value, field: &str) -> Result<Option<U256>, SignerError> {
    let raw = match payload.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => {
            return n
                .as_u64()
                .map(|v| Some(U256::from(v)))
                .ok_or_else(|| SignerError::Rejected(format!("{field}: not an unsigned integer")))
        }
        Some(Value::String(s)) => s.trim(),
        Some(other) => {
            return Err(SignerError::Rejected(format!(
                "{field}: unexpected value {other}"
            )))
        }
    };
    let parsed = if raw.starts_with("0x") || raw.starts_with("0X") {
        parse_hex_quantity(raw)
    } else {
        U256::from_dec_str(raw).map_err(|e| SignerError::Rejected(format!("{field}: {e:?}")))
    }?;
    Ok(Some(parsed))
}

fn parse_hex_quantity(raw: &str) -> Result<U256, SignerError> {
    let digits = raw.trim_start_matches("0x").trim_start_matches("0X");
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| SignerError::Rejected(format!("bad hex quantity {raw}: {e:?}")))
}

fn address(raw: &str, field: &str) -> Result<Address, SignerError> {
    Address::from_str(raw.trim())
        .map_err(|e| SignerError::Rejected(format!("{field}: bad address {raw}: {e}")))
}

fn calldata(payload: &Value) -> Result<Bytes, SignerError> {
    let raw = payload.get("data").and_then(Value::as_str).unwrap_or("0x");
    hex::decode(raw.trim_start_matches("0x"))
        .map(Bytes::from)
        .map_err(|e| SignerError::Rejected(format!("data: {e}")))
}

/// Typed transaction out of an opaque template payload. Fields the template
/// leaves out (nonce, gas, fees) stay unset for the node to fill.
pub fn build_transaction(
    payload: &Value,
    chain: ChainId,
    from: Address,
) -> Result<TypedTransaction, SignerError> {
    let to = payload
        .get("to")
        .and_then(Value::as_str)
        .ok_or_else(|| SignerError::Rejected("template has no `to` address".into()))?;
    let to = address(to, "to")?;
    let data = calldata(payload)?;
    let value = quantity(payload, "value")?.unwrap_or_default();
    let gas = match quantity(payload, "gasLimit")? {
        Some(gas) => Some(gas),
        None => quantity(payload, "gas")?,
    };
    let nonce = quantity(payload, "nonce")?;

    if let Some(chain_field) = quantity(payload, "chainId")? {
        if chain_field != U256::from(chain.as_u64()) {
            return Err(SignerError::Rejected(format!(
                "template targets chain {chain_field}, signer is on {chain}"
            )));
        }
    }

    let tx = match quantity(payload, "maxFeePerGas")? {
        Some(max_fee) => {
            let mut req = Eip1559TransactionRequest::new()
                .from(from)
                .to(to)
                .data(data)
                .value(value)
                .chain_id(chain.as_u64())
                .max_fee_per_gas(max_fee);
            if let Some(tip) = quantity(payload, "maxPriorityFeePerGas")? {
                req = req.max_priority_fee_per_gas(tip);
            }
            if let Some(gas) = gas {
                req = req.gas(gas);
            }
            if let Some(nonce) = nonce {
                req = req.nonce(nonce);
            }
            TypedTransaction::Eip1559(req)
        }
        None => {
            let mut req = TransactionRequest::new()
                .from(from)
                .to(to)
                .data(data)
                .value(value)
                .chain_id(chain.as_u64());
            if let Some(price) = quantity(payload, "gasPrice")? {
                req = req.gas_price(price);
            }
            if let Some(gas) = gas {
                req = req.gas(gas);
            }
            if let Some(nonce) = nonce {
                req = req.nonce(nonce);
            }
            TypedTransaction::Legacy(req)
        }
    };
    Ok(tx)
}

pub fn approve_calldata(spender: Address, amount: u128) -> Vec<u8> {
    let mut out = APPROVE_SELECTOR.to_vec();
    out.extend(encode(&[Token::Address(spender), Token::Uint(U256::from(amount))]));
    out
}

pub fn allowance_calldata(owner: Address, spender: Address) -> Vec<u8> {
    let mut out = ALLOWANCE_SELECTOR.to_vec();
    out.extend(encode(&[Token::Address(owner), Token::Address(spender)]));
    out
}

/// Decode a `uint256` return value, saturating at `u128::MAX`.
fn decode_allowance(raw: &str) -> Result<u128, SignerError> {
    let bytes = hex::decode(raw.trim_start_matches("0x"))
        .map_err(|e| SignerError::Rpc(format!("allowance result: {e}")))?;
    if bytes.len() < 32 {
        return Err(SignerError::Rpc(format!(
            "allowance result too short: {} bytes",
            bytes.len()
        )));
    }
    let value = U256::from_big_endian(&bytes[..32]);
    Ok(if value > U256::from(u128::MAX) {
        u128::MAX
    } else {
        value.as_u128()
    })
}

#[async_trait]
impl ChainSigner for EvmSigner {
    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    fn address(&self) -> String {
        format!("{:#x}", self.wallet.address())
    }

    async fn allowance(&self, token: &str, spender: &str) -> Result<u128, SignerError> {
        let data = allowance_calldata(self.wallet.address(), address(spender, "spender")?);
        let result: String = self
            .rpc
            .call(
                "eth_call",
                json!([
                    { "to": token, "data": format!("0x{}", hex::encode(data)) },
                    "latest"
                ]),
            )
            .await?;
        decode_allowance(&result)
    }

    fn approval_template(
        &self,
        token: &str,
        spender: &str,
        amount: u128,
    ) -> Result<TxTemplate, SignerError> {
        let data = approve_calldata(address(spender, "spender")?, amount);
        Ok(TxTemplate {
            chain: self.chain,
            payload: json!({
                "to": token,
                "data": format!("0x{}", hex::encode(data)),
                "value": "0",
                "chainId": self.chain.as_u64(),
            }),
        })
    }

    #[tracing::instrument(skip_all, fields(chain = %self.chain))]
    async fn sign_and_send(&self, template: &TxTemplate) -> Result<String, SignerError> {
        let mut tx = build_transaction(&template.payload, self.chain, self.wallet.address())?;
        self.fill_missing(&mut tx).await?;

        let signature = self
            .wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| SignerError::Rejected(format!("sign: {e}")))?;
        let raw = tx.rlp_signed(&signature);
        let local_hash = format!("{:#x}", H256::from(keccak256(&raw)));

        let tx_hash = match self
            .rpc
            .call_raw(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(&raw))]),
            )
            .await
        {
            Ok(Ok(hash)) => hash.as_str().map(str::to_string).unwrap_or(local_hash),
            Ok(Err(fault)) => {
                return Err(SignerError::Rejected(format!(
                    "node rejected transaction: {} (code {})",
                    fault.message, fault.code
                )))
            }
            // the node may have accepted the bytes before the connection failed
            Err(err) => {
                debug!(error = %err, tx_hash = %local_hash, "broadcast outcome unknown");
                return Err(SignerError::InclusionTimeout { tx_hash: local_hash });
            }
        };
        info!(tx_hash = %tx_hash, "transaction broadcast");

        wait_for_inclusion(&tx_hash, self.inclusion_timeout, || {
            self.receipt_status(&tx_hash)
        })
        .await?;
        info!(tx_hash = %tx_hash, "transaction included");
        Ok(tx_hash)
    }
}
