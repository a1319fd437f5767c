//! Ethereum JSON-RPC over HTTP.
//!
//! One [`RpcClient`] per configured chain. Calls that fail with a
//! retryable [`RpcError`] are repeated with exponential backoff.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::RpcError;
use crate::types::{Address, TransactionRequest, TxHash, parse_quantity};

/// Backoff policy for [`RpcClient`].
///
/// The delay doubles from `initial_delay_ms` on every attempt and is capped
/// at `max_delay_ms`.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(std::cmp::min(
            self.initial_delay_ms.saturating_mul(factor),
            self.max_delay_ms,
        ))
    }
}

const NO_PARAMS: [(); 0] = [];

#[derive(Serialize)]
struct Envelope<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a P,
}

/// Only `result` and `error` matter; `id` is not checked since requests are
/// never pipelined.
#[derive(Deserialize)]
struct Reply<T> {
    result: Option<T>,
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// JSON-RPC client for one EVM node.
///
/// # Example
///
/// ```rust,no_run
/// use wallet_kit::RpcClient;
///
/// # async fn example() -> Result<(), wallet_kit::RpcError> {
/// let rpc = RpcClient::new("http://127.0.0.1:8545");
/// let chain_id = rpc.chain_id().await?;
/// let accounts = rpc.accounts().await?;
/// println!("chain {} with {} unlocked accounts", chain_id, accounts.len());
/// # Ok(())
/// # }
/// ```
pub struct RpcClient {
    endpoint: String,
    http: reqwest::Client,
    retry: RetryConfig,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Client for `url` with the default [`RetryConfig`].
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_retry_config(url, RetryConfig::default())
    }

    pub fn with_retry_config(url: impl Into<String>, retry_config: RetryConfig) -> Self {
        Self {
            endpoint: url.into(),
            http: reqwest::Client::new(),
            retry: retry_config,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.endpoint
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Call `method` with `params`, retrying per the [`RetryConfig`].
    ///
    /// The last error is returned once retries run out.
    pub async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RpcError> {
        let mut attempt = 0;
        loop {
            match self.send_once(method, &params).await {
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    tracing::debug!(method, attempt, ?delay, error = %e, "retrying rpc call");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn send_once<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<R, RpcError> {
        let envelope = Envelope {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        tracing::trace!(method, id = envelope.id, url = %self.endpoint, "rpc request");

        let response = self.http.post(&self.endpoint).json(&envelope).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match status.as_u16() {
            200..=299 => {}
            429 => return Err(RpcError::RateLimited(body)),
            code => {
                return Err(RpcError::network(
                    format!("HTTP {}: {}", status, body),
                    Some(code),
                    is_retryable_status(code),
                ));
            }
        }

        let reply: Reply<R> = serde_json::from_str(&body)?;
        match (reply.result, reply.error) {
            (_, Some(error)) => Err(parse_rpc_error(error)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(RpcError::InvalidResponse(format!(
                "{} returned neither result nor error",
                method
            ))),
        }
    }

    // ========================================================================
    // Ethereum methods
    // ========================================================================

    /// `eth_chainId`
    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        let raw: String = self.call("eth_chainId", NO_PARAMS).await?;
        let id = parse_quantity(&raw)?;
        u64::try_from(id).map_err(|_| RpcError::InvalidResponse(format!("chain id {} too large", raw)))
    }

    /// `eth_accounts`
    pub async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        self.call("eth_accounts", NO_PARAMS).await
    }

    /// `eth_estimateGas`
    pub async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, RpcError> {
        let raw: String = self.call("eth_estimateGas", [tx]).await?;
        let gas = parse_quantity(&raw)?;
        u64::try_from(gas).map_err(|_| RpcError::InvalidResponse(format!("gas {} too large", raw)))
    }

    /// `eth_sendTransaction`, signed by the node for an unlocked account.
    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, RpcError> {
        self.call("eth_sendTransaction", [tx]).await
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("endpoint", &self.endpoint)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Map a JSON-RPC error object onto [`RpcError`].
///
/// Nodes disagree on codes, so reverts and balance failures are also
/// recognised by message.
fn parse_rpc_error(error: ErrorObject) -> RpcError {
    let lower = error.message.to_lowercase();

    if error.code == 3 || lower.contains("execution reverted") {
        let data = error
            .data
            .as_ref()
            .and_then(|d| d.as_str().or_else(|| d.get("data").and_then(|v| v.as_str())))
            .map(String::from);
        return RpcError::ExecutionReverted {
            message: error.message,
            data,
        };
    }

    if lower.contains("insufficient funds") {
        return RpcError::InsufficientFunds(error.message);
    }

    // -32005: limit exceeded (EIP-1474)
    if error.code == -32005 {
        return RpcError::RateLimited(error.message);
    }

    RpcError::Rpc {
        code: error.code,
        message: error.message,
        data: error.data,
    }
}

/// 408 and every 5xx.
fn is_retryable_status(status: u16) -> bool {
    status == 408 || (500..600).contains(&status)
}
