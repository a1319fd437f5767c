//! Shared mocks for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wallet_kit::*;

pub const SIGNER: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const CONTRACT: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

/// Route library logs to the test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("wallet_kit=debug")),
        )
        .with_test_writer()
        .try_init();
}

pub fn address(s: &str) -> Address {
    s.parse().unwrap()
}

pub fn feed_interface() -> Arc<dyn ContractInterface> {
    Arc::new(SelectorInterface::new().function("feed()"))
}

// =============================================================================
// Signer
// =============================================================================

/// Signer that records what it was asked to send.
pub struct StaticSigner {
    pub address: Address,
    pub chain_id: u64,
    pub sent: Mutex<Vec<TransactionRequest>>,
}

impl StaticSigner {
    pub fn new(address: Address, chain_id: u64) -> Arc<Self> {
        Arc::new(Self {
            address,
            chain_id,
            sent: Mutex::new(Vec::new()),
        })
    }
}

impl Signer for StaticSigner {
    fn address(&self) -> &Address {
        &self.address
    }

    fn chain_id(&self) -> SignerFuture<'_, u64> {
        Box::pin(async move { Ok(self.chain_id) })
    }

    fn estimate_gas(&self, _tx: &TransactionRequest) -> SignerFuture<'_, u64> {
        Box::pin(async { Ok(21_000) })
    }

    fn send_transaction(&self, tx: TransactionRequest) -> SignerFuture<'_, TxHash> {
        self.sent.lock().unwrap().push(tx);
        Box::pin(async { Ok(TxHash::from_bytes([0x11; 32])) })
    }
}

/// Connect `client` through a [`MockConnector`] wrapping `signer`.
pub async fn connect(client: &Client, signer: Arc<StaticSigner>) -> Arc<MockConnector> {
    let chain_id = signer.chain_id;
    let connector = Arc::new(MockConnector::new(signer, chain_id));
    client.connect(connector.clone()).await.unwrap();
    connector
}

// =============================================================================
// Preparer
// =============================================================================

/// Preparer that counts calls and answers with a fixed request.
pub struct CountingPreparer {
    pub calls: AtomicU32,
    pub configs: Mutex<Vec<PrepareWriteContractConfig>>,
    pub request: TransactionRequest,
    pub delay: Duration,
    pub fail: bool,
}

impl CountingPreparer {
    pub fn new(request: TransactionRequest) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            configs: Mutex::new(Vec::new()),
            request,
            delay: Duration::ZERO,
            fail: false,
        })
    }

    pub fn slow(request: TransactionRequest, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            configs: Mutex::new(Vec::new()),
            request,
            delay,
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            configs: Mutex::new(Vec::new()),
            request: TransactionRequest::default(),
            delay: Duration::ZERO,
            fail: true,
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PrepareWrite for CountingPreparer {
    fn prepare_write_contract(&self, config: PrepareWriteContractConfig) -> PrepareFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.configs.lock().unwrap().push(config.clone());
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(Error::Rpc(RpcError::ExecutionReverted {
                    message: "not hungry".to_string(),
                    data: None,
                }));
            }
            Ok(PreparedWrite {
                address_or_name: config.address_or_name,
                chain_id: config.chain_id,
                function_name: config.function_name,
                args: config.args,
                overrides: config.overrides,
                request: self.request.clone(),
                mode: PrepareMode::Prepared,
            })
        })
    }
}

pub fn mocked_request() -> TransactionRequest {
    TransactionRequest {
        from: Some(address(SIGNER)),
        to: Some(address(CONTRACT)),
        data: Some(Bytes::new(function_selector("feed()").to_vec())),
        gas: Some(50_000),
        ..Default::default()
    }
}

// =============================================================================
// JSON-RPC node
// =============================================================================

/// Minimal HTTP JSON-RPC node.
///
/// Answers each method with a canned result and records every request body.
/// One request per connection; responses carry `Connection: close`.
pub struct MockNode {
    pub url: String,
    pub requests: Arc<Mutex<Vec<Value>>>,
}

impl MockNode {
    pub async fn start(results: HashMap<&'static str, Value>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let results = Arc::new(results);

        let seen = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let seen = seen.clone();
                let results = results.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &results, &seen).await;
                });
            }
        });

        Self { url, requests }
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r["method"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn requests_for(&self, method: &str) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r["method"] == method)
            .cloned()
            .collect()
    }
}

async fn serve(
    mut stream: TcpStream,
    results: &HashMap<&'static str, Value>,
    seen: &Mutex<Vec<Value>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request: Value = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    seen.lock().unwrap().push(request.clone());

    let method = request["method"].as_str().unwrap_or_default();
    let body = match results.get(method) {
        Some(result) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
        None => json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": { "code": -32601, "message": "Method not found" }
        }),
    }
    .to_string();

    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
