//! Ledger adapter for a MultiChain-style node speaking JSON-RPC over HTTP.
//!
//! Each batch key maps to a stream key; each event is one stream item whose
//! data is the hex envelope from [`crate::codec`]. Sequence markers are the
//! 1-based position of an item in its key's item list.

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use qms_types::{BatchEvent, BatchKey, SequencedEvent};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::codec::{decode_event, encode_event};
use crate::error::LedgerError;
use crate::traits::{LedgerReader, LedgerWriter};

/// MultiChain's code for a stream or other named entity that does not exist.
const ENTITY_NOT_FOUND: i64 = -708;

/// Connection settings for [`RpcLedger`].
#[derive(Clone, PartialEq, Eq)]
pub struct RpcConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub stream: String,
    pub timeout: Duration,
    pub page_size: usize,
}

impl RpcConfig {
    pub const DEFAULT_STREAM: &'static str = "root";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_PAGE_SIZE: usize = 500;

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            user: String::new(),
            password: String::new(),
            stream: Self::DEFAULT_STREAM.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for RpcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("stream", &self.stream)
            .field("timeout", &self.timeout)
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// One item from `liststreamkeyitems`.
#[derive(Debug, Deserialize)]
struct StreamItem {
    txid: String,
    /// Hex string when inlined; an object reference for off-chain data.
    data: Value,
}

#[derive(Deserialize)]
struct StreamKeyInfo {
    key: String,
}

/// Blocking JSON-RPC client over `ureq`.
pub struct RpcLedger {
    config: RpcConfig,
    agent: ureq::Agent,
    endpoint: String,
    authorization: String,
}

impl RpcLedger {
    pub fn new(config: RpcConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        let credentials = STANDARD.encode(format!("{}:{}", config.user, config.password));
        Self {
            endpoint: config.endpoint(),
            authorization: format!("Basic {credentials}"),
            agent,
            config,
        }
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": method,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, endpoint = %self.endpoint, "ledger rpc call");

        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &self.authorization)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string());

        let text = match response {
            Ok(resp) => resp.into_string().map_err(|e| self.io_error(method, e))?,
            Err(ureq::Error::Status(code @ (401 | 403), _)) => {
                return Err(LedgerError::Authentication(format!(
                    "HTTP {code} from {} as user '{}'",
                    self.endpoint, self.config.user
                )));
            }
            // Nodes report JSON-RPC errors with a 4xx/5xx status and a JSON body.
            Err(ureq::Error::Status(code, resp)) => resp
                .into_string()
                .map_err(|e| self.io_error(method, e))
                .and_then(|text| {
                    if text.trim().is_empty() {
                        Err(LedgerError::Connection(format!(
                            "{method}: HTTP {code} with empty body"
                        )))
                    } else {
                        Ok(text)
                    }
                })?,
            Err(ureq::Error::Transport(transport)) => {
                return Err(self.transport_error(method, &transport));
            }
        };

        let parsed: RpcResponse = serde_json::from_str(&text)
            .map_err(|e| LedgerError::Decode(format!("{method}: response is not JSON-RPC: {e}")))?;
        if let Some(error) = parsed.error {
            return Err(match error.code {
                ENTITY_NOT_FOUND => LedgerError::NotFound(error.message),
                code => LedgerError::Rpc {
                    code,
                    message: error.message,
                },
            });
        }
        Ok(parsed.result)
    }

    fn transport_error(&self, method: &str, transport: &ureq::Transport) -> LedgerError {
        if is_timeout(transport) {
            return LedgerError::Timeout(self.config.timeout);
        }
        match transport.kind() {
            ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed => {
                LedgerError::Connection(format!("{}: {transport}", self.endpoint))
            }
            _ => LedgerError::Connection(format!("{method}: {transport}")),
        }
    }

    fn io_error(&self, method: &str, err: io::Error) -> LedgerError {
        if matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
            LedgerError::Timeout(self.config.timeout)
        } else {
            LedgerError::Connection(format!("{method}: reading response: {err}"))
        }
    }

    /// Every item under `key`, paging until a short page.
    fn items(&self, key: &BatchKey) -> Result<Vec<StreamItem>, LedgerError> {
        let page_size = self.config.page_size.max(1);
        let mut items = Vec::new();
        loop {
            let start = items.len();
            let page = self.call(
                "liststreamkeyitems",
                json!([self.config.stream, key.as_str(), false, page_size, start]),
            )?;
            let page: Vec<StreamItem> = serde_json::from_value(page).map_err(|e| {
                LedgerError::Decode(format!("liststreamkeyitems: unexpected item shape: {e}"))
            })?;
            let fetched = page.len();
            items.extend(page);
            if fetched < page_size {
                break;
            }
        }
        tracing::debug!(key = %key, items = items.len(), "fetched stream items");
        Ok(items)
    }
}

impl LedgerWriter for RpcLedger {
    fn publish(&self, key: &BatchKey, event: &BatchEvent) -> Result<u64, LedgerError> {
        let payload = encode_event(event)?;
        let txid = self.call("publish", json!([self.config.stream, key.as_str(), payload]))?;
        let txid = txid
            .as_str()
            .ok_or_else(|| LedgerError::Decode(format!("publish: expected txid, got {txid}")))?
            .to_string();

        // The write has landed once a txid is back; the lookup only numbers it.
        let seq = match self.items(key) {
            Ok(items) => match items.iter().position(|item| item.txid == txid) {
                Some(index) => index as u64 + 1,
                None => items.len() as u64 + 1,
            },
            Err(err) => {
                tracing::warn!(
                    key = %key,
                    txid = %txid,
                    error = %err,
                    "published event but could not read back its position"
                );
                0
            }
        };
        tracing::debug!(key = %key, seq, txid = %txid, kind = %event.kind(), "published event");
        Ok(seq)
    }
}

impl LedgerReader for RpcLedger {
    fn retrieve_all(&self, key: &BatchKey) -> Result<Vec<SequencedEvent>, LedgerError> {
        self.items(key)?
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let Value::String(payload) = &item.data else {
                    return Err(LedgerError::Decode(format!(
                        "item {} under '{key}' is not inlined",
                        item.txid
                    )));
                };
                Ok(SequencedEvent::new(index as u64 + 1, decode_event(payload)?))
            })
            .collect()
    }

    fn list_keys(&self) -> Result<BTreeSet<BatchKey>, LedgerError> {
        let keys = self.call("liststreamkeys", json!([self.config.stream]))?;
        let keys: Vec<StreamKeyInfo> = serde_json::from_value(keys)
            .map_err(|e| LedgerError::Decode(format!("liststreamkeys: unexpected shape: {e}")))?;
        // Stream keys are non-empty by construction on the node.
        Ok(keys
            .into_iter()
            .filter_map(|info| BatchKey::new(info.key).ok())
            .collect())
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(io_err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
                return true;
            }
        }
        source = err.source();
    }
    transport.to_string().contains("timed out")
}
