//! JSON-RPC 1.0 client for a node's mining calls.
//!
//! The HTTP layer is supplied by the caller through [`Transport`]; this
//! module only builds request envelopes and interprets responses.

use std::sync::atomic::{AtomicU64, Ordering};

use pow_core::BlockTemplate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{Result, WorkerError};

/// Request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// Error object carried by a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Response envelope. `result` and `error` are both optional because nodes
/// send an explicit `null` for whichever is unused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
    #[serde(default)]
    pub id: Option<u64>,
}

/// Carries a serialized request to the node and returns the raw reply body.
pub trait Transport: Send {
    fn post(&self, body: &str) -> Result<String>;
}

/// Source of block templates.
pub trait TemplateProvider {
    fn block_template(&self) -> Result<BlockTemplate>;
}

/// Node verdict on a submitted block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected(String),
}

/// Sink for solved blocks.
pub trait SolutionSubmitter {
    /// Submit a fully serialized block as hex.
    fn submit_block(&self, block_hex: &str) -> Result<SubmitOutcome>;
}

/// JSON-RPC client over a [`Transport`].
#[derive(Debug)]
pub struct RpcClient<T> {
    transport: T,
    next_id: AtomicU64,
}

impl<T: Transport> RpcClient<T> {
    pub fn new(transport: T) -> Self {
        RpcClient {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Call `method` and decode its result. A missing result is decoded as
    /// JSON `null`.
    pub fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R> {
        let request = RpcRequest {
            jsonrpc: "1.0".to_string(),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: method.to_string(),
            params,
        };
        let body = serde_json::to_string(&request)?;
        debug!(method, id = request.id, "rpc call");

        let reply = self.transport.post(&body)?;
        let response: RpcResponse = serde_json::from_str(&reply)?;
        if let Some(error) = response.error {
            return Err(WorkerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
    }
}

impl<T: Transport> TemplateProvider for RpcClient<T> {
    fn block_template(&self) -> Result<BlockTemplate> {
        self.call("getblocktemplate", json!([{ "rules": ["segwit"] }]))
    }
}

impl<T: Transport> SolutionSubmitter for RpcClient<T> {
    fn submit_block(&self, block_hex: &str) -> Result<SubmitOutcome> {
        let reason: Option<String> = self.call("submitblock", json!([block_hex]))?;
        Ok(match reason {
            None => SubmitOutcome::Accepted,
            Some(reason) => SubmitOutcome::Rejected(reason),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replies with canned bodies and records what was sent.
    struct CannedTransport {
        replies: Mutex<Vec<String>>,
        sent: Mutex<Vec<String>>,
    }

    impl CannedTransport {
        fn new(replies: &[&str]) -> Self {
            CannedTransport {
                replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl Transport for CannedTransport {
        fn post(&self, body: &str) -> Result<String> {
            self.sent.lock().unwrap().push(body.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| WorkerError::Transport("connection refused".into()))
        }
    }

    const TEMPLATE_REPLY: &str = r#"{"result":{"version":536870912,"previousblockhash":"0f9188f13cb7b2c71f2a335e3a4fc328bf5beb436012afca590b1a11466e2206","transactions":[],"coinbasevalue":5000000000,"curtime":1700000000,"bits":"207fffff","height":1,"mintime":1},"error":null,"id":1}"#;

    #[test]
    fn test_request_envelope() {
        let client = RpcClient::new(CannedTransport::new(&[TEMPLATE_REPLY]));
        client.block_template().unwrap();

        let sent = client.transport().sent.lock().unwrap();
        let request: RpcRequest = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(request.jsonrpc, "1.0");
        assert_eq!(request.id, 1);
        assert_eq!(request.method, "getblocktemplate");
        assert_eq!(request.params, json!([{ "rules": ["segwit"] }]));
    }

    #[test]
    fn test_block_template() {
        let client = RpcClient::new(CannedTransport::new(&[TEMPLATE_REPLY]));
        let template = client.block_template().unwrap();
        assert_eq!(template.height, 1);
        assert_eq!(template.bits, "207fffff");
    }

    #[test]
    fn test_submit_block_outcomes() {
        let client = RpcClient::new(CannedTransport::new(&[
            r#"{"result":null,"error":null,"id":1}"#,
            r#"{"result":"high-hash","error":null,"id":2}"#,
        ]));
        assert_eq!(client.submit_block("00").unwrap(), SubmitOutcome::Accepted);
        assert_eq!(
            client.submit_block("00").unwrap(),
            SubmitOutcome::Rejected("high-hash".into())
        );

        let sent = client.transport().sent.lock().unwrap();
        let second: RpcRequest = serde_json::from_str(&sent[1]).unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(second.params, json!(["00"]));
    }

    #[test]
    fn test_rpc_error_object() {
        let client = RpcClient::new(CannedTransport::new(&[
            r#"{"result":null,"error":{"code":-10,"message":"Bitcoin is downloading blocks..."},"id":1}"#,
        ]));
        match client.block_template() {
            Err(WorkerError::Rpc { code, message }) => {
                assert_eq!(code, -10);
                assert!(message.contains("downloading"));
            }
            other => panic!("expected rpc error, got {:?}", other),
        }
    }

    #[test]
    fn test_transport_and_parse_failures() {
        let client = RpcClient::new(CannedTransport::new(&["not json"]));
        assert!(matches!(client.block_template(), Err(WorkerError::Json(_))));
        assert!(matches!(client.block_template(), Err(WorkerError::Transport(_))));

        let client = RpcClient::new(CannedTransport::new(&[r#"{"result":null,"error":null}"#]));
        assert!(matches!(client.block_template(), Err(WorkerError::Json(_))));
    }
}
