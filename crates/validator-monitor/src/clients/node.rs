//! JSON-RPC client for validator nodes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{HttpClient, NodeRpc, NodeTip};
use crate::error::TransportError;

const METHOD_L2_TIPS: &str = "node_getL2Tips";
const METHOD_NODE_INFO: &str = "node_getNodeInfo";

/// Reported when the node answers but does not say which version it runs.
pub const UNKNOWN_VERSION: &str = "v0.0.0";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'static [Value],
    id: u32,
}

impl<'a> RpcRequest<'a> {
    fn new(method: &'a str) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params: &[],
            id: 67,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeInfo {
    #[serde(default)]
    node_version: Option<String>,
}

/// Talks to `http://{host}:{port}` on each validator.
#[derive(Debug, Clone)]
pub struct NodeClient {
    http: HttpClient,
}

impl NodeClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn call<T>(&self, host: &str, port: u16, method: &str) -> Result<T, TransportError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("http://{host}:{port}");
        let response: RpcResponse<T> = self.http.post_json(&url, &RpcRequest::new(method)).await?;

        response.result.ok_or_else(|| TransportError::Rpc {
            method: method.to_string(),
            message: response
                .error
                .map_or_else(|| "empty response".to_string(), |e| e.to_string()),
        })
    }
}

#[async_trait]
impl NodeRpc for NodeClient {
    async fn fetch_node_tip(&self, host: &str, port: u16) -> Result<NodeTip, TransportError> {
        self.call(host, port, METHOD_L2_TIPS).await
    }

    async fn fetch_node_version(&self, host: &str, port: u16) -> Result<String, TransportError> {
        let info: NodeInfo = self.call(host, port, METHOD_NODE_INFO).await?;
        Ok(info
            .node_version
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| UNKNOWN_VERSION.to_string(), |v| format!("v{v}")))
    }
}
