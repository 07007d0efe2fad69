//! Data-source clients: validator node RPC, dashboard and explorer.
//!
//! Each source is a trait so the evaluation engine can run against fakes.
//! Implementations perform exactly one round trip per call; retrying is the
//! caller's job (see [`crate::retry`]).

pub mod dashboard;
mod de;
pub mod explorer;
pub mod http;
pub mod node;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::TransportError;

pub use dashboard::DashboardClient;
pub use explorer::ExplorerClient;
pub use http::HttpClient;
pub use node::NodeClient;

/// A block reference reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Block {
    #[serde(deserialize_with = "de::u64_lenient")]
    pub number: u64,
    #[serde(default)]
    pub hash: String,
}

/// Chain tips reported by a validator's node.
///
/// `finalized <= proven <= latest` is expected but not checked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeTip {
    pub latest: Block,
    pub proven: Block,
    pub finalized: Block,
}

/// Statistics for a validator the dashboard knows as active.
///
/// Raw amounts are in the chain's smallest unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveStats {
    pub status_label: String,
    pub balance: u128,
    pub unclaimed_rewards: u128,
    pub attestations_succeeded: u64,
    pub attestations_missed: u64,
    /// Rate as printed by the dashboard; informational only
    pub attestation_success_label: Option<String>,
    pub blocks_proposed: u64,
    pub blocks_mined: u64,
    pub blocks_missed: u64,
}

/// Dashboard view of one validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardStats {
    Active(ActiveStats),
    NotFound,
    Exited { status_label: String },
    Unknown,
}

/// Position of a not-yet-active validator in the entry queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePosition {
    Ranked(u64),
    NotRegistered,
}

/// JSON-RPC interface of a validator node.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn fetch_node_tip(&self, host: &str, port: u16) -> Result<NodeTip, TransportError>;

    async fn fetch_node_version(&self, host: &str, port: u16) -> Result<String, TransportError>;
}

/// Network-wide chain height.
#[async_trait]
pub trait Explorer: Send + Sync {
    async fn fetch_explorer_height(&self) -> Result<u64, TransportError>;
}

/// Per-validator performance dashboard.
#[async_trait]
pub trait Dashboard: Send + Sync {
    async fn fetch_dashboard_stats(&self, address: &str) -> Result<DashboardStats, TransportError>;

    async fn fetch_queue_position(&self, address: &str) -> Result<QueuePosition, TransportError>;
}
