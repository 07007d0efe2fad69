//! Public explorer client: provides the network-wide chain height.

use async_trait::async_trait;
use serde::Deserialize;

use super::{de, Explorer, HttpClient};
use crate::config::ExplorerConfig;
use crate::error::TransportError;

/// One row of the explorer's latest-blocks table. Only the height matters.
#[derive(Debug, Deserialize)]
struct BlockRow {
    #[serde(deserialize_with = "de::u64_lenient")]
    height: u64,
}

/// Reads the most recent block height from the explorer's block table.
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    http: HttpClient,
    url: String,
}

impl ExplorerClient {
    pub fn new(http: HttpClient, config: &ExplorerConfig) -> Self {
        Self {
            http,
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl Explorer for ExplorerClient {
    async fn fetch_explorer_height(&self) -> Result<u64, TransportError> {
        let rows: Vec<BlockRow> = self.http.get_json(&self.url).await?;
        rows.first().map(|row| row.height).ok_or_else(|| {
            TransportError::UnexpectedResponse("explorer returned no blocks".to_string())
        })
    }
}
