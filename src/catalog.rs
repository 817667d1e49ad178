use async_trait::async_trait;

use crate::error::UpstreamResult;
use crate::stations::{Station, StreamCandidate};

/// The commercial catalog (iHeartRadio).
#[async_trait]
pub trait CommercialCatalog: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> UpstreamResult<Vec<Station>>;

    async fn top(&self, limit: usize) -> UpstreamResult<Vec<Station>>;

    /// Direct content lookup. `Ok(None)` when the catalog has no such id.
    async fn lookup(&self, id: &str) -> UpstreamResult<Option<Station>>;
}

/// The community directory (Radio Browser).
#[async_trait]
pub trait CommunityDirectory: Send + Sync {
    async fn search(&self, name: &str, limit: usize) -> UpstreamResult<Vec<Station>>;

    async fn top_voted(&self, limit: usize) -> UpstreamResult<Vec<Station>>;

    async fn lookup(&self, uuid: &str) -> UpstreamResult<Option<Station>>;

    /// Primary stream candidates of directory entries whose name matches
    /// `name`, used to enrich stations found elsewhere.
    async fn streams_for_name(
        &self,
        name: &str,
        limit: usize,
    ) -> UpstreamResult<Vec<StreamCandidate>>;
}
