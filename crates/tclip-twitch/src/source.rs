//! Selection engine collaborators backed by Helix.

use async_trait::async_trait;
use tclip_engine::{ClipQuery, ClipSource, MetadataSource, TokenSupplier, TransportError};
use tclip_models::{Clip, Creator, CreatorId};

use crate::client::{HelixClient, HELIX_MAX_PAGE};

#[async_trait]
impl TokenSupplier for HelixClient {
    async fn get_token(&self) -> Result<String, TransportError> {
        Ok(self.app_token().await?)
    }
}

#[async_trait]
impl ClipSource for HelixClient {
    async fn fetch_clips(
        &self,
        query: &ClipQuery,
        token: &str,
    ) -> Result<Vec<Clip>, TransportError> {
        Ok(self
            .get_clips(
                &query.topic_id,
                query.started_at,
                query.ended_at,
                query.max_count,
                token,
            )
            .await?)
    }

    fn name(&self) -> &'static str {
        "helix_clips"
    }
}

#[async_trait]
impl MetadataSource for HelixClient {
    fn max_ids_per_request(&self) -> usize {
        HELIX_MAX_PAGE
    }

    async fn fetch_creators(
        &self,
        ids: &[CreatorId],
        token: &str,
    ) -> Result<Vec<Creator>, TransportError> {
        Ok(self.get_creators(ids, token).await?)
    }

    fn name(&self) -> &'static str {
        "helix_creators"
    }
}
