//! Creator metadata resolution.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::try_join_all;
use tclip_models::{Creator, CreatorId};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::source::MetadataSource;

/// Creator profiles keyed by id for one run.
pub type CreatorIndex = HashMap<CreatorId, Creator>;

/// Bulk-fetches the creator attributes the inclusion predicates need.
///
/// Nothing is cached between calls; each run resolves afresh.
pub struct MetadataResolver {
    source: Arc<dyn MetadataSource>,
}

impl MetadataResolver {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Resolve profiles for the given creator ids.
    ///
    /// Ids are deduplicated first. An empty id set returns an empty index
    /// without contacting the source. When the set exceeds the source's
    /// per-request ceiling it is split into chunks fetched concurrently; all
    /// chunks must succeed before anything is returned.
    pub async fn resolve<'a, I>(&self, ids: I, token: &str) -> EngineResult<CreatorIndex>
    where
        I: IntoIterator<Item = &'a CreatorId>,
    {
        let unique: BTreeSet<&CreatorId> = ids
            .into_iter()
            .filter(|id| !id.as_str().trim().is_empty())
            .collect();

        if unique.is_empty() {
            debug!("No creator ids to resolve, skipping metadata lookup");
            return Ok(CreatorIndex::new());
        }

        let unique: Vec<CreatorId> = unique.into_iter().cloned().collect();
        let chunk_size = self.source.max_ids_per_request().max(1);
        let requests = unique
            .chunks(chunk_size)
            .map(|chunk| self.source.fetch_creators(chunk, token));

        let batches = try_join_all(requests)
            .await
            .map_err(EngineError::MetadataFetch)?;

        let mut index = CreatorIndex::with_capacity(unique.len());
        for creator in batches.into_iter().flatten() {
            if unique.binary_search(&creator.id).is_ok() {
                index.insert(creator.id.clone(), creator);
            }
        }

        info!(
            source = self.source.name(),
            requested = unique.len(),
            resolved = index.len(),
            "Resolved creator metadata"
        );

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every request and answers with a verified profile per id,
    /// except ids listed in `unknown`.
    struct RecordingSource {
        calls: Mutex<Vec<Vec<CreatorId>>>,
        unknown: Vec<CreatorId>,
        ceiling: usize,
        fail: bool,
    }

    impl RecordingSource {
        fn new(ceiling: usize) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                unknown: Vec::new(),
                ceiling,
                fail: false,
            }
        }

        fn calls(&self) -> Vec<Vec<CreatorId>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MetadataSource for RecordingSource {
        fn max_ids_per_request(&self) -> usize {
            self.ceiling
        }

        async fn fetch_creators(
            &self,
            ids: &[CreatorId],
            _token: &str,
        ) -> Result<Vec<Creator>, TransportError> {
            self.calls.lock().unwrap().push(ids.to_vec());
            if self.fail {
                return Err(TransportError::new("RecordingSource", "401 unauthorized"));
            }
            Ok(ids
                .iter()
                .filter(|id| !self.unknown.contains(id))
                .map(|id| Creator::new(id.clone()).verified(true))
                .collect())
        }
    }

    fn ids(raw: &[&str]) -> Vec<CreatorId> {
        raw.iter().map(|s| CreatorId::from(*s)).collect()
    }

    #[tokio::test]
    async fn test_empty_ids_skip_lookup() {
        let source = Arc::new(RecordingSource::new(100));
        let resolver = MetadataResolver::new(source.clone());

        let index = resolver.resolve(Vec::<&CreatorId>::new(), "t").await.unwrap();
        assert!(index.is_empty());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_deduplicates_before_querying() {
        let source = Arc::new(RecordingSource::new(100));
        let resolver = MetadataResolver::new(source.clone());
        let requested = ids(&["b", "a", "b", "a", "c"]);

        let index = resolver.resolve(&requested, "t").await.unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(source.calls(), vec![ids(&["a", "b", "c"])]);
    }

    #[tokio::test]
    async fn test_chunks_over_ceiling() {
        let source = Arc::new(RecordingSource::new(2));
        let resolver = MetadataResolver::new(source.clone());
        let requested = ids(&["a", "b", "c", "d", "e"]);

        let index = resolver.resolve(&requested, "t").await.unwrap();
        assert_eq!(index.len(), 5);

        let calls = source.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.len() <= 2));
    }

    #[tokio::test]
    async fn test_unknown_creator_is_absent() {
        let mut source = RecordingSource::new(100);
        source.unknown = ids(&["ghost"]);
        let resolver = MetadataResolver::new(Arc::new(source));
        let requested = ids(&["ghost", "real"]);

        let index = resolver.resolve(&requested, "t").await.unwrap();
        assert!(index.contains_key(&CreatorId::from("real")));
        assert!(!index.contains_key(&CreatorId::from("ghost")));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let mut source = RecordingSource::new(100);
        source.fail = true;
        let resolver = MetadataResolver::new(Arc::new(source));
        let requested = ids(&["a"]);

        let err = resolver.resolve(&requested, "t").await.unwrap_err();
        assert!(matches!(err, EngineError::MetadataFetch(_)));
    }
}
