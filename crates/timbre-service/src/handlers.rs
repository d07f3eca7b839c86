use std::sync::Arc;

use timbre_analysis::{analyze_batch, apply_allowlist, BatchProgress, DescriptorExtractor};
use timbre_core::{build_vector, decode_vector, AnalysisDepth};
use timbre_search::{IndexResult, IndexStatus, SimilarityIndex};
use tokio::sync::mpsc;

use crate::error::{ServiceError, ServiceResult};
use crate::types::{
    AnalyzeBatchRequest, AnalyzeTrackRequest, AnalyzeTrackResponse, FindSimilarRequest,
    FindSimilarResponse, IndexItemsRequest, IndexItemsResponse,
};

/// Shared handler state: one extractor and one index for every request.
#[derive(Clone)]
pub struct TimbreService {
    extractor: Arc<dyn DescriptorExtractor>,
    index: Arc<SimilarityIndex>,
    default_depth: AnalysisDepth,
}

impl std::fmt::Debug for TimbreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimbreService")
            .field("index", &self.index.root())
            .field("default_depth", &self.default_depth)
            .finish_non_exhaustive()
    }
}

impl TimbreService {
    pub fn new(extractor: Arc<dyn DescriptorExtractor>, index: Arc<SimilarityIndex>) -> Self {
        Self {
            extractor,
            index,
            default_depth: AnalysisDepth::default(),
        }
    }

    #[must_use]
    pub fn with_default_depth(mut self, depth: AnalysisDepth) -> Self {
        self.default_depth = depth;
        self
    }

    pub fn index(&self) -> &Arc<SimilarityIndex> {
        &self.index
    }

    /// Extract descriptors for one file and build its feature vector.
    pub async fn analyze_track(
        &self,
        request: AnalyzeTrackRequest,
    ) -> ServiceResult<AnalyzeTrackResponse> {
        let depth = request.depth.unwrap_or(self.default_depth);
        let extractor = Arc::clone(&self.extractor);
        let path = request.path.clone();

        let descriptors = run_blocking("AnalyzeTrack", move || extractor.extract(&path, depth))
            .await?
            .inspect_err(|e| {
                log::warn!("AnalyzeTrack failed for {}: {}", request.path.display(), e);
            })?;

        let descriptors = apply_allowlist(descriptors, &request.descriptors);
        let vector = build_vector(&descriptors);

        log::info!(
            "Analysed {} at {} depth ({} descriptors)",
            request.path.display(),
            depth,
            descriptors.len()
        );
        Ok(AnalyzeTrackResponse {
            descriptors: descriptors.to_string_map(),
            feature_vector: vector.to_bytes(),
        })
    }

    /// Analyze many files, streaming one progress record per file.
    pub fn analyze_batch(&self, request: AnalyzeBatchRequest) -> mpsc::Receiver<BatchProgress> {
        analyze_batch(
            Arc::clone(&self.extractor),
            request.paths,
            request.depth.unwrap_or(self.default_depth),
            request.descriptors,
        )
    }

    /// Replace the index with the given items.
    pub async fn build_index(&self, request: IndexItemsRequest) -> IndexItemsResponse {
        self.write_items("BuildIndex", request, |index, vectors, ids| {
            index.build(vectors, ids)
        })
        .await
    }

    /// Append items to the index, building it if there is none.
    pub async fn add_items(&self, request: IndexItemsRequest) -> IndexItemsResponse {
        self.write_items("AddItems", request, |index, vectors, ids| {
            index.add_items(vectors, ids)
        })
        .await
    }

    /// Nearest items to a serialized query vector.
    pub async fn find_similar(
        &self,
        request: FindSimilarRequest,
    ) -> ServiceResult<FindSimilarResponse> {
        let query = decode_vector(&request.query)?;
        let index = Arc::clone(&self.index);
        let k = request.k;

        let matches = run_blocking("FindSimilar", move || index.search(&query, k))
            .await?
            .inspect_err(|e| log::warn!("FindSimilar failed (k={}): {}", k, e))?;
        Ok(FindSimilarResponse { matches })
    }

    pub fn index_status(&self) -> IndexStatus {
        self.index.status()
    }

    async fn write_items<F>(
        &self,
        operation: &'static str,
        request: IndexItemsRequest,
        apply: F,
    ) -> IndexItemsResponse
    where
        F: FnOnce(&SimilarityIndex, &[Vec<f32>], &[String]) -> IndexResult<usize> + Send + 'static,
    {
        let mut vectors = Vec::with_capacity(request.items.len());
        let mut ids = Vec::with_capacity(request.items.len());
        for item in request.items {
            match decode_vector(&item.vector) {
                Ok(vector) => vectors.push(vector),
                Err(e) => {
                    log::warn!("{} rejected item '{}': {}", operation, item.id, e);
                    return IndexItemsResponse::failed(ServiceError::from(e));
                }
            }
            ids.push(item.id);
        }

        let index = Arc::clone(&self.index);
        let count = vectors.len();
        let result = run_blocking(operation, move || {
            apply(index.as_ref(), vectors.as_slice(), ids.as_slice())
        })
        .await;

        match result {
            Ok(Ok(item_count)) => IndexItemsResponse::ok(item_count),
            Ok(Err(e)) => {
                log::error!("{} failed for {} items: {}", operation, count, e);
                IndexItemsResponse::failed(ServiceError::from(e))
            }
            Err(e) => IndexItemsResponse::failed(e),
        }
    }
}

/// Run `task` on the blocking pool, turning a panic into an internal error.
async fn run_blocking<T, F>(operation: &'static str, task: F) -> ServiceResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|e| {
        log::error!("{} task did not complete: {}", operation, e);
        ServiceError::Internal(format!("{operation} join error: {e}"))
    })
}
