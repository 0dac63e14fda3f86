use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::info;

use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::ItemCatalog;
use crate::services::ingestion::Dataset;
use crate::services::scorer::ItemScorer;
use crate::services::similarity::{build_similarity_model, ItemSimilarityMatrix, UserItemMatrix};

/// Immutable output of one model build: both matrices plus the catalog they
/// are scored against.
#[derive(Debug)]
pub struct RecommendationModel {
    user_items: UserItemMatrix,
    similarity: ItemSimilarityMatrix,
    catalog: ItemCatalog,
    fingerprint: String,
    built_at: DateTime<Utc>,
}

impl RecommendationModel {
    pub fn build(dataset: &Dataset) -> Result<Self> {
        let started = Instant::now();
        let (user_items, similarity) = build_similarity_model(dataset.ratings())?;
        let elapsed = started.elapsed();

        metrics::record_model_build(
            elapsed.as_secs_f64(),
            user_items.users().len(),
            similarity.len(),
        );

        info!(
            users = user_items.users().len(),
            items = similarity.len(),
            ratings = dataset.ratings().len(),
            catalog_items = dataset.catalog().len(),
            fingerprint = %dataset.fingerprint(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Item similarity model built"
        );

        Ok(Self {
            user_items,
            similarity,
            catalog: dataset.catalog().clone(),
            fingerprint: dataset.fingerprint().to_string(),
            built_at: Utc::now(),
        })
    }

    pub fn scorer(&self) -> ItemScorer<'_> {
        ItemScorer::new(&self.user_items, &self.similarity, &self.catalog)
    }

    pub fn user_items(&self) -> &UserItemMatrix {
        &self.user_items
    }

    pub fn similarity(&self) -> &ItemSimilarityMatrix {
        &self.similarity
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            users: self.user_items.users().len(),
            items: self.similarity.len(),
            catalog_items: self.catalog.len(),
            fingerprint: self.fingerprint.clone(),
            built_at: self.built_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub users: usize,
    pub items: usize,
    pub catalog_items: usize,
    pub fingerprint: String,
    pub built_at: DateTime<Utc>,
}

/// Build-once, read-many holder for the current model, keyed by dataset
/// fingerprint. Readers clone the `Arc` and never hold the lock while scoring.
#[derive(Debug, Default)]
pub struct ModelCache {
    current: RwLock<Option<Arc<RecommendationModel>>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current model, if one has been built.
    pub fn current(&self) -> Result<Option<Arc<RecommendationModel>>> {
        let guard = self
            .current
            .read()
            .map_err(|_| AppError::Internal("model cache lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    /// Return the cached model when it was built from the same dataset,
    /// otherwise build and swap in a new one.
    pub fn get_or_build(&self, dataset: &Dataset) -> Result<(Arc<RecommendationModel>, bool)> {
        if let Some(model) = self.current()? {
            if model.fingerprint() == dataset.fingerprint() {
                return Ok((model, false));
            }
        }

        let model = Arc::new(RecommendationModel::build(dataset)?);

        let mut guard = self
            .current
            .write()
            .map_err(|_| AppError::Internal("model cache lock poisoned".to_string()))?;
        *guard = Some(Arc::clone(&model));

        Ok((model, true))
    }

    pub fn invalidate(&self) -> Result<()> {
        let mut guard = self
            .current
            .write()
            .map_err(|_| AppError::Internal("model cache lock poisoned".to_string()))?;
        if guard.take().is_some() {
            info!("Recommendation model cache invalidated");
        }
        Ok(())
    }
}
