use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RecommendationConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{RatedItems, RecommendationResult, RecommendationStatus, UserId};
use crate::services::ingestion::DatasetSource;
use crate::services::model_cache::{ModelCache, ModelInfo, RecommendationModel};

/// Outcome of re-reading the dataset source
#[derive(Debug, Clone, Serialize)]
pub struct ReloadOutcome {
    pub rebuilt: bool,
    pub fingerprint: String,
}

/// Owns the dataset source and the cached model; every query reads the
/// current model through an `Arc` snapshot.
pub struct RecommendationService {
    source: Box<dyn DatasetSource>,
    cache: ModelCache,
    config: RecommendationConfig,
}

impl RecommendationService {
    /// Load the dataset and build the model eagerly.
    ///
    /// `DataUnavailable` here is fatal: the caller must not serve without a model.
    pub fn initialize(source: Box<dyn DatasetSource>, config: RecommendationConfig) -> Result<Self> {
        info!(source = %source.describe(), "Loading recommendation dataset");

        let dataset = source.load()?;
        let cache = ModelCache::new();
        cache.get_or_build(&dataset)?;

        Ok(Self {
            source,
            cache,
            config,
        })
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    pub fn model(&self) -> Result<Arc<RecommendationModel>> {
        self.cache.current()?.ok_or_else(|| {
            AppError::DataUnavailable("recommendation model has not been built".to_string())
        })
    }

    /// Rank up to `limit` unseen items for `user_id`.
    pub fn recommend(&self, user_id: UserId, limit: usize) -> Result<RecommendationResult> {
        let model = self.model()?;

        let (status, recommendations) = if !model.user_items().contains_user(user_id) {
            (RecommendationStatus::UnknownUser, Vec::new())
        } else {
            let recommendations = model
                .scorer()
                .with_min_similarity(self.config.min_similarity)
                .recommend(user_id, limit);
            if recommendations.is_empty() {
                (RecommendationStatus::InsufficientData, recommendations)
            } else {
                (RecommendationStatus::Ok, recommendations)
            }
        };

        metrics::record_request(status);

        Ok(RecommendationResult {
            status,
            recommendations,
        })
    }

    /// Titles the user has rated, ascending by item id, first `display_limit` shown.
    pub fn rated_items(&self, user_id: UserId, display_limit: usize) -> Result<RatedItems> {
        let model = self.model()?;
        let titles: Vec<String> = model
            .user_items()
            .rated_items(user_id)
            .into_iter()
            .filter_map(|(item_id, _)| model.catalog().title(item_id).map(str::to_string))
            .collect();

        let total = titles.len();
        let shown: Vec<String> = titles.into_iter().take(display_limit).collect();
        let remaining = total - shown.len();

        Ok(RatedItems {
            titles: shown,
            total,
            remaining,
        })
    }

    /// All users present in the rating data, ascending.
    pub fn user_ids(&self) -> Result<Vec<UserId>> {
        Ok(self.model()?.user_items().users().to_vec())
    }

    pub fn model_info(&self) -> Result<ModelInfo> {
        Ok(self.model()?.info())
    }

    /// Re-read the source and rebuild when its contents changed.
    ///
    /// On failure the previously built model keeps serving.
    pub fn reload(&self) -> Result<ReloadOutcome> {
        let dataset = match self.source.load() {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!(error = %e, "Dataset reload failed, keeping current model");
                return Err(e);
            }
        };

        let (model, rebuilt) = self.cache.get_or_build(&dataset)?;
        info!(
            rebuilt,
            fingerprint = %model.fingerprint(),
            "Recommendation dataset reloaded"
        );

        Ok(ReloadOutcome {
            rebuilt,
            fingerprint: model.fingerprint().to_string(),
        })
    }
}
