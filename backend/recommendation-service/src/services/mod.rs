//! Recommendation service module
//!
//! Item-based collaborative filtering:
//! 1. `ingestion` turns rating/item records into a validated dataset
//! 2. `similarity` builds the user×item and item×item matrices
//! 3. `scorer` ranks unseen items for a user
//! 4. `model_cache` keeps one built model per dataset fingerprint

pub mod ingestion;
pub mod model_cache;
pub mod recommendation;
pub mod scorer;
pub mod similarity;

pub use ingestion::{CsvDatasetSource, Dataset, DatasetSource, StaticDatasetSource};
pub use model_cache::{ModelCache, ModelInfo, RecommendationModel};
pub use recommendation::{RecommendationService, ReloadOutcome};
pub use scorer::ItemScorer;
pub use similarity::{build_similarity_model, ItemSimilarityMatrix, UserItemMatrix};
