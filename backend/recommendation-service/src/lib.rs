pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

// Re-export recommendation service components
pub use services::{
    CsvDatasetSource, Dataset, DatasetSource, ItemScorer, ItemSimilarityMatrix, ModelCache,
    ModelInfo, RecommendationModel, RecommendationService, StaticDatasetSource, UserItemMatrix,
};
