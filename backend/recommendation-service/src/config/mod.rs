use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub data: DataConfig,
    pub recommendation: RecommendationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    pub ratings_file: String,
    pub items_file: String,
}

impl DataConfig {
    pub fn ratings_path(&self) -> PathBuf {
        self.data_dir.join(&self.ratings_file)
    }

    pub fn items_path(&self) -> PathBuf {
        self.data_dir.join(&self.items_file)
    }
}

/// Request limits and scoring knobs for the recommendation endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub default_limit: usize,
    pub min_limit: usize,
    pub max_limit: usize,
    /// How many rated titles to list before summarising the rest
    pub rated_items_display_limit: usize,
    /// Neighbours below this similarity do not contribute to a candidate's score
    pub min_similarity: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            min_limit: default_min_limit(),
            max_limit: default_max_limit(),
            rated_items_display_limit: default_rated_items_display_limit(),
            min_similarity: 0.0,
        }
    }
}

impl RecommendationConfig {
    /// Clamp a requested limit into the configured range.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(self.min_limit, self.max_limit)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_limit == 0 {
            return Err(AppError::Configuration(
                "RECOMMENDATION_MIN_LIMIT must be at least 1".to_string(),
            ));
        }
        if self.min_limit > self.default_limit || self.default_limit > self.max_limit {
            return Err(AppError::Configuration(format!(
                "recommendation limits must satisfy min <= default <= max (got {} <= {} <= {})",
                self.min_limit, self.default_limit, self.max_limit
            )));
        }
        if self.rated_items_display_limit == 0 {
            return Err(AppError::Configuration(
                "RATED_ITEMS_DISPLAY_LIMIT must be at least 1".to_string(),
            ));
        }
        if !self.min_similarity.is_finite() || !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(AppError::Configuration(format!(
                "MIN_SIMILARITY must be within [0, 1], got {}",
                self.min_similarity
            )));
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: parse_var("APP_PORT", 8000)?,
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            data: DataConfig {
                data_dir: env::var("DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./data/ml-latest-small")),
                ratings_file: env::var("RATINGS_FILE")
                    .unwrap_or_else(|_| "ratings.csv".to_string()),
                items_file: env::var("ITEMS_FILE").unwrap_or_else(|_| "movies.csv".to_string()),
            },
            recommendation: RecommendationConfig {
                default_limit: parse_var("RECOMMENDATION_DEFAULT_LIMIT", default_limit())?,
                min_limit: parse_var("RECOMMENDATION_MIN_LIMIT", default_min_limit())?,
                max_limit: parse_var("RECOMMENDATION_MAX_LIMIT", default_max_limit())?,
                rated_items_display_limit: parse_var(
                    "RATED_ITEMS_DISPLAY_LIMIT",
                    default_rated_items_display_limit(),
                )?,
                min_similarity: parse_var("MIN_SIMILARITY", 0.0)?,
            },
        };

        config.recommendation.validate()?;
        Ok(config)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Configuration(format!("{name} is invalid ({raw}): {e}"))),
        Err(_) => Ok(default),
    }
}

fn default_limit() -> usize {
    10
}

fn default_min_limit() -> usize {
    5
}

fn default_max_limit() -> usize {
    20
}

fn default_rated_items_display_limit() -> usize {
    15
}
