use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type UserId = i64;
pub type ItemId = i64;

/// A single explicit rating, e.g. MovieLens 0.5..=5.0 in half steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub score: f64,
}

impl Rating {
    pub fn new(user_id: UserId, item_id: ItemId, score: f64) -> Self {
        Self {
            user_id,
            item_id,
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: ItemId,
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl Item {
    pub fn new(item_id: ItemId, title: impl Into<String>) -> Self {
        Self {
            item_id,
            title: title.into(),
            genres: Vec::new(),
        }
    }

    pub fn with_genres(mut self, genres: Vec<String>) -> Self {
        self.genres = genres;
        self
    }
}

/// The universe of recommendable items, ordered by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemCatalog {
    items: BTreeMap<ItemId, Item>,
}

impl ItemCatalog {
    /// Build a catalog; a repeated id keeps the last record.
    pub fn new(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.item_id, item)).collect(),
        }
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.items.contains_key(&item_id)
    }

    pub fn get(&self, item_id: ItemId) -> Option<&Item> {
        self.items.get(&item_id)
    }

    pub fn title(&self, item_id: ItemId) -> Option<&str> {
        self.items.get(&item_id).map(|item| item.title.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }
}

/// A ranked recommendation with its accumulated item-CF score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item_id: ItemId,
    pub title: String,
    pub score: f64,
}

/// Why a recommendation request produced what it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Ok,
    UnknownUser,
    InsufficientData,
}

impl RecommendationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::Ok => "ok",
            RecommendationStatus::UnknownUser => "unknown_user",
            RecommendationStatus::InsufficientData => "insufficient_data",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationResult {
    pub status: RecommendationStatus,
    pub recommendations: Vec<Recommendation>,
}

/// Titles a user has rated, truncated for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedItems {
    pub titles: Vec<String>,
    pub total: usize,
    pub remaining: usize,
}
