// ============================================
// Item-Item Similarity Model Builder
// ============================================
//
// Ratings → dense user×item matrix (0.0 = unrated)
//         → item×user transpose
//         → pairwise cosine similarity between item rows
//
// Users and items are kept in ascending id order on every axis so that the
// same dataset always yields bit-identical matrices.

use ndarray::{Array2, ArrayView1, ArrayView2};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{ItemId, Rating, UserId};

/// Dense user×item rating table; unobserved cells hold `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserItemMatrix {
    users: Vec<UserId>,
    items: Vec<ItemId>,
    user_index: HashMap<UserId, usize>,
    item_index: HashMap<ItemId, usize>,
    values: Array2<f64>,
}

impl UserItemMatrix {
    /// Pivot ratings into a dense matrix. A repeated `(user, item)` pair keeps
    /// the last score.
    pub fn from_ratings(ratings: &[Rating]) -> Result<Self> {
        if ratings.is_empty() {
            return Err(AppError::DataUnavailable(
                "cannot build a rating matrix from zero ratings".to_string(),
            ));
        }

        let users: Vec<UserId> = ratings
            .iter()
            .map(|r| r.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let items: Vec<ItemId> = ratings
            .iter()
            .map(|r| r.item_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let user_index = index_of(&users);
        let item_index = index_of(&items);

        let mut values = Array2::<f64>::zeros((users.len(), items.len()));
        for rating in ratings {
            values[[user_index[&rating.user_id], item_index[&rating.item_id]]] = rating.score;
        }

        Ok(Self {
            users,
            items,
            user_index,
            item_index,
            values,
        })
    }

    /// Wrap an existing dense table. Ids must be unique and match the shape.
    pub fn from_dense(users: Vec<UserId>, items: Vec<ItemId>, values: Array2<f64>) -> Result<Self> {
        if values.dim() != (users.len(), items.len()) {
            return Err(AppError::ValidationError(format!(
                "rating matrix shape {:?} does not match {} users x {} items",
                values.dim(),
                users.len(),
                items.len()
            )));
        }
        let user_index = index_of(&users);
        let item_index = index_of(&items);
        if user_index.len() != users.len() || item_index.len() != items.len() {
            return Err(AppError::ValidationError(
                "rating matrix ids must be unique".to_string(),
            ));
        }

        Ok(Self {
            users,
            items,
            user_index,
            item_index,
            values,
        })
    }

    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.user_index.contains_key(&user_id)
    }

    /// Score for a cell; `0.0` when the user or item is unknown or unrated.
    pub fn rating(&self, user_id: UserId, item_id: ItemId) -> f64 {
        match (self.user_index.get(&user_id), self.item_index.get(&item_id)) {
            (Some(&u), Some(&i)) => self.values[[u, i]],
            _ => 0.0,
        }
    }

    /// The user's full rating row, in [`Self::items`] order.
    pub fn user_row(&self, user_id: UserId) -> Option<ArrayView1<'_, f64>> {
        self.user_index
            .get(&user_id)
            .map(|&u| self.values.row(u))
    }

    /// Items the user rated with a strictly positive score, ascending by id.
    pub fn rated_items(&self, user_id: UserId) -> Vec<(ItemId, f64)> {
        self.user_row(user_id)
            .map(|row| {
                self.items
                    .iter()
                    .zip(row.iter())
                    .filter(|&(_, &score)| score > 0.0)
                    .map(|(&item_id, &score)| (item_id, score))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Item×user view of the same data.
    pub fn transposed(&self) -> ArrayView2<'_, f64> {
        self.values.t()
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }
}

/// Square, symmetric item×item cosine similarity matrix keyed by item id.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSimilarityMatrix {
    items: Vec<ItemId>,
    item_index: HashMap<ItemId, usize>,
    values: Array2<f64>,
}

impl ItemSimilarityMatrix {
    /// Cosine similarity between every pair of item rows of the transposed
    /// rating matrix. Zero-norm rows are similar to nothing, themselves included.
    pub fn from_user_items(user_items: &UserItemMatrix) -> Self {
        // contiguous item×user copy so the Gram product runs on a standard layout
        let item_user = user_items.transposed().as_standard_layout().into_owned();
        let n = item_user.nrows();

        let norms: Vec<f64> = item_user
            .rows()
            .into_iter()
            .map(|row| row.dot(&row).sqrt())
            .collect();

        let mut values = item_user.dot(&item_user.t());

        for i in 0..n {
            for j in i..n {
                let sim = if i == j {
                    if norms[i] > 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    normalize(values[[i, j]], norms[i], norms[j])
                };
                // mirror the upper triangle so symmetry is exact
                values[[i, j]] = sim;
                values[[j, i]] = sim;
            }
        }

        debug!(items = n, users = item_user.ncols(), "Item similarity matrix computed");

        Self {
            items: user_items.items().to_vec(),
            item_index: index_of(user_items.items()),
            values,
        }
    }

    /// Wrap a precomputed similarity table. Must be square and match `items`.
    pub fn from_dense(items: Vec<ItemId>, values: Array2<f64>) -> Result<Self> {
        if values.dim() != (items.len(), items.len()) {
            return Err(AppError::ValidationError(format!(
                "similarity matrix shape {:?} does not match {} items",
                values.dim(),
                items.len()
            )));
        }
        let item_index = index_of(&items);
        if item_index.len() != items.len() {
            return Err(AppError::ValidationError(
                "similarity matrix ids must be unique".to_string(),
            ));
        }

        Ok(Self {
            items,
            item_index,
            values,
        })
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.item_index.contains_key(&item_id)
    }

    pub fn similarity(&self, a: ItemId, b: ItemId) -> Option<f64> {
        let i = *self.item_index.get(&a)?;
        let j = *self.item_index.get(&b)?;
        Some(self.values[[i, j]])
    }

    /// Similarities from `item_id` to every item, in [`Self::items`] order.
    pub fn row(&self, item_id: ItemId) -> Option<ArrayView1<'_, f64>> {
        self.item_index
            .get(&item_id)
            .map(|&i| self.values.row(i))
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }
}

/// Build both matrices from clean ratings.
pub fn build_similarity_model(ratings: &[Rating]) -> Result<(UserItemMatrix, ItemSimilarityMatrix)> {
    let user_items = UserItemMatrix::from_ratings(ratings)?;
    let similarity = ItemSimilarityMatrix::from_user_items(&user_items);
    Ok((user_items, similarity))
}

fn normalize(dot: f64, norm_a: f64, norm_b: f64) -> f64 {
    let denom = norm_a * norm_b;
    if denom == 0.0 {
        return 0.0;
    }

    let result = dot / denom;
    if !result.is_finite() {
        return 0.0;
    }
    result.clamp(-1.0, 1.0)
}

fn index_of(ids: &[i64]) -> HashMap<i64, usize> {
    ids.iter().enumerate().map(|(idx, &id)| (id, idx)).collect()
}
