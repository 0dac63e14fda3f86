use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::models::{ItemCatalog, ItemId, Recommendation, UserId};
use crate::services::similarity::{ItemSimilarityMatrix, UserItemMatrix};

/// Item-based collaborative filtering scorer
///
/// Algorithm:
/// 1. Collect the items the user rated with a positive score
/// 2. Every rated item votes for each unrated catalog item in its similarity row
/// 3. Vote weight = similarity × the user's rating of the voting item
/// 4. Rank by accumulated score (descending), ties by item id (ascending)
///
/// Formula: score[c] = Σ_m similarity[m, c] × rating[m]
pub struct ItemScorer<'a> {
    user_items: &'a UserItemMatrix,
    similarity: &'a ItemSimilarityMatrix,
    catalog: &'a ItemCatalog,
    min_similarity: f64,
}

impl<'a> ItemScorer<'a> {
    pub fn new(
        user_items: &'a UserItemMatrix,
        similarity: &'a ItemSimilarityMatrix,
        catalog: &'a ItemCatalog,
    ) -> Self {
        Self {
            user_items,
            similarity,
            catalog,
            min_similarity: 0.0,
        }
    }

    /// Ignore neighbours whose similarity falls below `threshold`.
    pub fn with_min_similarity(mut self, threshold: f64) -> Self {
        self.min_similarity = threshold;
        self
    }

    /// Top `limit` unrated catalog items for `user_id`, best first.
    ///
    /// Unknown users and users without qualifying neighbours get an empty list.
    pub fn recommend(&self, user_id: UserId, limit: usize) -> Vec<Recommendation> {
        if limit == 0 || !self.user_items.contains_user(user_id) {
            return Vec::new();
        }

        let rated = self.user_items.rated_items(user_id);
        if rated.is_empty() {
            return Vec::new();
        }

        let mut ranked = self.score_candidates(user_id, &rated);
        ranked.sort_by(rank_order);
        ranked.truncate(limit);

        let recommendations: Vec<Recommendation> = ranked
            .into_iter()
            .filter_map(|(item_id, score)| match self.catalog.title(item_id) {
                Some(title) => Some(Recommendation {
                    item_id,
                    title: title.to_string(),
                    score,
                }),
                None => {
                    warn!(item_id, "Ranked item missing from catalog, dropping");
                    None
                }
            })
            .collect();

        debug!(
            user_id,
            rated_items = rated.len(),
            returned = recommendations.len(),
            "Item-based recommendations generated"
        );

        recommendations
    }

    /// Titles only, in rank order.
    pub fn recommend_titles(&self, user_id: UserId, limit: usize) -> Vec<String> {
        self.recommend(user_id, limit)
            .into_iter()
            .map(|rec| rec.title)
            .collect()
    }

    /// Accumulated scores for every qualifying candidate, unsorted.
    fn score_candidates(&self, user_id: UserId, rated: &[(ItemId, f64)]) -> Vec<(ItemId, f64)> {
        let columns = self.similarity.items();

        // candidate mask over similarity columns: unrated and present in the catalog
        let eligible: Vec<bool> = columns
            .iter()
            .map(|&item_id| {
                self.user_items.rating(user_id, item_id) <= 0.0 && self.catalog.contains(item_id)
            })
            .collect();

        let mut scores: Vec<Option<f64>> = vec![None; columns.len()];

        for &(rated_item, rating) in rated {
            let Some(row) = self.similarity.row(rated_item) else {
                continue;
            };

            for (idx, &sim) in row.iter().enumerate() {
                if !eligible[idx] || sim < self.min_similarity {
                    continue;
                }
                let slot = scores[idx].get_or_insert(0.0);
                *slot += sim * rating;
            }
        }

        columns
            .iter()
            .zip(scores)
            .filter_map(|(&item_id, score)| score.map(|s| (item_id, s)))
            .collect()
    }
}

fn rank_order(a: &(ItemId, f64), b: &(ItemId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;
    use crate::services::similarity::build_similarity_model;
    use crate::models::Rating;
    use ndarray::array;

    /// Users 1..=3 over items 1..=4; user 1 rated item 1 = 5.0 and item 2 = 3.0.
    fn hand_built() -> (UserItemMatrix, ItemSimilarityMatrix, ItemCatalog) {
        let user_items = UserItemMatrix::from_dense(
            vec![1, 2, 3],
            vec![1, 2, 3, 4],
            array![
                [5.0, 3.0, 0.0, 0.0],
                [4.0, 0.0, 4.0, 1.0],
                [0.0, 2.0, 0.0, 5.0],
            ],
        )
        .unwrap();
        let similarity = ItemSimilarityMatrix::from_dense(
            vec![1, 2, 3, 4],
            array![
                [1.0, 0.3, 0.8, 0.1],
                [0.3, 1.0, 0.0, 0.6],
                [0.8, 0.0, 1.0, 0.2],
                [0.1, 0.6, 0.2, 1.0],
            ],
        )
        .unwrap();
        let catalog = ItemCatalog::new((1..=4).map(|id| Item::new(id, format!("Item {id}"))));
        (user_items, similarity, catalog)
    }

    #[test]
    fn test_weighted_vote_from_rated_item() {
        let (users, sim, catalog) = hand_built();
        let recs = ItemScorer::new(&users, &sim, &catalog).recommend(1, 2);

        // item 3: 0.8 * 5.0 from item 1, nothing from item 2
        assert_eq!(recs[0].item_id, 3);
        assert!((recs[0].score - 4.0).abs() < 1e-12);
        // item 4: 0.1 * 5.0 + 0.6 * 3.0
        assert_eq!(recs[1].item_id, 4);
        assert!((recs[1].score - 2.3).abs() < 1e-12);
        assert_eq!(recs[1].title, "Item 4");
    }

    #[test]
    fn test_never_returns_rated_items() {
        let (users, sim, catalog) = hand_built();
        let scorer = ItemScorer::new(&users, &sim, &catalog);
        for user in [1, 2, 3] {
            for rec in scorer.recommend(user, 10) {
                assert_eq!(users.rating(user, rec.item_id), 0.0);
            }
        }
    }

    #[test]
    fn test_unknown_user_is_empty() {
        let (users, sim, catalog) = hand_built();
        let scorer = ItemScorer::new(&users, &sim, &catalog);
        for n in [1, 5, 100] {
            assert!(scorer.recommend(42, n).is_empty());
        }
    }

    #[test]
    fn test_user_without_positive_ratings_is_empty() {
        let users = UserItemMatrix::from_dense(vec![1, 2], vec![1, 2], array![[0.0, 0.0], [3.0, 4.0]]).unwrap();
        let sim = ItemSimilarityMatrix::from_user_items(&users);
        let catalog = ItemCatalog::new(vec![Item::new(1, "a"), Item::new(2, "b")]);

        assert!(ItemScorer::new(&users, &sim, &catalog).recommend(1, 10).is_empty());
    }

    #[test]
    fn test_excludes_items_missing_from_catalog() {
        let (users, sim, _) = hand_built();
        let catalog = ItemCatalog::new(vec![Item::new(1, "a"), Item::new(2, "b"), Item::new(4, "d")]);
        let recs = ItemScorer::new(&users, &sim, &catalog).recommend(1, 10);

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].item_id, 4);
    }

    #[test]
    fn test_limit_bounds_and_short_lists() {
        let (users, sim, catalog) = hand_built();
        let scorer = ItemScorer::new(&users, &sim, &catalog);

        assert_eq!(scorer.recommend(1, 1).len(), 1);
        // only two unrated items exist for user 1
        assert_eq!(scorer.recommend(1, 10).len(), 2);
        assert!(scorer.recommend(1, 0).is_empty());
    }

    #[test]
    fn test_ties_break_by_item_id() {
        let users = UserItemMatrix::from_dense(
            vec![1],
            vec![1, 2, 3, 4],
            array![[2.0, 0.0, 0.0, 0.0]],
        )
        .unwrap();
        let sim = ItemSimilarityMatrix::from_dense(
            vec![1, 2, 3, 4],
            array![
                [1.0, 0.5, 0.5, 0.5],
                [0.5, 1.0, 0.0, 0.0],
                [0.5, 0.0, 1.0, 0.0],
                [0.5, 0.0, 0.0, 1.0],
            ],
        )
        .unwrap();
        let catalog = ItemCatalog::new((1..=4).map(|id| Item::new(id, id.to_string())));
        let scorer = ItemScorer::new(&users, &sim, &catalog);

        let ids: Vec<ItemId> = scorer.recommend(1, 3).iter().map(|r| r.item_id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(scorer.recommend(1, 3), scorer.recommend(1, 3));
    }

    #[test]
    fn test_min_similarity_filters_weak_neighbours() {
        let (users, sim, catalog) = hand_built();
        let recs = ItemScorer::new(&users, &sim, &catalog)
            .with_min_similarity(0.5)
            .recommend(1, 10);

        // item 4 keeps only the 0.6 vote from item 2
        assert_eq!(recs.len(), 2);
        assert!((recs[0].score - 4.0).abs() < 1e-12);
        assert!((recs[1].score - 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_zero_similarity_neighbours_still_qualify() {
        let (users, sim, catalog) = hand_built();
        // user 3 rated items 2 and 4; item 3 gets 0.0 * 2.0 + 0.2 * 5.0
        let recs = ItemScorer::new(&users, &sim, &catalog).recommend(3, 10);
        let ids: Vec<ItemId> = recs.iter().map(|r| r.item_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_recommend_titles_keeps_rank_order() {
        let (users, sim, catalog) = hand_built();
        let titles = ItemScorer::new(&users, &sim, &catalog).recommend_titles(1, 5);
        assert_eq!(titles, vec!["Item 3".to_string(), "Item 4".to_string()]);
    }

    #[test]
    fn test_built_model_end_to_end() {
        let ratings = vec![
            Rating::new(1, 1, 5.0),
            Rating::new(1, 2, 3.0),
            Rating::new(2, 1, 4.0),
            Rating::new(2, 3, 4.0),
            Rating::new(3, 2, 2.0),
            Rating::new(3, 4, 5.0),
        ];
        let (users, sim) = build_similarity_model(&ratings).unwrap();
        let catalog = ItemCatalog::new((1..=4).map(|id| Item::new(id, format!("Item {id}"))));
        let recs = ItemScorer::new(&users, &sim, &catalog).recommend(1, 10);

        let ids: Vec<ItemId> = recs.iter().map(|r| r.item_id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&3) && ids.contains(&4));
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
