//! Dataset ingestion
//!
//! Turns raw rating and item records into a validated [`Dataset`]. Records
//! that fail shape validation are logged, counted, and skipped; a load that
//! leaves no usable ratings is reported as `DataUnavailable`.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{Item, ItemCatalog, ItemId, Rating, UserId};

/// MovieLens marker for items without genre metadata
const NO_GENRES: &str = "(no genres listed)";

/// Anything able to produce a rating dataset for the model builder.
pub trait DatasetSource: Send + Sync {
    fn load(&self) -> Result<Dataset>;

    /// Human-readable origin, used in logs and model info.
    fn describe(&self) -> String;
}

/// Validated ratings plus catalog, with a content fingerprint.
///
/// Ratings are unique per `(user_id, item_id)` and sorted by that pair.
#[derive(Debug, Clone)]
pub struct Dataset {
    ratings: Vec<Rating>,
    catalog: ItemCatalog,
    fingerprint: String,
}

impl Dataset {
    /// Assemble a dataset. Duplicate `(user, item)` ratings keep the last one.
    pub fn new(ratings: Vec<Rating>, catalog: ItemCatalog) -> Result<Self> {
        if ratings.is_empty() {
            return Err(AppError::DataUnavailable(
                "no ratings available to build a model".to_string(),
            ));
        }

        let received = ratings.len();
        let unique: BTreeMap<(UserId, ItemId), f64> = ratings
            .into_iter()
            .map(|r| ((r.user_id, r.item_id), r.score))
            .collect();

        if unique.len() < received {
            warn!(
                duplicates = received - unique.len(),
                "Duplicate ratings found, keeping the last score per user and item"
            );
        }

        if catalog.is_empty() {
            warn!("Item catalog is empty, every recommendation will be filtered out");
        }

        let ratings: Vec<Rating> = unique
            .into_iter()
            .map(|((user_id, item_id), score)| Rating::new(user_id, item_id, score))
            .collect();
        let fingerprint = fingerprint(&ratings, &catalog);

        Ok(Self {
            ratings,
            catalog,
            fingerprint,
        })
    }

    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    /// Hex SHA-256 over the canonical ratings and catalog.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint(ratings: &[Rating], catalog: &ItemCatalog) -> String {
    let mut hasher = Sha256::new();
    hasher.update((ratings.len() as u64).to_le_bytes());
    for rating in ratings {
        hasher.update(rating.user_id.to_le_bytes());
        hasher.update(rating.item_id.to_le_bytes());
        hasher.update(rating.score.to_bits().to_le_bytes());
    }
    hasher.update((catalog.len() as u64).to_le_bytes());
    for item in catalog.iter() {
        hasher.update(item.item_id.to_le_bytes());
        hasher.update((item.title.len() as u64).to_le_bytes());
        hasher.update(item.title.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// In-memory records, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDatasetSource {
    ratings: Vec<Rating>,
    items: Vec<Item>,
}

impl StaticDatasetSource {
    pub fn new(ratings: Vec<Rating>, items: Vec<Item>) -> Self {
        Self { ratings, items }
    }
}

impl DatasetSource for StaticDatasetSource {
    fn load(&self) -> Result<Dataset> {
        let mut ratings = Vec::with_capacity(self.ratings.len());
        let mut rejected = 0u64;
        for (idx, rating) in self.ratings.iter().enumerate() {
            match validate_rating(*rating, idx as u64 + 1) {
                Ok(valid) => ratings.push(valid),
                Err(e) => {
                    warn!("Skipping rating: {}", e);
                    rejected += 1;
                }
            }
        }
        metrics::record_malformed("rating", rejected);

        Dataset::new(ratings, ItemCatalog::new(self.items.iter().cloned()))
    }

    fn describe(&self) -> String {
        format!(
            "in-memory ({} ratings, {} items)",
            self.ratings.len(),
            self.items.len()
        )
    }
}

/// MovieLens-style CSV files: `ratings.csv` and `movies.csv`.
#[derive(Debug, Clone)]
pub struct CsvDatasetSource {
    ratings_path: PathBuf,
    items_path: PathBuf,
}

impl CsvDatasetSource {
    pub fn new(ratings_path: impl Into<PathBuf>, items_path: impl Into<PathBuf>) -> Self {
        Self {
            ratings_path: ratings_path.into(),
            items_path: items_path.into(),
        }
    }

    pub fn ratings_path(&self) -> &Path {
        &self.ratings_path
    }

    pub fn items_path(&self) -> &Path {
        &self.items_path
    }
}

impl DatasetSource for CsvDatasetSource {
    fn load(&self) -> Result<Dataset> {
        let ratings = read_ratings(open(&self.ratings_path)?)?;
        let items = read_items(open(&self.items_path)?)?;

        info!(
            ratings = ratings.len(),
            items = items.len(),
            ratings_path = %self.ratings_path.display(),
            items_path = %self.items_path.display(),
            "Dataset files loaded"
        );

        Dataset::new(ratings, ItemCatalog::new(items))
    }

    fn describe(&self) -> String {
        format!(
            "csv ratings={} items={}",
            self.ratings_path.display(),
            self.items_path.display()
        )
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        AppError::DataUnavailable(format!("cannot open {}: {}", path.display(), e))
    })
}

#[derive(Debug, Deserialize)]
struct RatingRow {
    #[serde(rename = "userId", alias = "user_id")]
    user_id: Option<String>,
    #[serde(rename = "movieId", alias = "item_id", alias = "movie_id")]
    item_id: Option<String>,
    #[serde(rename = "rating", alias = "score")]
    score: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemRow {
    #[serde(rename = "movieId", alias = "item_id", alias = "movie_id")]
    item_id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    genres: Option<String>,
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Parse rating rows, skipping malformed ones. Zero valid rows is an error.
pub fn read_ratings<R: Read>(reader: R) -> Result<Vec<Rating>> {
    let mut rdr = csv_reader(reader);
    let mut ratings = Vec::new();
    let mut rejected = 0u64;

    for (idx, row) in rdr.deserialize::<RatingRow>().enumerate() {
        // header occupies line 1
        let line = idx as u64 + 2;
        let parsed = row
            .map_err(|e| AppError::malformed(line, e.to_string()))
            .and_then(|row| parse_rating(row, line));
        match parsed {
            Ok(rating) => ratings.push(rating),
            Err(e) => {
                warn!("Skipping rating record: {}", e);
                rejected += 1;
            }
        }
    }

    metrics::record_malformed("rating", rejected);

    if ratings.is_empty() {
        return Err(AppError::DataUnavailable(format!(
            "no valid ratings found ({} malformed records rejected)",
            rejected
        )));
    }

    if rejected > 0 {
        warn!(
            rejected,
            accepted = ratings.len(),
            "Some rating records were malformed"
        );
    }

    Ok(ratings)
}

/// Parse catalog rows, skipping malformed ones.
pub fn read_items<R: Read>(reader: R) -> Result<Vec<Item>> {
    let mut rdr = csv_reader(reader);
    let mut items = Vec::new();
    let mut rejected = 0u64;

    for (idx, row) in rdr.deserialize::<ItemRow>().enumerate() {
        let line = idx as u64 + 2;
        let parsed = row
            .map_err(|e| AppError::malformed(line, e.to_string()))
            .and_then(|row| parse_item(row, line));
        match parsed {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!("Skipping item record: {}", e);
                rejected += 1;
            }
        }
    }

    metrics::record_malformed("item", rejected);

    Ok(items)
}

fn required<'a>(value: &'a Option<String>, field: &str, line: u64) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::malformed(line, format!("missing {field}"))),
    }
}

fn parse_id(value: &Option<String>, field: &str, line: u64) -> Result<i64> {
    let raw = required(value, field, line)?;
    raw.parse()
        .map_err(|_| AppError::malformed(line, format!("{field} is not an integer: {raw}")))
}

fn parse_rating(row: RatingRow, line: u64) -> Result<Rating> {
    let user_id = parse_id(&row.user_id, "userId", line)?;
    let item_id = parse_id(&row.item_id, "movieId", line)?;
    let raw = required(&row.score, "rating", line)?;
    let score: f64 = raw
        .parse()
        .map_err(|_| AppError::malformed(line, format!("rating is not a number: {raw}")))?;

    validate_rating(Rating::new(user_id, item_id, score), line)
}

/// Scores must be finite and strictly positive; 0.0 is reserved for "unrated".
fn validate_rating(rating: Rating, line: u64) -> Result<Rating> {
    if !rating.score.is_finite() || rating.score <= 0.0 {
        return Err(AppError::malformed(
            line,
            format!("rating must be a positive number, got {}", rating.score),
        ));
    }
    Ok(rating)
}

fn parse_item(row: ItemRow, line: u64) -> Result<Item> {
    let item_id = parse_id(&row.item_id, "movieId", line)?;
    let title = required(&row.title, "title", line)?;
    let genres = row
        .genres
        .as_deref()
        .map(parse_genres)
        .unwrap_or_default();

    Ok(Item::new(item_id, title).with_genres(genres))
}

fn parse_genres(raw: &str) -> Vec<String> {
    if raw.is_empty() || raw == NO_GENRES {
        return Vec::new();
    }
    raw.split('|')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RATINGS_CSV: &str = "userId,movieId,rating,timestamp\n\
        1,1,4.0,964982703\n\
        1,3,4.0,964981247\n\
        2,1,5.0,964982224\n";

    const MOVIES_CSV: &str = "movieId,title,genres\n\
        1,Toy Story (1995),Adventure|Animation|Children|Comedy|Fantasy\n\
        3,\"Grumpier Old Men, The (1995)\",Comedy|Romance\n\
        7,Unknown Film (2001),(no genres listed)\n";

    #[test]
    fn test_read_ratings() {
        let ratings = read_ratings(RATINGS_CSV.as_bytes()).unwrap();
        assert_eq!(ratings.len(), 3);
        assert_eq!(ratings[1], Rating::new(1, 3, 4.0));
    }

    #[test]
    fn test_read_ratings_skips_malformed_rows() {
        let csv = "userId,movieId,rating\n\
            1,1,4.0\n\
            ,2,3.0\n\
            1,abc,3.0\n\
            2,2,\n\
            2,3,0\n\
            2,4,NaN\n\
            3,1,2.5\n";
        let ratings = read_ratings(csv.as_bytes()).unwrap();
        assert_eq!(ratings, vec![Rating::new(1, 1, 4.0), Rating::new(3, 1, 2.5)]);
    }

    #[test]
    fn test_read_ratings_all_malformed_is_unavailable() {
        let csv = "userId,movieId,rating\nx,y,z\n";
        let err = read_ratings(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }

    #[test]
    fn test_read_ratings_empty_is_unavailable() {
        let err = read_ratings("userId,movieId,rating\n".as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }

    #[test]
    fn test_read_ratings_snake_case_headers() {
        let csv = "user_id,item_id,score\n4,10,3.5\n";
        let ratings = read_ratings(csv.as_bytes()).unwrap();
        assert_eq!(ratings, vec![Rating::new(4, 10, 3.5)]);
    }

    #[test]
    fn test_read_items() {
        let items = read_items(MOVIES_CSV.as_bytes()).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].title, "Grumpier Old Men, The (1995)");
        assert_eq!(items[1].genres, vec!["Comedy", "Romance"]);
        assert!(items[2].genres.is_empty());
    }

    #[test]
    fn test_read_items_skips_missing_title() {
        let csv = "movieId,title\n1,\n2,Jumanji (1995)\n";
        let items = read_items(csv.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_id, 2);
    }

    #[test]
    fn test_dataset_dedupes_last_write_wins() {
        let dataset = Dataset::new(
            vec![
                Rating::new(2, 1, 3.0),
                Rating::new(1, 1, 2.0),
                Rating::new(2, 1, 4.5),
            ],
            ItemCatalog::default(),
        )
        .unwrap();

        assert_eq!(
            dataset.ratings(),
            &[Rating::new(1, 1, 2.0), Rating::new(2, 1, 4.5)]
        );
    }

    #[test]
    fn test_dataset_rejects_empty_ratings() {
        let err = Dataset::new(Vec::new(), ItemCatalog::default()).unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }

    #[test]
    fn test_fingerprint_ignores_input_order() {
        let catalog = ItemCatalog::new(vec![Item::new(1, "a"), Item::new(2, "b")]);
        let a = Dataset::new(
            vec![Rating::new(1, 1, 4.0), Rating::new(2, 2, 3.0)],
            catalog.clone(),
        )
        .unwrap();
        let b = Dataset::new(
            vec![Rating::new(2, 2, 3.0), Rating::new(1, 1, 4.0)],
            catalog.clone(),
        )
        .unwrap();
        let c = Dataset::new(
            vec![Rating::new(2, 2, 3.5), Rating::new(1, 1, 4.0)],
            catalog,
        )
        .unwrap();

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_static_source_filters_invalid_scores() {
        let source = StaticDatasetSource::new(
            vec![Rating::new(1, 1, 4.0), Rating::new(1, 2, -1.0)],
            vec![Item::new(1, "a")],
        );
        let dataset = source.load().unwrap();
        assert_eq!(dataset.ratings().len(), 1);
    }

    #[test]
    fn test_csv_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvDatasetSource::new(dir.path().join("ratings.csv"), dir.path().join("movies.csv"));
        let err = source.load().unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }

    #[test]
    fn test_csv_source_loads_files() {
        let dir = tempfile::tempdir().unwrap();
        let ratings_path = dir.path().join("ratings.csv");
        let items_path = dir.path().join("movies.csv");
        File::create(&ratings_path)
            .unwrap()
            .write_all(RATINGS_CSV.as_bytes())
            .unwrap();
        File::create(&items_path)
            .unwrap()
            .write_all(MOVIES_CSV.as_bytes())
            .unwrap();

        let dataset = CsvDatasetSource::new(&ratings_path, &items_path)
            .load()
            .unwrap();
        assert_eq!(dataset.ratings().len(), 3);
        assert_eq!(dataset.catalog().len(), 3);
        assert_eq!(dataset.catalog().title(7), Some("Unknown Film (2001)"));
    }
}
