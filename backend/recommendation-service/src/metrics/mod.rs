/// Prometheus metrics for model builds and recommendation requests
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Encoder, Histogram,
    IntCounterVec, IntGauge, TextEncoder,
};

use crate::models::RecommendationStatus;

static RECOMMENDATION_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "recommendation_requests_total",
        "Total number of recommendation requests by outcome",
        &["status"]
    )
    .expect("Failed to register recommendation requests metric")
});

static MODEL_BUILD_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "recommendation_model_build_seconds",
        "Time spent building the item similarity model",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register model build duration metric")
});

static MODEL_ITEMS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "recommendation_model_items",
        "Number of items in the current similarity model"
    )
    .expect("Failed to register model items metric")
});

static MODEL_USERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "recommendation_model_users",
        "Number of users in the current rating matrix"
    )
    .expect("Failed to register model users metric")
});

static MALFORMED_RECORDS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "recommendation_malformed_records_total",
        "Total number of rejected input records",
        &["kind"]
    )
    .expect("Failed to register malformed records metric")
});

pub fn record_request(status: RecommendationStatus) {
    RECOMMENDATION_REQUESTS
        .with_label_values(&[status.as_str()])
        .inc();
}

pub fn record_model_build(duration_secs: f64, users: usize, items: usize) {
    MODEL_BUILD_DURATION.observe(duration_secs);
    MODEL_USERS.set(users as i64);
    MODEL_ITEMS.set(items as i64);
}

pub fn record_malformed(kind: &str, count: u64) {
    if count > 0 {
        MALFORMED_RECORDS.with_label_values(&[kind]).inc_by(count);
    }
}

/// Render every registered metric in the Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
