//! Integration tests for the `/api/v1/models` endpoints.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, body_text, dataset, get, recent_hourly, regular, send, upload, WEEK};
use sources_db::models::source::SourcePrediction;
use sqlx::SqlitePool;

const T0: i64 = 1_600_000_000;

async fn create(app: axum::Router, filename: &str, csv: &str) -> axum::http::Response<axum::body::Body> {
    send(
        app,
        upload(Method::POST, "/api/v1/models/create", "dataset", filename, csv),
    )
    .await
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn create_stores_model_and_upload(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, dir.path());

    let response = create(app, "billing.csv", &dataset("billing", regular(T0, WEEK, 30))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Model created for billing.csv");
    assert!(dir.path().join("billing_serialized_model.json").is_file());
    assert!(dir.path().join("datasets/billing.csv").is_file());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_without_dataset_field_is_400(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, dir.path());

    let response = send(
        app,
        upload(Method::POST, "/api/v1/models/create", "file", "billing.csv", "x"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_with_missing_columns_is_400(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, dir.path());

    let response = create(app, "billing.csv", "FILE_NAME,LogicFile\na,b\n").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().contains("START_TIME_epoc"));
    assert!(!dir.path().join("billing_serialized_model.json").exists());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_tolerates_blank_in_progress_epoch(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, dir.path());
    let mut csv = dataset("billing", regular(T0, WEEK, 30));
    csv.push_str("late.dat,billing,t,,Processing,0\n");

    let response = create(app, "billing.csv", &csv).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_with_blank_completed_epoch_is_400(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, dir.path());
    let mut csv = dataset("billing", regular(T0, WEEK, 30));
    csv.push_str("gap.dat,billing,t,,Done,0\n");

    let response = create(app, "billing.csv", &csv).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().contains("gap.dat"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_with_unusable_series_is_422(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, dir.path());

    let response = create(app, "frozen.csv", &dataset("frozen", vec![T0; 10])).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "MODEL_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_with_unsafe_filename_is_400(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, dir.path());

    let response = create(app, ".hidden.csv", &dataset("x", regular(T0, WEEK, 10))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Predict
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn predict_unknown_model_is_404(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, dir.path());

    let response = get(app, "/api/v1/models/ghost/predict").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn predict_is_idempotent_and_recorded(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool.clone(), dir.path());

    let created = create(app.clone(), "billing.csv", &dataset("billing", regular(T0, WEEK, 30))).await;
    assert_eq!(created.status(), StatusCode::OK);

    let first = get(app.clone(), "/api/v1/models/billing/predict").await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    let second = body_json(get(app, "/api/v1/models/billing/predict").await).await;
    assert_eq!(first, second);

    let fields: Vec<&String> = first.as_object().unwrap().keys().collect();
    assert_eq!(fields, vec!["lower_bound", "predicted", "upper_bound"]);

    let rows: Vec<SourcePrediction> =
        sqlx::query_as("SELECT name, lower_bound, predicted, upper_bound FROM Sources")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "billing");
    assert_eq!(
        sources_core::types::format_timestamp(&rows[0].predicted),
        first["predicted"].as_str().unwrap()
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn predict_survives_registry_failure(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool.clone(), dir.path());
    create(app.clone(), "billing.csv", &dataset("billing", regular(T0, WEEK, 30))).await;

    sqlx::query("DROP TABLE Sources").execute(&pool).await.unwrap();

    let response = get(app, "/api/v1/models/billing/predict").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["predicted"].is_string());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn invalid_model_name_is_400(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, dir.path());

    let response = get(app, "/api/v1/models/bad$name/predict").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn update_moves_forecast_forward(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, dir.path());

    create(app.clone(), "billing.csv", &dataset("billing", regular(T0, WEEK, 20))).await;
    let before = body_json(get(app.clone(), "/api/v1/models/billing/predict").await).await;

    let response = send(
        app.clone(),
        upload(
            Method::PUT,
            "/api/v1/models/billing/update",
            "dataset",
            "billing-june.csv",
            &dataset("billing", regular(T0 + 20 * WEEK, WEEK, 10)),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Model updated for billing-june.csv");
    assert!(dir.path().join("datasets/update/billing-june.csv").is_file());

    let after = body_json(get(app, "/api/v1/models/billing/predict").await).await;
    // Timestamps are zero-padded, so string order is time order.
    assert!(after["predicted"].as_str().unwrap() > before["predicted"].as_str().unwrap());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn update_unknown_model_is_404(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, dir.path());

    let response = send(
        app,
        upload(
            Method::PUT,
            "/api/v1/models/ghost/update",
            "dataset",
            "ghost.csv",
            &dataset("ghost", regular(T0, WEEK, 10)),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Missing data
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_data_is_empty_without_predictions(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, dir.path());

    let response = get(app, "/api/v1/models/missing_data").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_data_lists_only_overdue_sources(pool: SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, dir.path());

    create(app.clone(), "old.csv", &dataset("old", regular(T0, WEEK, 30))).await;
    create(app.clone(), "live.csv", &dataset("live", recent_hourly(30))).await;
    get(app.clone(), "/api/v1/models/old/predict").await;
    get(app.clone(), "/api/v1/models/live/predict").await;

    let json = body_json(get(app, "/api/v1/models/missing_data").await).await;
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "old");
    for field in ["lower_bound", "predicted", "upper_bound"] {
        assert!(rows[0][field].is_string());
    }
}
