//! Upload-and-predict scenarios.

use std::sync::Arc;

use forecast_predict_lib::services::model::ArtifactModel;
use forecast_predict_lib::services::{ModelHandle, ModelSource};

use super::test_helpers::*;

/// Two rows of one SKU through the fallback model.
#[actix_rt::test]
async fn test_upload_single_sku_with_fallback_model() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let csv = "date,sku,quantity\n2024-01-01,SKU-A,100\n2024-01-02,SKU-A,120\n";
    let (status, body) = upload_csv(&app, csv).await;

    assert_eq!(status, 200, "Upload should succeed: {}", body);
    assert_eq!(body["status"], "completed");

    let job_id = body["job_id"].as_str().expect("job_id should be a string");
    assert_eq!(job_id.len(), 8);
    assert_eq!(
        body["download_url"],
        format!("/api/predict/download/{}", job_id)
    );

    let row = &body["preview"][0];
    assert_eq!(row["sku"], "SKU-A");
    assert_eq!(row["last_month_qty"], 120);
    assert_eq!(row["pred_qty"], 144);
    assert_eq!(row["pct_change"], 20.0);
    assert_eq!(row["confidence"], "low");
    assert_eq!(row["data_points"], 2);

    assert_eq!(body["summary"]["total_pred"], 144);
    assert_eq!(body["summary"]["num_skus"], 1);
    assert_eq!(body["summary"]["pct_change_vs_last_month"], 20.0);

    let importances = body["feature_importances"].as_array().unwrap();
    assert_eq!(importances.len(), 6);
    assert_eq!(importances[0]["feature"], "lag_1");

    assert_eq!(dirs.upload_count(), 1, "Raw upload should be kept");
}

/// Columns match case-insensitively and SKUs keep first-appearance order.
#[actix_rt::test]
async fn test_upload_mixed_case_headers_and_multiple_skus() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let csv = "Date,SKU,Quantity\n\
               2024-01-02,B,10\n\
               2024-01-01,A,5\n\
               2024-01-01,B,20\n";
    let (status, body) = upload_csv(&app, csv).await;

    assert_eq!(status, 200, "Upload should succeed: {}", body);
    let preview = body["preview"].as_array().unwrap();
    assert_eq!(preview.len(), 2);
    assert_eq!(preview[0]["sku"], "B");
    assert_eq!(preview[1]["sku"], "A");

    // B sorted by date: 20 then 10.
    assert_eq!(preview[0]["last_month_qty"], 10);
    assert_eq!(preview[0]["pred_qty"], 12);
    assert_eq!(preview[0]["pct_change"], -50.0);

    assert_eq!(body["summary"]["total_pred"], 12 + 6);
    assert_eq!(body["summary"]["pct_change_vs_last_month"], -25.0);
}

/// A loaded artifact predicts from its own coefficients and importances.
#[actix_rt::test]
async fn test_upload_with_artifact_model() {
    let artifact = br#"{
        "intercept": 0.0,
        "coefficients": {"quantity": 2.0},
        "feature_importances": [0.1, 0.7]
    }"#;
    let model = ArtifactModel::from_slice(artifact).expect("artifact should parse");
    let handle = ModelHandle::new(Arc::new(model), ModelSource::Artifact);

    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, handle).await;

    let (status, body) = upload_csv(&app, "sku,quantity\nX,10\nX,20\n").await;

    assert_eq!(status, 200, "Upload should succeed: {}", body);
    assert_eq!(body["preview"][0]["pred_qty"], 40);
    assert_eq!(body["preview"][0]["pct_change"], 100.0);

    let importances = body["feature_importances"].as_array().unwrap();
    assert_eq!(importances[0]["feature"], "feature_1");
    assert_eq!(importances[1]["feature"], "feature_0");
}

/// Artifact referencing a column the upload lacks fails as a model error.
#[actix_rt::test]
async fn test_upload_artifact_missing_feature_is_500() {
    let model = ArtifactModel::from_slice(br#"{"coefficients": {"promo": 1.0}}"#)
        .expect("artifact should parse");
    let handle = ModelHandle::new(Arc::new(model), ModelSource::Artifact);

    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, handle).await;

    let (status, body) = upload_csv(&app, "sku,quantity\nX,10\n").await;

    assert_eq!(status, 500);
    let detail = body["detail"].as_str().unwrap();
    assert!(
        detail.starts_with("Model prediction failed"),
        "Unexpected detail: {}",
        detail
    );
}

/// A total beyond the integer range is reported, never wrapped.
#[actix_rt::test]
async fn test_upload_total_out_of_integer_range() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let csv = "sku,quantity\nA,5000000000000000000\nB,5000000000000000000\n";
    let (status, body) = upload_csv(&app, csv).await;

    assert_eq!(status, 500);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("integer range"), "Unexpected detail: {}", detail);
}

#[actix_rt::test]
async fn test_upload_missing_quantity_column() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let (status, body) = upload_csv(&app, "date,sku,qty\n2024-01-01,A,3\n").await;

    assert_eq!(status, 400);
    assert_eq!(
        body["detail"],
        "Missing required column: quantity. Found: [date, sku, qty]"
    );
}

#[actix_rt::test]
async fn test_upload_empty_file() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let (status, body) = upload_csv(&app, "").await;

    assert_eq!(status, 400);
    assert_eq!(body["detail"], "Empty file");
    assert_eq!(dirs.upload_count(), 0, "Nothing should be stored");
}

#[actix_rt::test]
async fn test_upload_header_only() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let (status, body) = upload_csv(&app, "date,sku,quantity\n").await;

    assert_eq!(status, 400);
    assert_eq!(body["detail"], "CSV is empty");
}

#[actix_rt::test]
async fn test_upload_non_numeric_quantity() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let (status, body) = upload_csv(&app, "sku,quantity\nA,lots\n").await;

    assert_eq!(status, 400);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("'quantity'"), "Unexpected detail: {}", detail);
}

#[actix_rt::test]
async fn test_upload_over_size_limit() {
    let dirs = TestDirs::new(1024);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let mut csv = String::from("sku,quantity\n");
    while csv.len() <= 2048 {
        csv.push_str("SKU-LONG-NAME,1\n");
    }
    let (status, body) = upload_csv(&app, &csv).await;

    assert_eq!(status, 400);
    let detail = body["detail"].as_str().unwrap();
    assert!(
        detail.starts_with("File size exceeds"),
        "Unexpected detail: {}",
        detail
    );
    assert_eq!(dirs.upload_count(), 0);
}

/// Multipart framing is not charged against the file ceiling.
#[actix_rt::test]
async fn test_upload_file_just_under_size_limit() {
    let dirs = TestDirs::new(1024);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let row = "SKU-LONG-NAME,1\n";
    let mut csv = String::from("sku,quantity\n");
    while csv.len() + row.len() <= 1024 {
        csv.push_str(row);
    }
    assert!(csv.len() > 1000 && csv.len() <= 1024);

    let (status, body) = upload_csv(&app, &csv).await;

    assert_eq!(status, 200, "Upload under the limit should succeed: {}", body);
    assert_eq!(body["summary"]["num_skus"], 1);
    assert_eq!(dirs.upload_count(), 1);
}

#[actix_rt::test]
async fn test_upload_without_file_field() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let (status, body) = upload_field(&app, "document", b"sku,quantity\nA,1\n").await;

    assert_eq!(status, 400);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("No file uploaded"), "Unexpected detail: {}", detail);
}
