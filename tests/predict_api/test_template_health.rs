//! Template download and health check.

use forecast_predict_lib::api::predict::TEMPLATE_CSV;
use forecast_predict_lib::services::ModelHandle;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_template_is_a_valid_upload() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let (status, content_type, disposition, bytes) = get_raw(&app, "/api/predict/template").await;
    assert_eq!(status, 200);
    assert_eq!(content_type.as_deref(), Some("text/csv"));
    assert!(disposition.unwrap().contains("sales_template.csv"));

    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(text, TEMPLATE_CSV);
    assert!(text.starts_with("date,sku,quantity\n"));

    // The template round-trips through the upload endpoint.
    let (status, body) = upload_csv(&app, &text).await;
    assert_eq!(status, 200, "Template upload should succeed: {}", body);
    assert_eq!(body["summary"]["num_skus"], 2);
}

#[actix_rt::test]
async fn test_health_on_fallback_model() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    // The fallback still counts as a loaded model.
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model_source"], "fallback");
    assert_eq!(body["forecast_store"], false);
    assert!(body["timestamp"].is_string());
}
