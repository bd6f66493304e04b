//! Result download scenarios.

use forecast_predict_lib::services::ModelHandle;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_download_returns_result_table() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let csv = "date,sku,quantity\n2024-01-01,SKU-A,100\n2024-01-02,SKU-A,120\n";
    let (status, body) = upload_csv(&app, csv).await;
    assert_eq!(status, 200, "Upload should succeed: {}", body);
    let url = body["download_url"].as_str().unwrap().to_string();
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let (status, content_type, disposition, bytes) = get_raw(&app, &url).await;
    assert_eq!(status, 200);
    assert_eq!(content_type.as_deref(), Some("text/csv"));
    let disposition = disposition.expect("attachment header expected");
    assert!(
        disposition.contains(&format!("predictions_{}.csv", job_id)),
        "Unexpected disposition: {}",
        disposition
    );

    let text = String::from_utf8(bytes.clone()).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("sku,last_month_qty,pred_qty,pct_change,confidence,data_points")
    );
    assert_eq!(lines.next(), Some("SKU-A,120,144,20.0,low,2"));
    assert_eq!(lines.next(), None);

    // Repeated downloads are byte-identical.
    let (_, _, _, again) = get_raw(&app, &url).await;
    assert_eq!(bytes, again);
}

#[actix_rt::test]
async fn test_download_unknown_job() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let (status, body) = get_json(&app, "/api/predict/download/deadbeef").await;

    assert_eq!(status, 404);
    assert_eq!(body["detail"], "Results not found");
}

#[actix_rt::test]
async fn test_download_rejects_malformed_job_id() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    let (status, body) = get_json(&app, "/api/predict/download/not.a.job").await;

    assert_eq!(status, 404);
    assert_eq!(body["detail"], "Results not found");
}
