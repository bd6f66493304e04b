//! Forecast feed without a configured database.

use forecast_predict_lib::services::ModelHandle;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_forecast_endpoints_unavailable_without_database() {
    let dirs = TestDirs::new(TEST_MAX_UPLOAD_SIZE);
    let app = create_test_app(&dirs, ModelHandle::fallback()).await;

    for uri in [
        "/api/forecasts",
        "/api/forecasts/top-skus?limit=5",
        "/api/forecasts/download?store_id=S1",
    ] {
        let (status, body) = get_json(&app, uri).await;
        assert_eq!(status, 503, "{} should be unavailable", uri);
        assert!(
            body["detail"]
                .as_str()
                .unwrap()
                .contains("FORECAST_DATABASE_URL"),
            "Unexpected body for {}: {}",
            uri,
            body
        );
    }
}
