//! Shared test helpers for the predict API tests.

use actix_web::{App, dev::ServiceResponse, test, web};
use forecast_predict_lib::api;
use forecast_predict_lib::config::PredictSettings;
use forecast_predict_lib::db::ForecastStore;
use forecast_predict_lib::services::{ModelHandle, ResultStore};
use serde_json::Value;
use tempfile::TempDir;

/// Multipart boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "----predict-test-boundary";

/// Generous default ceiling for tests that do not probe the limit.
pub const TEST_MAX_UPLOAD_SIZE: usize = 1024 * 1024;

/// Temporary storage for one test; dropped with the test.
pub struct TestDirs {
    _root: TempDir,
    pub settings: PredictSettings,
}

impl TestDirs {
    pub fn new(max_upload_size: usize) -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let settings = PredictSettings {
            uploads_dir: root.path().join("uploads"),
            results_dir: root.path().join("results"),
            max_upload_size,
        };
        TestDirs {
            _root: root,
            settings,
        }
    }

    pub fn store(&self) -> ResultStore {
        ResultStore::from_settings(&self.settings)
    }

    /// Number of files currently in the uploads directory.
    pub fn upload_count(&self) -> usize {
        std::fs::read_dir(&self.settings.uploads_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Create a test app serving the given model.
pub async fn create_test_app(
    dirs: &TestDirs,
    model: ModelHandle,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    let store = dirs.store();
    store
        .ensure_dirs()
        .await
        .expect("Failed to create storage dirs");

    test::init_service(
        App::new()
            .app_data(web::Data::new(model))
            .app_data(web::Data::new(store))
            .app_data(web::Data::new(dirs.settings.clone()))
            .app_data(web::Data::new(ForecastStore::disabled()))
            .configure(api::configure_health_routes)
            .configure(api::configure_predict_routes)
            .configure(api::configure_forecast_routes),
    )
    .await
}

/// Encode one multipart field named `field` carrying `content` as a CSV file.
pub fn multipart_body(field: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"sales.csv\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Upload `csv` as the `file` field.
pub async fn upload_csv<S>(app: &S, csv: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    upload_field(app, "file", csv.as_bytes()).await
}

/// Upload `content` under an arbitrary field name.
pub async fn upload_field<S>(app: &S, field: &str, content: &[u8]) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::post()
        .uri("/api/predict/upload")
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .insert_header(("user_id", "integration-tests"))
        .set_payload(multipart_body(field, content))
        .to_request();

    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// GET `uri`, returning status, headers of interest and raw body.
pub async fn get_raw<S>(app: &S, uri: &str) -> (u16, Option<String>, Option<String>, Vec<u8>)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::get().uri(uri).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let header = |name: &str| {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let content_type = header("content-type");
    let disposition = header("content-disposition");
    let body = test::read_body(resp).await.to_vec();
    (status, content_type, disposition, body)
}

/// GET `uri` and decode the JSON body.
pub async fn get_json<S>(app: &S, uri: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::get().uri(uri).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}
