//! Upload-and-predict API handlers.
//!
//! - `POST /api/predict/upload`: multipart CSV upload, returns predictions
//! - `GET /api/predict/download/{job_id}`: stored result table as CSV
//! - `GET /api/predict/template`: example input CSV

use actix_multipart::Multipart;
use actix_web::http::header::{CONTENT_LENGTH, ContentDisposition};
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use futures_util::StreamExt;
use tracing::{info, warn};

use crate::config::{PredictSettings, USER_ID_HEADER};
use crate::error::{AppError, AppResult};
use crate::models::UploadPredictResponse;
use crate::services::ingest::{self, IngestedUpload};
use crate::services::{ModelHandle, ResultStore, pipeline};

/// Multipart field carrying the CSV.
const FILE_FIELD: &str = "file";

/// Example upload served by the template endpoint.
pub const TEMPLATE_CSV: &str = "date,sku,quantity\n\
2024-10-01,SKU-001,100\n\
2024-10-02,SKU-002,150\n\
2024-10-03,SKU-001,110\n";

/// Upload sales history and run the forecast model.
///
/// Expects a multipart form with a `file` field holding a CSV with at least
/// `sku` and `quantity` columns (case-insensitive); `date` is optional.
#[utoipa::path(
    post,
    path = "/api/predict/upload",
    tag = "Predict",
    request_body(content = String, content_type = "multipart/form-data", description = "Form field `file`: sales CSV"),
    params(
        ("user_id" = Option<String>, Header, description = "Caller id (informational only)")
    ),
    responses(
        (status = 200, description = "Prediction completed", body = UploadPredictResponse),
        (status = 400, description = "Invalid upload", body = crate::error::ErrorResponse),
        (status = 500, description = "Model or internal failure", body = crate::error::ErrorResponse),
    )
)]
#[post("/upload")]
pub async fn upload_and_predict(
    req: HttpRequest,
    payload: Multipart,
    model: web::Data<ModelHandle>,
    store: web::Data<ResultStore>,
    settings: web::Data<PredictSettings>,
) -> AppResult<HttpResponse> {
    let max_upload_size = settings.max_upload_size;

    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    ingest::check_declared_size(declared, max_upload_size)?;

    if let Some(user_id) = req.headers().get(USER_ID_HEADER).and_then(|v| v.to_str().ok()) {
        info!("Upload received from user_id={}", user_id);
    }

    let bytes = read_file_field(payload, max_upload_size).await?;
    info!("Reading CSV from upload ({} bytes)...", bytes.len());

    let IngestedUpload { job_id, table, .. } = ingest::ingest(&store, bytes).await?;

    let forecaster = model.get_ref().clone();
    let job_label = job_id.to_string();
    let result =
        tokio::task::spawn_blocking(move || pipeline::run(forecaster.forecaster(), &table, &job_label))
            .await??;

    store.put(&job_id, &result.summaries).await?;

    Ok(HttpResponse::Ok().json(UploadPredictResponse::completed(job_id.as_str(), result)))
}

/// Collect the `file` field, enforcing the size ceiling while streaming.
async fn read_file_field(mut payload: Multipart, max_upload_size: usize) -> AppResult<Vec<u8>> {
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        let is_file = field.name() == Some(FILE_FIELD);
        if !is_file || file_bytes.is_some() {
            // Drain fields we do not use
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
            }
            if is_file {
                warn!("Ignoring extra '{}' field in upload", FILE_FIELD);
            }
            continue;
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
            if data.len() + chunk.len() > max_upload_size {
                tracing::error!("File too large: more than {} bytes", max_upload_size);
                return Err(AppError::PayloadTooLarge(max_upload_size));
            }
            data.extend_from_slice(&chunk);
        }
        file_bytes = Some(data);
    }

    file_bytes.ok_or_else(|| {
        AppError::InvalidInput(format!("No file uploaded. Provide a '{}' form field.", FILE_FIELD))
    })
}

/// Download the result table of a completed job.
#[utoipa::path(
    get,
    path = "/api/predict/download/{job_id}",
    tag = "Predict",
    params(
        ("job_id" = String, Path, description = "Job id returned by the upload")
    ),
    responses(
        (status = 200, description = "Result CSV", content_type = "text/csv", body = String),
        (status = 404, description = "Results not found", body = crate::error::ErrorResponse),
    )
)]
#[get("/download/{job_id}")]
pub async fn download_results(
    path: web::Path<String>,
    store: web::Data<ResultStore>,
) -> AppResult<HttpResponse> {
    let job_id = path.into_inner();
    let bytes = store.get(&job_id).await?;

    info!("Downloading results for job {}", job_id);

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header(ContentDisposition::attachment(format!(
            "predictions_{}.csv",
            job_id
        )))
        .body(bytes))
}

/// Download an example input CSV.
#[utoipa::path(
    get,
    path = "/api/predict/template",
    tag = "Predict",
    responses(
        (status = 200, description = "Template CSV", content_type = "text/csv", body = String)
    )
)]
#[get("/template")]
pub async fn template_csv() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header(ContentDisposition::attachment("sales_template.csv"))
        .body(TEMPLATE_CSV)
}

/// Configure predict routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/predict")
            .service(upload_and_predict)
            .service(download_results)
            .service(template_csv),
    );
}
