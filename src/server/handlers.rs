// src/server/handlers.rs
//! HTTP handlers
//!
//! Thin multipart plumbing around the service layer. Training is
//! synchronous CPU work, so every dataset-touching handler moves it
//! onto the blocking pool.

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use axum::Json;
use serde_json::json;
use tracing::info;

use crate::dataset::RawTable;
use crate::models::ConfigMap;
use crate::service::{self, CompareReport, CompareRequest, QuickcheckReport};

use super::error::{Result, ServerError};

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Fields accepted across the upload endpoints; unknown fields are
/// ignored so the endpoints share one reader.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    file_name: Option<String>,
    target: Option<String>,
    classical_model: Option<String>,
    quantum_model: Option<String>,
    classical_params: Option<String>,
    quantum_params: Option<String>,
}

impl UploadForm {
    fn file(&self) -> Result<&[u8]> {
        self.file
            .as_deref()
            .ok_or_else(|| ServerError::BadRequest("missing 'file' field".to_string()))
    }

    /// Optional text field with empty strings treated as absent
    fn optional(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    fn required(value: &Option<String>, name: &str) -> Result<String> {
        Self::optional(value)
            .map(str::to_string)
            .ok_or_else(|| ServerError::BadRequest(format!("missing '{name}' field")))
    }
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.to_string()))?;
                form.file = Some(bytes.to_vec());
            }
            "target" | "targetColumn" => form.target = Some(text_field(field).await?),
            "classicalModel" => form.classical_model = Some(text_field(field).await?),
            "quantumModel" => form.quantum_model = Some(text_field(field).await?),
            "classicalParams" => form.classical_params = Some(text_field(field).await?),
            "quantumParams" => form.quantum_params = Some(text_field(field).await?),
            _ => {}
        }
    }
    Ok(form)
}

async fn text_field(field: Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| ServerError::BadRequest(e.to_string()))
}

/// Params fields arrive as JSON-object strings; empty means defaults
fn parse_params(raw: Option<&str>, name: &str) -> Result<ConfigMap> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(ConfigMap::new()),
        Some(raw) => raw,
    };
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ServerError::BadRequest(format!("{name} is not valid JSON: {e}")))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(ServerError::BadRequest(format!(
            "{name} must be a JSON object"
        ))),
    }
}

fn join_error(err: tokio::task::JoinError) -> ServerError {
    ServerError::Internal(format!("worker task failed: {err}"))
}

/// POST /api/preview: head-check an uploaded CSV
pub async fn preview(multipart: Multipart) -> Result<Json<serde_json::Value>> {
    let form = read_form(multipart).await?;
    let bytes = form.file()?.to_vec();
    let file_name = form
        .file_name
        .clone()
        .unwrap_or_else(|| "dataset.csv".to_string());

    let preview = tokio::task::spawn_blocking(move || -> Result<_> {
        let table = RawTable::parse(&bytes)?;
        if table.n_rows() == 0 {
            return Err(ServerError::BadRequest("CSV has no rows".to_string()));
        }
        Ok(table.preview())
    })
    .await
    .map_err(join_error)??;

    let mut body = serde_json::to_value(&preview)
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    if let Some(map) = body.as_object_mut() {
        map.insert("filename".to_string(), file_name.into());
    }
    Ok(Json(body))
}

/// POST /api/quickcheck: fast scan plus runner recommendation
pub async fn quickcheck(multipart: Multipart) -> Result<Json<QuickcheckReport>> {
    let form = read_form(multipart).await?;
    let bytes = form.file()?.to_vec();
    let target = UploadForm::optional(&form.target).map(str::to_string);

    let report = tokio::task::spawn_blocking(move || {
        service::quickcheck(&bytes, target.as_deref())
    })
    .await
    .map_err(join_error)??;
    Ok(Json(report))
}

/// POST /api/compare: the full benchmark
pub async fn compare(multipart: Multipart) -> Result<Json<CompareReport>> {
    let form = read_form(multipart).await?;
    let bytes = form.file()?.to_vec();
    let target = UploadForm::optional(&form.target).map(str::to_string);
    let request = CompareRequest {
        classical_key: UploadForm::required(&form.classical_model, "classicalModel")?,
        classical_config: parse_params(form.classical_params.as_deref(), "classicalParams")?,
        quantum_key: UploadForm::required(&form.quantum_model, "quantumModel")?,
        quantum_config: parse_params(form.quantum_params.as_deref(), "quantumParams")?,
    };

    info!(
        classical = %request.classical_key,
        quantum = %request.quantum_key,
        bytes = bytes.len(),
        "compare request"
    );

    let report = tokio::task::spawn_blocking(move || {
        service::compare_csv(&bytes, target.as_deref(), &request)
    })
    .await
    .map_err(join_error)?
    .map_err(ServerError::from)?;
    Ok(Json(report))
}
