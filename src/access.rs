//! Access matrix upload: `POST /save-access` with a JSON `{"csv": "..."}` body.

use axum::body::{Body as AxumBody, to_bytes};
use axum::extract::Extension;
use axum::http::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tokio::fs;
use tracing::info;

use crate::atomic::write_atomic;
use crate::config::SiteConfig;
use crate::error::ApiError;

pub const SAVED_MSG: &str = "Access matrix saved.";
pub const MISSING_CSV_MSG: &str = "Missing CSV data.";

/// 保存访问矩阵，整体覆盖目标 CSV。
pub async fn save_access(
    Extension(site): Extension<Arc<SiteConfig>>,
    body: AxumBody,
) -> Result<(StatusCode, &'static str), ApiError> {
    let bytes = to_bytes(body, site.max_body_size)
        .await
        .map_err(|err| ApiError::Internal(format!("failed to read request body: {err}")))?;
    let payload: Value = serde_json::from_slice(&bytes)?;
    let Some(csv) = csv_field(&payload)? else {
        return Err(ApiError::BadRequest(MISSING_CSV_MSG.into()));
    };

    if let Some(parent) = site.access_file.parent() {
        fs::create_dir_all(parent).await.map_err(|err| {
            ApiError::Internal(format!("failed to create {}: {err}", parent.display()))
        })?;
    }
    write_atomic(&site.access_file, csv.as_bytes())
        .await
        .map_err(|err| {
            ApiError::Internal(format!(
                "failed to write {}: {err}",
                site.access_file.display()
            ))
        })?;

    info!(
        path = %site.access_file.display(),
        bytes = csv.len(),
        "access matrix saved"
    );
    Ok((StatusCode::OK, SAVED_MSG))
}

/// Pulls the CSV text out of the payload.
///
/// `Ok(None)` means "nothing to save": the key is absent or holds an empty
/// value (`""`, `null`, `false`, `0`, `[]`, `{}`). Anything else that is not
/// a string, or a payload that is not an object, is a malformed request.
fn csv_field(payload: &Value) -> Result<Option<&str>, ApiError> {
    let object = payload
        .as_object()
        .ok_or_else(|| ApiError::Internal("payload is not a json object".into()))?;
    match object.get("csv") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::String(text)) if text.is_empty() => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.as_str())),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(Value::Array(items)) if items.is_empty() => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(other) => Err(ApiError::Internal(format!(
            "csv field must be a string, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn make_site() -> (tempfile::TempDir, Arc<SiteConfig>) {
        let temp = tempdir().expect("tempdir");
        let site = SiteConfig::new(temp.path().to_path_buf());
        (temp, Arc::new(site))
    }

    #[tokio::test]
    async fn save_creates_config_dir_and_writes_exact_text() {
        let (_temp, site) = make_site();
        let body = AxumBody::from(json!({ "csv": "a,b\nc,d" }).to_string());
        let (status, message) = save_access(Extension(site.clone()), body)
            .await
            .expect("save access");

        assert_eq!(status, StatusCode::OK);
        assert_eq!(message, SAVED_MSG);
        let saved = std::fs::read_to_string(&site.access_file).expect("read access file");
        assert_eq!(saved, "a,b\nc,d");
    }

    #[tokio::test]
    async fn empty_csv_is_bad_request() {
        let (_temp, site) = make_site();
        let body = AxumBody::from(r#"{"csv": ""}"#);
        let result = save_access(Extension(site.clone()), body).await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert!(!site.access_file.exists());
    }

    #[tokio::test]
    async fn invalid_json_is_internal_error() {
        let (_temp, site) = make_site();
        let result = save_access(Extension(site.clone()), AxumBody::from("{csv:")).await;

        assert!(matches!(result, Err(ApiError::Internal(_))));
        assert!(!site.access_file.exists());
    }

    #[tokio::test]
    async fn oversized_body_is_internal_error() {
        let temp = tempdir().expect("tempdir");
        let mut site = SiteConfig::new(temp.path().to_path_buf());
        site.max_body_size = 8;
        let body = AxumBody::from(json!({ "csv": "well over eight bytes" }).to_string());
        let result = save_access(Extension(Arc::new(site)), body).await;

        assert!(matches!(result, Err(ApiError::Internal(_))));
    }

    #[test]
    fn csv_field_classifies_values() {
        assert!(matches!(csv_field(&json!({})), Ok(None)));
        assert!(matches!(csv_field(&json!({ "csv": null })), Ok(None)));
        assert!(matches!(csv_field(&json!({ "csv": 0 })), Ok(None)));
        assert!(matches!(csv_field(&json!({ "csv": [] })), Ok(None)));
        assert!(matches!(csv_field(&json!({ "csv": "x" })), Ok(Some("x"))));
        assert!(matches!(
            csv_field(&json!({ "csv": 42 })),
            Err(ApiError::Internal(_))
        ));
        assert!(matches!(
            csv_field(&json!(["csv"])),
            Err(ApiError::Internal(_))
        ));
        assert!(matches!(
            csv_field(&json!("csv")),
            Err(ApiError::Internal(_))
        ));
    }
}
