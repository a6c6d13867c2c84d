//! 静态文件服务：入口页改写、禁止目录访问、orgdata 访问控制。

use axum::body::Body as AxumBody;
use axum::extract::Extension;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use httpdate::fmt_http_date;
use percent_encoding::percent_decode_str;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::config::SiteConfig;
use crate::error::ApiError;
use crate::guard::{self, DATA_FORBIDDEN_MSG};

pub const DIR_FORBIDDEN_MSG: &str = "Directory access is forbidden";
pub const LISTING_DISABLED_MSG: &str = "Directory listing is disabled";
pub const NOT_FOUND_MSG: &str = "File not found";

/// 兜底处理器：除动态路由外的所有请求。
pub async fn serve_static(
    Extension(site): Extension<Arc<SiteConfig>>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, ApiError> {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::NotImplemented("Unsupported method".into()));
    }

    let raw = uri.path();
    let requested = if raw == "/" || raw == "/index.html" {
        format!("/{}", site.index_file)
    } else if raw.ends_with('/') {
        return Err(ApiError::Forbidden(DIR_FORBIDDEN_MSG.into()));
    } else {
        percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| ApiError::NotFound(NOT_FOUND_MSG.into()))?
            .into_owned()
    };

    if !guard::allows(raw, &headers) {
        warn!(path = raw, "blocked direct data file access");
        return Err(ApiError::Forbidden(DATA_FORBIDDEN_MSG.into()));
    }

    let target = resolve(&site.root, &requested)
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND_MSG.into()))?;
    send_file(&target, method == Method::HEAD).await
}

/// Maps a decoded URL path onto a file under `root`.
///
/// Returns `None` for anything that would step outside the root.
fn resolve(root: &Path, url_path: &str) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in Path::new(url_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(segment) => normalized.push(segment),
            Component::CurDir => continue,
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(root.join(normalized))
}

async fn send_file(target: &Path, head_only: bool) -> Result<Response, ApiError> {
    let metadata = fs::metadata(target).await.map_err(not_found_or_internal)?;
    if metadata.is_dir() {
        return Err(ApiError::Forbidden(LISTING_DISABLED_MSG.into()));
    }

    let mime = mime_guess::from_path(target).first_or_octet_stream();
    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .map_err(|_| ApiError::Internal("invalid mime type".into()))?,
    );
    response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    if let Ok(modified) = metadata.modified()
        && let Ok(value) = HeaderValue::from_str(&fmt_http_date(modified))
    {
        response_headers.insert(header::LAST_MODIFIED, value);
    }

    debug!(path = %target.display(), size = metadata.len(), head_only, "serve file");
    if head_only {
        return Ok((StatusCode::OK, response_headers, AxumBody::empty()).into_response());
    }

    let file = File::open(target).await.map_err(not_found_or_internal)?;
    Ok((
        StatusCode::OK,
        response_headers,
        AxumBody::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// Lookup failures caused by the requested path itself are plain 404s.
fn not_found_or_internal(err: io::Error) -> ApiError {
    match err.kind() {
        ErrorKind::NotFound
        | ErrorKind::NotADirectory
        | ErrorKind::InvalidInput
        | ErrorKind::InvalidFilename => ApiError::NotFound(NOT_FOUND_MSG.into()),
        _ => ApiError::Internal(err.to_string()),
    }
}
