//! HTTP 辅助工具：禁用缓存的响应头与可选 CORS。

use axum::body::Body as AxumBody;
use axum::http::{HeaderName, HeaderValue, Method, Request, header};
use axum::{middleware, response::Response};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::config::{CACHE_CONTROL_VALUE, GUARD_HEADER};

/// 为所有响应加上禁用缓存的头，避免浏览器读到旧的 CSV。
pub async fn disable_caching(request: Request<AxumBody>, next: middleware::Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL_VALUE),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

/// 构建 CORS Layer（逗号分隔的来源列表，`*` 表示任意来源）。
pub fn build_cors_layer(cors_origins: Option<&str>) -> Option<CorsLayer> {
    let raw = cors_origins?
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .collect::<Vec<_>>();
    if raw.is_empty() {
        return None;
    }

    let allow_origin = if raw.contains(&"*") {
        AllowOrigin::any()
    } else {
        let origins = raw
            .into_iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin, "invalid cors origin");
                    None
                }
            })
            .collect::<Vec<_>>();
        if origins.is_empty() {
            return None;
        }
        AllowOrigin::list(origins)
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderName::from_static(GUARD_HEADER),
            ]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_disabled_without_origins() {
        assert!(build_cors_layer(None).is_none());
        assert!(build_cors_layer(Some(" , ")).is_none());
        assert!(build_cors_layer(Some("bad\norigin")).is_none());
    }

    #[test]
    fn cors_enabled_for_wildcard_and_lists() {
        assert!(build_cors_layer(Some("*")).is_some());
        assert!(build_cors_layer(Some("http://localhost:3000, http://127.0.0.1:8000")).is_some());
    }
}
