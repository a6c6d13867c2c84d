//! Router wiring shared by the binary and the tests.

use axum::extract::{Extension, connect_info::ConnectInfo};
use axum::http::Request;
use axum::routing::{get, post};
use axum::{Router, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info_span};

use crate::config::SiteConfig;
use crate::identity::SharedIdentity;
use crate::{access, files, http, identity};

/// Builds the application router.
///
/// Cache headers are added outermost so every response carries them,
/// including router-generated 404/405 and CORS preflight answers.
pub fn build_router(
    site: Arc<SiteConfig>,
    identity: SharedIdentity,
    cors_origins: Option<&str>,
) -> Router {
    let mut app = Router::new()
        .route("/username", get(identity::get_username))
        .route("/whoami", get(identity::get_whoami))
        .route("/save-access", post(access::save_access))
        .fallback(files::serve_static)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let client_ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.ip().to_string())
                        .unwrap_or_else(|| "unknown".to_string());

                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(Extension(site))
        .layer(Extension(identity));

    if let Some(cors_layer) = http::build_cors_layer(cors_origins) {
        app = app.layer(cors_layer);
    }

    app.layer(middleware::from_fn(http::disable_caching))
}
