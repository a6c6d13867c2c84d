//! Access gate for the org data folder.
//!
//! Any path under `/orgdata/` is only served to requests carrying
//! `X-Visualizer-Fetch: 1`, which the visualizer's own fetch calls set. A
//! browser navigating to a data file directly gets a 403 instead. The header
//! is client-supplied, so this keeps casual users out of the raw CSVs and is
//! not an authorization mechanism.

use axum::http::HeaderMap;

use crate::config::{GUARD_HEADER, GUARD_HEADER_VALUE, GUARDED_PREFIX};

pub const DATA_FORBIDDEN_MSG: &str = "Direct access to data files is forbidden";

/// Lexical prefix match, independent of depth and file name.
pub fn is_guarded_path(path: &str) -> bool {
    path.starts_with(GUARDED_PREFIX)
}

/// True only when the guard header is present and exactly `1`.
pub fn is_visualizer_fetch(headers: &HeaderMap) -> bool {
    headers
        .get(GUARD_HEADER)
        .is_some_and(|value| value.as_bytes() == GUARD_HEADER_VALUE.as_bytes())
}

/// Whether a request for `path` with `headers` may be served.
pub fn allows(path: &str, headers: &HeaderMap) -> bool {
    !is_guarded_path(path) || is_visualizer_fetch(headers)
}
