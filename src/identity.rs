//! Current OS user lookup for `/username` and `/whoami`.

use axum::extract::Extension;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use serde::Serialize;
use std::sync::Arc;

const UNKNOWN_USER: &str = "unknown";

/// Source of the account name the server runs under.
pub trait IdentityProvider: Send + Sync {
    /// Short account name, without any `DOMAIN\` qualification.
    fn username(&self) -> String;

    /// Logon domain, when the platform reports one.
    fn domain(&self) -> Option<String>;
}

pub type SharedIdentity = Arc<dyn IdentityProvider>;

/// Reads the account of the server process: login environment variables
/// first, then the password database entry for the real uid.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsIdentity;

impl IdentityProvider for OsIdentity {
    fn username(&self) -> String {
        resolve_username(|key| std::env::var(key).ok(), account_name)
    }

    fn domain(&self) -> Option<String> {
        std::env::var("USERDOMAIN")
            .ok()
            .filter(|domain| !domain.is_empty())
    }
}

const LOGIN_ENV_VARS: [&str; 4] = ["LOGNAME", "USER", "LNAME", "USERNAME"];

fn resolve_username(
    env: impl Fn(&str) -> Option<String>,
    account: impl FnOnce() -> Option<String>,
) -> String {
    LOGIN_ENV_VARS
        .into_iter()
        .filter_map(|key| env(key))
        .chain(std::iter::once_with(account).flatten())
        .map(|name| short_name(&name).to_string())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_USER.to_string())
}

/// Account name of the real uid from the password database.
#[cfg(unix)]
fn account_name() -> Option<String> {
    use std::ffi::CStr;

    const MAX_BUF: usize = 1 << 16;
    let uid = unsafe { libc::getuid() };
    let mut buf = vec![0 as libc::c_char; 1024];
    loop {
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut found: *mut libc::passwd = std::ptr::null_mut();
        let rc =
            unsafe { libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut found) };
        if rc == libc::ERANGE && buf.len() < MAX_BUF {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        if rc != 0 || found.is_null() || pwd.pw_name.is_null() {
            tracing::warn!(uid, rc, "no password entry for current uid");
            return None;
        }
        // pw_name points into `buf`, which outlives this borrow
        let name = unsafe { CStr::from_ptr(pwd.pw_name) };
        return Some(name.to_string_lossy().into_owned());
    }
}

#[cfg(not(unix))]
fn account_name() -> Option<String> {
    None
}

/// Strips a `DOMAIN\` prefix.
fn short_name(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name).trim()
}

#[derive(Serialize)]
pub(crate) struct WhoAmI {
    user: String,
}

/// 返回纯文本用户名。
pub async fn get_username(Extension(identity): Extension<SharedIdentity>) -> Response {
    let username = identity.username();
    tracing::debug!(username = %username, "username lookup");
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        username,
    )
        .into_response()
}

/// 返回带域名的用户标识（JSON）。
pub async fn get_whoami(Extension(identity): Extension<SharedIdentity>) -> Response {
    let username = identity.username();
    let user = match identity.domain() {
        Some(domain) => format!("{domain}\\{username}"),
        None => username,
    };
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        )],
        JsonResponse(WhoAmI { user }),
    )
        .into_response()
}
