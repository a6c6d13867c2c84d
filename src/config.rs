//! CLI arguments, server defaults, and the resolved site configuration.

use clap::Parser;
use shadow_rs::formatcp;
use std::io;
use std::path::{Path, PathBuf};

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_INDEX_FILE: &str = "index.html";
pub const DEFAULT_ACCESS_FILE: &str = "config/access.csv";
pub const DEFAULT_MAX_BODY_SIZE: usize = 16 * 1024 * 1024;
pub const GUARDED_PREFIX: &str = "/orgdata/";
pub const GUARD_HEADER: &str = "x-visualizer-fetch";
pub const GUARD_HEADER_VALUE: &str = "1";
pub const CACHE_CONTROL_VALUE: &str = "no-store, no-cache, must-revalidate";

/// CLI arguments for the server.
#[derive(Parser, Debug)]
#[command(
    name = "orgdata-server",
    version = VERSION_INFO,
    about = "Local dev server for the org data visualizer"
)]
pub struct Args {
    #[arg(
        short = 'b',
        long,
        default_value = DEFAULT_BIND,
        help = "Bind address"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        default_value_t = DEFAULT_PORT,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(
        short = 'r',
        long,
        help = "Project root to serve (defaults to the parent of the binary's directory)"
    )]
    pub root: Option<PathBuf>,
    #[arg(
        long,
        default_value = DEFAULT_INDEX_FILE,
        help = "Entry page served for / and /index.html"
    )]
    pub index: String,
    #[arg(
        long,
        default_value = DEFAULT_ACCESS_FILE,
        help = "Access matrix CSV path, relative to the root unless absolute"
    )]
    pub access_file: PathBuf,
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_BODY_SIZE,
        help = "Max request body size in bytes for /save-access"
    )]
    pub max_body_size: usize,
    #[arg(long, help = "Comma separated CORS origins")]
    pub cors_origins: Option<String>,
}

/// Settings every handler reads; built once at startup.
#[derive(Clone, Debug)]
pub struct SiteConfig {
    pub root: PathBuf,
    pub index_file: String,
    pub access_file: PathBuf,
    pub max_body_size: usize,
}

impl SiteConfig {
    pub fn new(root: PathBuf) -> Self {
        let access_file = root.join(DEFAULT_ACCESS_FILE);
        Self {
            root,
            index_file: DEFAULT_INDEX_FILE.to_string(),
            access_file,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Builds the site configuration from parsed arguments.
    pub fn from_args(args: &Args) -> io::Result<Self> {
        let root = match &args.root {
            Some(root) => root.clone(),
            None => default_root()?,
        };
        let root = std::fs::canonicalize(&root).map_err(|err| {
            io::Error::new(err.kind(), format!("root {}: {err}", root.display()))
        })?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("root {} is not a directory", root.display()),
            ));
        }
        let mut site = Self::new(root);
        site.access_file = resolve_under(&site.root, &args.access_file);
        site.index_file = args.index.trim_start_matches('/').to_string();
        site.max_body_size = args.max_body_size;
        Ok(site)
    }
}

/// The parent of the directory holding the running executable.
fn default_root() -> io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "cannot locate project root"))
}

fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
