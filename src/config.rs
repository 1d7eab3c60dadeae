//! CLI arguments and server configuration defaults.

use clap::Parser;
use shadow_rs::formatcp;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const DEFAULT_STORAGE_DIR: &str = "uploads";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;
pub const SHUTDOWN_GRACE_SECS: u64 = 10;

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "fileshelf", version = VERSION_INFO, about = "Flat-directory file server")]
pub struct Args {
    #[arg(
        short = 's',
        long,
        env = "FILESHELF_STORAGE_DIR",
        default_value = DEFAULT_STORAGE_DIR,
        help = "Directory that holds uploaded files"
    )]
    pub storage_dir: String,
    #[arg(
        short = 'b',
        long,
        env = "FILESHELF_BIND",
        default_value = DEFAULT_HOST,
        help = "Bind address"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "FILESHELF_PORT",
        default_value_t = DEFAULT_PORT,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(
        long,
        env = "FILESHELF_MAX_UPLOAD_SIZE",
        default_value_t = DEFAULT_MAX_UPLOAD_SIZE,
        help = "Max upload request size in bytes (0 to disable)"
    )]
    pub max_upload_size: u64,
    #[arg(long, env = "FILESHELF_CORS_ORIGINS", help = "Comma separated CORS origins")]
    pub cors_origins: Option<String>,
}

/// Settings the router needs, built once from [`Args`].
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub max_upload_size: u64,
    pub cors_origins: Option<String>,
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self {
            max_upload_size: args.max_upload_size,
            cors_origins: args.cors_origins.clone(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            cors_origins: None,
        }
    }
}
