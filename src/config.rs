//! 命令行参数、默认值与启动时校验后的服务配置。

use clap::{ArgGroup, Parser};
use shadow_rs::formatcp;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::build;
use crate::http::advertised_host;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const DEFAULT_DIRECTORY: &str = "./";
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const SHUTDOWN_GRACE_SECS: u64 = 10;

/// 命令行与环境变量配置。
#[derive(Parser, Debug)]
#[command(
    name = "dev-upload-server",
    version = VERSION_INFO,
    about = "Accept multipart file uploads over HTTP and save them to a directory"
)]
#[command(group(
    ArgGroup::new("security")
        .required(true)
        .args(["no_security", "user"])
))]
pub struct Args {
    #[arg(
        short = 'd',
        long,
        env = "UPLOAD_DIRECTORY",
        default_value = DEFAULT_DIRECTORY,
        help = "Directory to save uploaded files to"
    )]
    pub directory: PathBuf,
    #[arg(
        short = 'b',
        long,
        env = "UPLOAD_BIND",
        default_value = DEFAULT_BIND,
        help = "Address to bind to"
    )]
    pub bind: IpAddr,
    #[arg(
        short = 'p',
        long,
        env = "UPLOAD_PORT",
        default_value_t = DEFAULT_PORT,
        help = "Port to serve at"
    )]
    pub port: u16,
    #[arg(long, env = "UPLOAD_NO_SECURITY", help = "Don't use any security")]
    pub no_security: bool,
    #[arg(
        short = 'u',
        long,
        env = "UPLOAD_USER",
        help = "Require basic auth; 'username:password'"
    )]
    pub user: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--directory: {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("--directory: cannot resolve {}: {source}", .path.display())]
    Unresolvable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("one of --no-security or --user is required")]
    MissingSecurityChoice,
    #[error("--no-security cannot be combined with --user")]
    ConflictingSecurityChoice,
    #[error("--user: not in expected form: 'username:password'")]
    MalformedCredentials,
    #[error("--user: username must not be empty")]
    EmptyUsername,
    #[error("--user: username must not contain path separators")]
    UsernameWithSeparator,
}

#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// 解析 `username:password` 形式的凭据。
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut parts = raw.split(':');
        let (Some(username), Some(password), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ConfigError::MalformedCredentials);
        };
        if username.is_empty() {
            return Err(ConfigError::EmptyUsername);
        }
        // The username becomes part of stored filenames.
        if username.contains(['/', '\\']) {
            return Err(ConfigError::UsernameWithSeparator);
        }
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// 启动时构建、之后只读的服务配置。
#[derive(Debug)]
pub struct ServerConfig {
    pub credentials: Option<Credentials>,
    pub save_dir: PathBuf,
    pub advertised_url: String,
}

impl ServerConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let save_dir = resolve_save_dir(&args.directory)?;
        let credentials = match (args.no_security, args.user.as_deref()) {
            (true, None) => None,
            (false, Some(raw)) => Some(Credentials::parse(raw)?),
            (true, Some(_)) => return Err(ConfigError::ConflictingSecurityChoice),
            // Reachable through `UPLOAD_NO_SECURITY=false`; never fall back to no auth.
            (false, None) => return Err(ConfigError::MissingSecurityChoice),
        };
        let advertised_url = format!("http://{}:{}/", advertised_host(args.bind), args.port);
        Ok(Self {
            credentials,
            save_dir,
            advertised_url,
        })
    }

    pub fn use_security(&self) -> bool {
        self.credentials.is_some()
    }
}

/// 将保存目录解析为绝对规范路径，并确认其为已存在的目录。
pub fn resolve_save_dir(directory: &Path) -> Result<PathBuf, ConfigError> {
    let resolved = std::fs::canonicalize(directory).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotADirectory(directory.to_path_buf())
        } else {
            ConfigError::Unresolvable {
                path: directory.to_path_buf(),
                source,
            }
        }
    })?;
    if !resolved.is_dir() {
        return Err(ConfigError::NotADirectory(resolved));
    }
    Ok(resolved)
}
