use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use trail_core::{DisabledNotifier, Notifier, SendmailNotifier};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_FROM: &str = "Location Tracker <noreply@localhost>";
const DEFAULT_SENDMAIL: &str = "/usr/sbin/sendmail";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub log_dir: PathBuf,
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierConfig {
    Disabled,
    Sendmail {
        sendmail_path: PathBuf,
        from: String,
        to: String,
    },
}

/// Values supplied on the command line; `None` defers to the file.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_dir: Option<PathBuf>,
    pub cors_origins: Vec<String>,
    pub enable_email: Option<bool>,
}

#[derive(Debug, Default, Clone)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cors_origins: Vec<String>,
    pub log_dir: Option<PathBuf>,
    pub notifier: Option<FileNotifierConfig>,
}

#[derive(Debug, Default, Clone)]
pub struct FileNotifierConfig {
    pub enabled: Option<bool>,
    pub to: Option<String>,
    pub from: Option<String>,
    pub sendmail_path: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
struct RootConfig {
    #[serde(default)]
    server: Option<RawServerConfig>,
    #[serde(default)]
    storage: Option<RawStorageConfig>,
    #[serde(default)]
    notifier: Option<RawNotifierConfig>,
}

#[derive(Deserialize, Default)]
struct RawServerConfig {
    host: Option<String>,
    port: Option<u16>,
    cors_origins: Option<Vec<String>>,
}

#[derive(Deserialize, Default)]
struct RawStorageConfig {
    log_dir: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawNotifierConfig {
    enabled: Option<bool>,
    to: Option<String>,
    from: Option<String>,
    sendmail_path: Option<String>,
}

/// Read the TOML file at `path`. A missing file is not an error.
///
/// Relative `log_dir` values are resolved against the file's directory.
pub fn load_file_config(path: Option<&Path>) -> Result<Option<FileConfig>> {
    let Some(path) = path else {
        return Ok(None);
    };

    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let parsed: RootConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse TOML config {}", path.display()))?;

    Ok(Some(
        parsed.into_file_config(path.parent().unwrap_or(Path::new("."))),
    ))
}

/// Merge CLI overrides, file values and defaults, in that order of precedence.
pub fn resolve(cli: &CliOverrides, file_cfg: Option<&FileConfig>) -> Result<AppConfig> {
    let host = cli
        .host
        .clone()
        .or_else(|| file_cfg.and_then(|cfg| cfg.host.clone()))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = cli
        .port
        .or_else(|| file_cfg.and_then(|cfg| cfg.port))
        .unwrap_or(DEFAULT_PORT);

    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| file_cfg.and_then(|cfg| cfg.log_dir.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

    let mut cors_origins: Vec<String> = file_cfg
        .map(|cfg| cfg.cors_origins.clone())
        .unwrap_or_default();
    cors_origins.extend(cli.cors_origins.iter().cloned());
    cors_origins.sort();
    cors_origins.dedup();

    let notifier = build_notifier_config(cli, file_cfg.and_then(|cfg| cfg.notifier.as_ref()))?;

    Ok(AppConfig {
        server: ServerConfig {
            host,
            port,
            cors_origins,
        },
        log_dir,
        notifier,
    })
}

fn build_notifier_config(
    cli: &CliOverrides,
    file_cfg: Option<&FileNotifierConfig>,
) -> Result<NotifierConfig> {
    let enabled = cli
        .enable_email
        .or_else(|| file_cfg.and_then(|cfg| cfg.enabled))
        .unwrap_or(false);

    if !enabled {
        return Ok(NotifierConfig::Disabled);
    }

    let to = file_cfg
        .and_then(|cfg| cfg.to.clone())
        .filter(|to| !to.trim().is_empty())
        .ok_or_else(|| anyhow!("Email notification is enabled but [notifier] to is not set"))?;

    let from = file_cfg
        .and_then(|cfg| cfg.from.clone())
        .unwrap_or_else(|| DEFAULT_FROM.to_string());

    let sendmail_path = file_cfg
        .and_then(|cfg| cfg.sendmail_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SENDMAIL));

    Ok(NotifierConfig::Sendmail {
        sendmail_path,
        from,
        to,
    })
}

impl AppConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ServerConfig { host, port, .. } = &self.server;
        format!("{host}:{port}")
            .parse()
            .with_context(|| format!("Invalid bind address {host}:{port}"))
    }

    pub fn build_notifier(&self) -> Arc<dyn Notifier> {
        match &self.notifier {
            NotifierConfig::Disabled => Arc::new(DisabledNotifier),
            NotifierConfig::Sendmail {
                sendmail_path,
                from,
                to,
            } => Arc::new(SendmailNotifier::new(
                sendmail_path.clone(),
                from.clone(),
                to.clone(),
            )),
        }
    }
}

impl RootConfig {
    fn into_file_config(self, base: &Path) -> FileConfig {
        let server = self.server.unwrap_or_default();
        FileConfig {
            host: server.host,
            port: server.port,
            cors_origins: server.cors_origins.unwrap_or_default(),
            log_dir: self
                .storage
                .and_then(|storage| storage.log_dir)
                .map(|value| resolve_relative(base, Path::new(&value))),
            notifier: self.notifier.map(RawNotifierConfig::into_file_config),
        }
    }
}

impl RawNotifierConfig {
    fn into_file_config(self) -> FileNotifierConfig {
        FileNotifierConfig {
            enabled: self.enabled,
            to: self.to,
            from: self.from,
            sendmail_path: self.sendmail_path.map(PathBuf::from),
        }
    }
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
