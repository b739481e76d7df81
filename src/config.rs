use crate::{
    error::{Error, Result},
    extractor::{DEFAULT_FORMAT, DEFAULT_SOCKET_TIMEOUT, ExtractOptions},
    gate::DEFAULT_CAPACITY,
    validate::AllowList,
};
use std::{env, fmt::Debug, path::PathBuf, str::FromStr, time::Duration};
use tracing::warn;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub max_concurrent_downloads: usize,
    pub allow_list: AllowList,
    pub transport: TransportConfig,
    pub ytdlp: YtDlpConfig,
    pub scratch_dir: Option<PathBuf>,
}

/// Telegram client timeouts. Video uploads are large, hence the long defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YtDlpConfig {
    pub binary: PathBuf,
    pub format: String,
    pub socket_timeout: Duration,
    pub cookies_path: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingConfig` if `BOT_TOKEN` is unset or blank.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingConfig` if `BOT_TOKEN` is unset or blank.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = lookup("BOT_TOKEN")
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingConfig("BOT_TOKEN"))?;

        let max_concurrent_downloads =
            match parse_or(&lookup, "MAX_CONCURRENT_DOWNLOADS", DEFAULT_CAPACITY) {
                0 => {
                    warn!("MAX_CONCURRENT_DOWNLOADS must be positive; using {DEFAULT_CAPACITY}");
                    DEFAULT_CAPACITY
                }
                n => n,
            };

        let allow_list = lookup("ALLOWED_DOMAINS")
            .map(|raw| AllowList::new(raw.split(',')))
            .filter(|list| !list.is_empty())
            .unwrap_or_default();

        Ok(Self {
            bot_token,
            max_concurrent_downloads,
            allow_list,
            transport: TransportConfig::from_lookup(&lookup),
            ytdlp: YtDlpConfig::from_lookup(&lookup),
            scratch_dir: lookup("SCRATCH_DIR")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

impl TransportConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            connect_timeout: secs_or(lookup, "CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT),
            read_timeout: secs_or(lookup, "READ_TIMEOUT_SECS", DEFAULT_READ_TIMEOUT),
            write_timeout: secs_or(lookup, "WRITE_TIMEOUT_SECS", DEFAULT_WRITE_TIMEOUT),
        }
    }

    /// Whole-request timeout: the client has one knob for both directions.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.read_timeout.max(self.write_timeout)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl YtDlpConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let extra_args = lookup("YTDLP_EXTRA_ARGS")
            .map(|raw| {
                shlex::split(&raw).unwrap_or_else(|| {
                    warn!("YTDLP_EXTRA_ARGS has unbalanced quotes; ignoring it");
                    Vec::new()
                })
            })
            .unwrap_or_default();

        Self {
            binary: lookup("YTDLP_PATH")
                .filter(|p| !p.trim().is_empty())
                .map_or_else(|| PathBuf::from("yt-dlp"), PathBuf::from),
            format: lookup("YTDLP_FORMAT")
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FORMAT.to_owned()),
            socket_timeout: secs_or(lookup, "SOCKET_TIMEOUT_SECS", DEFAULT_SOCKET_TIMEOUT),
            cookies_path: get_path(lookup, "YTDLP_COOKIES_PATH"),
            extra_args,
        }
    }

    /// Per-request extractor options.
    #[must_use]
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            format: self.format.clone(),
            socket_timeout: self.socket_timeout,
            ..ExtractOptions::default()
        }
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("max_concurrent_downloads", &self.max_concurrent_downloads)
            .field("allow_list", &self.allow_list)
            .field("transport", &self.transport)
            .field("ytdlp", &self.ytdlp)
            .field("scratch_dir", &self.scratch_dir)
            .finish()
    }
}

fn parse_or<T: FromStr + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "invalid value; using default");
            default
        }),
    }
}

fn secs_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    Duration::from_secs(parse_or(lookup, key, default.as_secs()))
}

fn get_path(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<PathBuf> {
    let path = lookup(key).map(PathBuf::from)?;
    if path.is_file() {
        Some(path)
    } else {
        warn!(key, path = %path.display(), "file does not exist; ignoring it");
        None
    }
}
