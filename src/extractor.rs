use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Container the extractor is asked to merge separate streams into.
pub const OUTPUT_CONTAINER: &str = "mp4";

pub const DEFAULT_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
);
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Classified failure reported by an extraction collaborator.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The source refused: private, geo-blocked, deleted, unsupported.
    #[error("source rejected: {0}")]
    Rejected(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("extractor failed: {0}")]
    Failed(String),

    #[error("could not run extractor: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the collaborator needs for a single download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub format: String,
    /// Never expand playlists: one URL yields one media item.
    pub single_item: bool,
    pub container: &'static str,
    pub socket_timeout: Duration,
    pub headers: Vec<(String, String)>,
}

/// Request options shared by every download.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub format: String,
    pub socket_timeout: Duration,
    pub headers: Vec<(String, String)>,
}

impl ExtractOptions {
    #[must_use]
    pub fn request(&self, url: &str, output_dir: &Path) -> ExtractionRequest {
        ExtractionRequest {
            url: url.to_owned(),
            output_dir: output_dir.to_path_buf(),
            format: self.format.clone(),
            single_item: true,
            container: OUTPUT_CONTAINER,
            socket_timeout: self.socket_timeout,
            headers: self.headers.clone(),
        }
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT.into(),
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            headers: vec![
                ("User-Agent".into(), DEFAULT_USER_AGENT.into()),
                ("Accept-Language".into(), DEFAULT_ACCEPT_LANGUAGE.into()),
            ],
        }
    }
}

/// External media extraction library.
///
/// `extract` blocks for the whole download; callers must run it off the
/// async executor. On success it returns the path the collaborator believes
/// it wrote, which may not exist if its merge step silently failed.
pub trait Extractor: Send + Sync + 'static {
    /// # Errors
    ///
    /// Returns a classified [`ExtractionError`] when the download fails.
    fn extract(&self, request: &ExtractionRequest) -> Result<PathBuf, ExtractionError>;
}
