use crate::extractor::ExtractionError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no supported link found")]
    InvalidUrl,

    #[error("extractor rejected {url}: {reason}")]
    UnsupportedOrRestrictedMedia { url: String, reason: String },

    #[error("extractor reported success but {} does not exist", path.display())]
    ProducedFileMissing { path: PathBuf },

    #[error("network failure during extraction: {0}")]
    Network(String),

    #[error("extractor failed: {0}")]
    Extractor(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("teloxide error: {0}")]
    Teloxide(#[from] teloxide::RequestError),

    #[error("join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("concurrency gate closed")]
    GateClosed(#[from] tokio::sync::AcquireError),

    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),
}

/// Failure classes surfaced to the conversation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidUrl,
    UnsupportedOrRestrictedMedia,
    ProducedFileMissing,
    Unexpected,
}

pub const INVALID_URL_MESSAGE: &str = "This doesn't look like a supported link.";
pub const RESTRICTED_MESSAGE: &str =
    "Couldn't download this video. It may be private, age- or region-restricted, or removed.";
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while preparing the video. Please try again later.";

impl Error {
    /// Attach the requested URL to a collaborator failure.
    pub fn from_extraction(url: &str, err: ExtractionError) -> Self {
        match err {
            ExtractionError::Rejected(reason) => Self::UnsupportedOrRestrictedMedia {
                url: url.to_owned(),
                reason,
            },
            ExtractionError::Network(reason) => Self::Network(reason),
            ExtractionError::Failed(reason) => Self::Extractor(reason),
            ExtractionError::Io(err) => Self::Io(err),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl => ErrorKind::InvalidUrl,
            Self::UnsupportedOrRestrictedMedia { .. } => ErrorKind::UnsupportedOrRestrictedMedia,
            Self::ProducedFileMissing { .. } => ErrorKind::ProducedFileMissing,
            _ => ErrorKind::Unexpected,
        }
    }

    /// Short label naming the failure class, safe to show to users.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid link",
            Self::UnsupportedOrRestrictedMedia { .. } => "restricted media",
            Self::ProducedFileMissing { .. } => "missing output",
            Self::Network(_) => "network",
            Self::Extractor(_) => "extractor",
            Self::Io(_) => "io",
            Self::Teloxide(_) => "upload",
            Self::Join(_) | Self::GateClosed(_) => "internal",
            Self::MissingConfig(_) => "configuration",
        }
    }

    /// Message for the chat. Never includes paths or collaborator output.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::InvalidUrl => INVALID_URL_MESSAGE.to_owned(),
            ErrorKind::UnsupportedOrRestrictedMedia => RESTRICTED_MESSAGE.to_owned(),
            ErrorKind::ProducedFileMissing => GENERIC_FAILURE_MESSAGE.to_owned(),
            ErrorKind::Unexpected => format!(
                "Failed to fetch the video ({} error). Please try again later.",
                self.category()
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
