pub mod utils;

use crate::error::{Error, Result};
use regex::Regex;
use std::{fmt::Display, sync::OnceLock};
use url::Url;
use utils::{trim_link_punctuation, validate_non_empty};

/// Trait for validating platform-specific identifiers (e.g., URLs)
/// extracted from user input.
///
/// Implementors should:
/// - Check format.
/// - Return `Ok(canonical)` on success or `Err(Error::InvalidUrl)` on failure.
pub trait Validate {
    /// Validate the input and return the accepted string.
    fn validate(&self, input: &str) -> Result<String>;
}

const WEB_SCHEMES: &[&str] = &["http", "https"];

/// Scheme-qualified tokens inside free text.
fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z][A-Za-z0-9+.\-]*://\S+").expect("failed to compile link regex")
    })
}

/// Hosts the bot is willing to hand to the extractor.
///
/// A host matches when it equals a listed domain or is a subdomain of one.
/// Matching is case-insensitive; entries are normalized on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    domains: Vec<String>,
}

impl AllowList {
    pub const DEFAULT_DOMAINS: &'static [&'static str] = &[
        "youtube.com",
        "youtu.be",
        "tiktok.com",
        "instagram.com",
        "twitter.com",
        "x.com",
    ];

    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        for domain in domains {
            let domain = domain
                .as_ref()
                .trim()
                .trim_start_matches("*.")
                .trim_matches('.')
                .to_ascii_lowercase();
            if !domain.is_empty() && !normalized.contains(&domain) {
                normalized.push(domain);
            }
        }
        Self {
            domains: normalized,
        }
    }

    #[inline]
    #[must_use]
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Whether `raw` is a single well-formed web URL with an allow-listed host.
    ///
    /// Never fails: malformed, empty, scheme-less, non-http(s) input or text
    /// with embedded whitespace is simply not allowed.
    #[must_use]
    pub fn is_allowed(&self, raw: &str) -> bool {
        let Ok(trimmed) = validate_non_empty(raw) else {
            return false;
        };
        // `Url::parse` percent-encodes inner spaces instead of rejecting them.
        if trimmed.contains(char::is_whitespace) {
            return false;
        }
        let Ok(url) = Url::parse(trimmed) else {
            return false;
        };
        if !WEB_SCHEMES.contains(&url.scheme()) {
            return false;
        }
        url.host_str()
            .is_some_and(|host| self.matches_host(&host.to_ascii_lowercase()))
    }

    /// Exact or subdomain match against the list. `host` must be lower-case.
    #[must_use]
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.');
        self.domains.iter().any(|domain| {
            host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// First allow-listed link in a chat message.
    ///
    /// The returned string is the link exactly as the user typed it, minus
    /// surrounding punctuation; path and query are never rewritten.
    #[must_use]
    pub fn find_allowed(&self, text: &str) -> Option<String> {
        link_regex()
            .find_iter(text)
            .map(|m| trim_link_punctuation(m.as_str()))
            .find(|candidate| self.is_allowed(candidate))
            .map(ToOwned::to_owned)
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DOMAINS)
    }
}

impl Validate for AllowList {
    fn validate(&self, input: &str) -> Result<String> {
        self.find_allowed(input).ok_or(Error::InvalidUrl)
    }
}

impl Display for AllowList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.domains.join(", "))
    }
}
