//! Error types for fetching pages.
//!
//! [`ContentExtractor`](crate::ContentExtractor) never hands these to its
//! callers. Each one is folded into a bounded `[Error: ...]` marker so a
//! batch of scrapes keeps going when one site misbehaves.

use std::net::IpAddr;

use thiserror::Error;

/// Why a page or robots.txt could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL was refused before any request went out.
    #[error("URL rejected: {0}")]
    Rejected(#[from] SecurityError),

    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("too many redirects from {url}")]
    TooManyRedirects { url: String },
}

/// Reasons [`UrlValidator`](crate::UrlValidator) refuses a URL.
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("scheme `{0}` is not http(s)")]
    Scheme(String),

    #[error("host `{0}` is internal")]
    InternalHost(String),

    #[error("address {0} is private or loopback")]
    PrivateAddress(IpAddr),

    #[error("host `{host}` resolves to private address {address}")]
    ResolvesPrivate { host: String, address: IpAddr },

    #[error("could not resolve `{host}`: {reason}")]
    Resolution { host: String, reason: String },

    #[error("URL has no host")]
    MissingHost,

    #[error("malformed URL: {0}")]
    Malformed(#[from] url::ParseError),
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
