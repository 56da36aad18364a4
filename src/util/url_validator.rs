use thiserror::Error;
use url::Url;

/// Errors that can occur during bookmark URL validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlValidationError {
    /// The URL field was empty or whitespace.
    #[error("URL is required")]
    Empty,
    /// The URL string could not be parsed as an absolute URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host to display or open.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a URL string entered for a new bookmark.
///
/// Accepts absolute `http`/`https` URLs that name a host. Surrounding
/// whitespace is ignored; relative references (`example.com/page`, `/path`)
/// are rejected because `Url::parse` requires a scheme.
///
/// Unlike a fetcher, a bookmark manager has no reason to refuse localhost or
/// private addresses: intranet links are legitimate bookmarks.
///
/// # Examples
///
/// ```
/// use smartmarks::util::validate_bookmark_url;
///
/// let url = validate_bookmark_url("https://go.dev").unwrap();
/// assert_eq!(url.host_str(), Some("go.dev"));
///
/// assert!(validate_bookmark_url("go.dev").is_err());
/// assert!(validate_bookmark_url("javascript:alert(1)").is_err());
/// ```
pub fn validate_bookmark_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlValidationError::Empty);
    }

    let url = Url::parse(trimmed)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlValidationError::MissingHost),
    }
}

/// Re-validates a stored URL before handing it to the OS opener.
///
/// Stored rows can be written by any session (or by hand), so the URL is
/// checked again at the point where it leaves the process.
pub fn validate_url_for_open(url_str: &str) -> Result<Url, String> {
    validate_bookmark_url(url_str).map_err(|e| format!("Refusing to open URL: {}", e))
}

/// Host part of a bookmark URL for display ("https://www.rust-lang.org/learn" → "www.rust-lang.org").
///
/// Returns `None` for URLs that do not parse.
pub fn bookmark_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
}
