//! Search URL construction and link resolution against the platform origin.

use url::Url;

/// Build the platform search URL for a company name.
///
/// The name is percent-encoded as-is: spaces become `%20`, non-ASCII
/// characters are escaped as UTF-8 bytes.
pub fn build_search_url(base_url: &str, company: &str) -> String {
    format!(
        "{}/search?q={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(company)
    )
}

/// Resolve a link found in the markup to an absolute URL.
///
/// Absolute links pass through untouched; anything else is joined to the
/// platform origin. Returns `None` for empty or unparseable input.
pub fn absolutize(base_url: &str, link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    if let Ok(abs) = Url::parse(link) {
        if abs.has_host() {
            return Some(abs.to_string());
        }
    }
    let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/'))).ok()?;
    let relative = if link.starts_with('/') {
        link.to_string()
    } else {
        format!("/{link}")
    };
    base.join(&relative).ok().map(|u| u.to_string())
}
