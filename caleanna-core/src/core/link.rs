//! Link records and URL helpers.

use crate::{CaleannaError, Result};
use serde::{Deserialize, Serialize};

/// One stored bookmark.
///
/// `order` is the manual (drag-and-drop) rank inside its workspace; values need
/// not be contiguous, only their relative ranking matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkItem {
    pub id: String,
    pub url: String,
    pub title: String,
    pub domain: String,
    pub is_favorite: bool,
    pub thumbnail_url: Option<String>,
    pub order: i64,
}

/// Fields a user may change when editing an existing link.
///
/// `None` leaves the corresponding field untouched. `thumbnail_url: Some(None)`
/// clears the thumbnail.
#[derive(Debug, Clone, Default)]
pub struct LinkEdit {
    pub url: Option<String>,
    pub title: Option<String>,
    pub thumbnail_url: Option<Option<String>>,
}

impl LinkItem {
    /// Builds a new link, normalising `url` and deriving `domain` from its host.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::InvalidUrl`] if the URL has no parseable host.
    pub fn new(
        id: String,
        url: &str,
        title: &str,
        thumbnail_url: Option<String>,
        order: i64,
    ) -> Result<Self> {
        let url = normalize_url(url);
        let domain = derive_domain(&url)?;
        Ok(Self {
            id,
            url,
            title: title.trim().to_string(),
            domain,
            is_favorite: false,
            thumbnail_url,
            order,
        })
    }

    /// Applies `edit`, re-deriving `domain` only when the URL actually changes.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::InvalidUrl`] if the new URL has no parseable host;
    /// `self` is left unchanged in that case.
    pub fn apply_edit(&mut self, edit: LinkEdit) -> Result<()> {
        if let Some(url) = edit.url {
            let url = normalize_url(&url);
            if url != self.url {
                self.domain = derive_domain(&url)?;
                self.url = url;
            }
        }
        if let Some(title) = edit.title {
            self.title = title.trim().to_string();
        }
        if let Some(thumbnail_url) = edit.thumbnail_url {
            self.thumbnail_url = thumbnail_url;
        }
        Ok(())
    }

    /// Numeric value of the creation-token id, if it is one.
    pub fn numeric_id(&self) -> Option<f64> {
        self.id.parse::<f64>().ok().filter(|n| n.is_finite())
    }
}

/// Adds a scheme when the user omitted one.
///
/// `example.com` becomes `https://example.com`, and the `https:example.com`
/// shorthand gains its missing `//`.
pub fn normalize_url(input: &str) -> String {
    let input = input.trim();
    for scheme in ["https:", "http:"] {
        if let Some(rest) = input.strip_prefix(scheme) {
            if rest.starts_with("//") {
                return input.to_string();
            }
            return format!("{scheme}//{rest}");
        }
    }
    format!("https://{input}")
}

/// Returns the host component of `url`.
///
/// # Errors
///
/// Returns [`CaleannaError::InvalidUrl`] when `url` does not parse or has no host.
pub fn derive_domain(url: &str) -> Result<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .ok_or_else(|| CaleannaError::InvalidUrl(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_link_derives_domain() {
        let link = LinkItem::new("1".into(), "https://www.google.com/search?q=x", " Google ", None, 0)
            .unwrap();
        assert_eq!(link.domain, "www.google.com");
        assert_eq!(link.title, "Google");
        assert!(!link.is_favorite);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("https:example.com"), "https://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("  https://a.io/x "), "https://a.io/x");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = LinkItem::new("1".into(), "https://", "x", None, 0);
        assert!(matches!(result, Err(CaleannaError::InvalidUrl(_))));
    }

    #[test]
    fn test_edit_keeps_domain_when_url_unchanged() {
        let mut link = LinkItem::new("1".into(), "https://a.com", "A", None, 0).unwrap();
        link.domain = "custom".to_string();
        link.apply_edit(LinkEdit {
            url: Some("https://a.com".into()),
            title: Some("B".into()),
            thumbnail_url: None,
        })
        .unwrap();
        assert_eq!(link.domain, "custom");
        assert_eq!(link.title, "B");

        link.apply_edit(LinkEdit { url: Some("b.org".into()), ..Default::default() }).unwrap();
        assert_eq!(link.domain, "b.org");
        assert_eq!(link.url, "https://b.org");
    }

    #[test]
    fn test_serializes_camel_case() {
        let link = LinkItem::new("1".into(), "https://a.com", "A", Some("t.png".into()), 3).unwrap();
        let json = serde_json::to_string(&link).unwrap();
        assert!(json.contains("\"isFavorite\":false"));
        assert!(json.contains("\"thumbnailUrl\":\"t.png\""));
        assert!(json.contains("\"order\":3"));
    }
}
