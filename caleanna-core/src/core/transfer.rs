//! Workspace transfer tokens.
//!
//! A token is the JSON form of a [`WorkspaceSnapshot`] encoded as URL-safe
//! base64, so it can travel as the last path segment of an import URL:
//!
//! ```text
//! http://localhost:3000/workspace/new/eyJ3b3Jrc3BhY2UiOnsiaWQiOi...
//! ```
//!
//! Export always mints a fresh workspace identity so the receiving side never
//! collides with the source workspace.

use crate::{Attribute, CaleannaError, LinkItem, Result, Workspace, WorkspaceSnapshot};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use url::Url;

/// Path under the share origin that accepts an import token.
pub const IMPORT_ROUTE: [&str; 2] = ["workspace", "new"];

/// Length of the generated workspace name.
pub const GENERATED_NAME_LEN: usize = 13;

const NAME_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Top-level keys a token's JSON object must carry.
const REQUIRED_KEYS: [&str; 3] = ["workspace", "links", "attributes"];

/// Builds the snapshot a token carries: a new workspace identity derived from
/// `timestamp_millis`, the given links, and the user-defined attributes.
pub fn build_envelope(
    links: &[LinkItem],
    attributes: &[Attribute],
    timestamp_millis: i64,
) -> WorkspaceSnapshot {
    let seed = u64::try_from(timestamp_millis).unwrap_or_default();
    WorkspaceSnapshot {
        workspace: Workspace::new(
            timestamp_millis.to_string(),
            random_name(seed, GENERATED_NAME_LEN),
        ),
        links: links.to_vec(),
        attributes: attributes.iter().filter(|a| !a.is_default).cloned().collect(),
    }
}

/// Serializes a snapshot into a token.
///
/// # Errors
///
/// Returns [`CaleannaError::Json`] if serialization fails.
pub fn encode_token(snapshot: &WorkspaceSnapshot) -> Result<String> {
    let json = serde_json::to_string(snapshot)?;
    Ok(URL_SAFE_NO_PAD.encode(json.as_bytes()))
}

/// Builds the full import URL for `token` under `base_url`.
///
/// # Errors
///
/// Returns [`CaleannaError::InvalidUrl`] when `base_url` is not an absolute
/// URL that can carry a path.
pub fn export_url(base_url: &str, token: &str) -> Result<String> {
    let mut url = Url::parse(base_url).map_err(|_| CaleannaError::InvalidUrl(base_url.to_string()))?;
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| CaleannaError::InvalidUrl(base_url.to_string()))?
        .pop_if_empty()
        .extend(IMPORT_ROUTE)
        .push(token);
    Ok(url.into())
}

/// Pulls the token out of a bare token, a path, or a full import URL.
///
/// The trailing non-empty path segment is taken and percent-decoded when the
/// transport left it encoded.
///
/// # Errors
///
/// Returns [`CaleannaError::InvalidImportPayload`] when no segment is left.
pub fn extract_token(input: &str) -> Result<String> {
    let input = input.trim();
    let segment = match Url::parse(input) {
        Ok(url) if url.has_host() => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        _ => input
            .split(['?', '#'])
            .next()
            .and_then(|path| path.split('/').filter(|s| !s.is_empty()).last())
            .map(str::to_string),
    }
    .ok_or_else(|| CaleannaError::InvalidImportPayload("no token found in input".to_string()))?;

    if segment.contains('%') {
        urlencoding::decode(&segment)
            .map(|s| s.into_owned())
            .map_err(|e| CaleannaError::InvalidImportPayload(format!("bad percent-encoding: {e}")))
    } else {
        Ok(segment)
    }
}

/// Decodes and validates a token (or anything [`extract_token`] accepts).
///
/// # Errors
///
/// Returns [`CaleannaError::InvalidImportPayload`] describing the first
/// decode, parse or structural problem found.
pub fn decode_token(input: &str) -> Result<WorkspaceSnapshot> {
    let input = input.trim();
    // Standard base64 may contain '/', so a bare token is tried whole before
    // it is treated as a path.
    if !input.contains("://") {
        if let Ok(snapshot) = decode_payload(input) {
            return Ok(snapshot);
        }
    }
    decode_payload(&extract_token(input)?)
}

fn decode_payload(token: &str) -> Result<WorkspaceSnapshot> {
    let bytes = decode_base64(token)?;
    let text = String::from_utf8(bytes)
        .map_err(|_| CaleannaError::InvalidImportPayload("token is not UTF-8 text".to_string()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| CaleannaError::InvalidImportPayload(format!("token is not JSON: {e}")))?;

    let object = value.as_object().ok_or_else(|| {
        CaleannaError::InvalidImportPayload("token does not hold a JSON object".to_string())
    })?;
    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| object.get(*key).map_or(true, serde_json::Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(CaleannaError::InvalidImportPayload(format!(
            "missing {}",
            missing.join(", ")
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| CaleannaError::InvalidImportPayload(format!("invalid workspace data: {e}")))
}

/// URL-safe first, then the standard alphabet used by older exporters.
fn decode_base64(token: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(token)
        .or_else(|_| URL_SAFE.decode(token))
        .or_else(|_| STANDARD.decode(token))
        .or_else(|_| STANDARD_NO_PAD.decode(token))
        .map_err(|e| CaleannaError::InvalidImportPayload(format!("token is not base64: {e}")))
}

/// A deterministic alphanumeric label. Not a secret: the same seed always
/// yields the same name.
pub fn random_name(seed: u64, len: usize) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| char::from(NAME_CHARSET[rng.random_range(0..NAME_CHARSET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeKind;

    fn sample_links() -> Vec<LinkItem> {
        let mut first = LinkItem::new("1700000000000".into(), "https://google.com", "Google", None, 0).unwrap();
        first.is_favorite = true;
        let second = LinkItem::new(
            "1700000000001".into(),
            "https://example.org/ünïcode?q=1",
            "Ünïcode title",
            Some("https://example.org/thumb.png".into()),
            1,
        )
        .unwrap();
        vec![first, second]
    }

    fn sample_attributes() -> Vec<Attribute> {
        vec![
            Attribute::builtin("1", "Favorites", AttributeKind::Filter),
            Attribute {
                id: "42".into(),
                name: "Docs".into(),
                kind: AttributeKind::Filter,
                is_default: false,
                condition: Some(r#"item.url.includes("docs")"#.into()),
            },
        ]
    }

    #[test]
    fn test_envelope_mints_new_identity_and_skips_builtins() {
        let snapshot = build_envelope(&sample_links(), &sample_attributes(), 1_725_000_000_123);
        assert_eq!(snapshot.workspace.id, "1725000000123");
        assert_eq!(snapshot.workspace.name.len(), GENERATED_NAME_LEN);
        assert!(snapshot.workspace.name.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(snapshot.attributes.len(), 1);
        assert_eq!(snapshot.attributes[0].name, "Docs");
    }

    #[test]
    fn test_random_name_is_seeded() {
        assert_eq!(random_name(7, 13), random_name(7, 13));
        assert_ne!(random_name(7, 13), random_name(8, 13));
    }

    #[test]
    fn test_token_round_trip_through_url() {
        let snapshot = build_envelope(&sample_links(), &sample_attributes(), 1_725_000_000_123);
        let token = encode_token(&snapshot).unwrap();
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        let url = export_url("https://links.example.com/", &token).unwrap();
        assert_eq!(url, format!("https://links.example.com/workspace/new/{token}"));

        assert_eq!(decode_token(&url).unwrap(), snapshot);
        assert_eq!(decode_token(&token).unwrap(), snapshot);
        assert_eq!(decode_token(&format!("/workspace/new/{token}")).unwrap(), snapshot);
    }

    #[test]
    fn test_legacy_standard_base64_with_percent_encoding() {
        let json = r#"{"workspace":{"id":"5","name":"Old"},"links":[],"attributes":[]}"#;
        let legacy = STANDARD.encode(json);
        let encoded = urlencoding::encode(&legacy).into_owned();
        let snapshot = decode_token(&format!("http://localhost:3000/workspace/new/{encoded}")).unwrap();
        assert_eq!(snapshot.workspace.name, "Old");
        assert!(snapshot.links.is_empty());
    }

    #[test]
    fn test_bare_standard_base64_token_with_slash() {
        let json = r#"{"workspace":{"id":"5","name":"Old??"},"links":[],"attributes":[]}"#;
        let legacy = STANDARD.encode(json);
        assert!(legacy.contains('/'));
        assert_eq!(decode_token(&legacy).unwrap().workspace.name, "Old??");
        assert_eq!(decode_token(&format!("  {legacy}\n")).unwrap().workspace.id, "5");
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let cases = [
            "this is not a token!!".to_string(),
            URL_SAFE_NO_PAD.encode("plain text"),
            URL_SAFE_NO_PAD.encode("[1,2,3]"),
            URL_SAFE_NO_PAD.encode(r#"{"workspace":{"id":"1","name":"x"},"links":[]}"#),
            URL_SAFE_NO_PAD.encode(r#"{"workspace":{"id":"1","name":"x"},"links":[{"id":3}],"attributes":[]}"#),
            URL_SAFE_NO_PAD.encode([0xff_u8, 0xfe, 0x00]),
            "   ".to_string(),
        ];
        for case in cases {
            assert!(
                matches!(decode_token(&case), Err(CaleannaError::InvalidImportPayload(_))),
                "accepted {case:?}"
            );
        }
    }

    #[test]
    fn test_export_url_rejects_non_base_urls() {
        assert!(export_url("not a url", "abc").is_err());
        assert!(export_url("mailto:someone@example.com", "abc").is_err());
    }
}
