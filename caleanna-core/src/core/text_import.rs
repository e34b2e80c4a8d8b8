//! Plain-text bulk link import.
//!
//! The format is line based:
//!
//! ```text
//! # comment
//! https://google.com/ Google
//! https://youtube.com/ Youtube +
//! https:example.com Example
//! https:youtube.com/watch?v=
//!   lg5WKsVnEA4 'Michael Rosen - Nice'
//!   a1KBb9mTgck Anpanman's March +
//! ```
//!
//! A trailing `+` marks a favourite. A URL on its own line becomes a prefix for
//! the indented lines that follow it, each of which starts with the suffix.

/// One link parsed from the text, before it gets an id and order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLink {
    pub url: String,
    pub title: String,
    pub is_favorite: bool,
}

/// Parses `text` into links. Lines that are neither a URL line nor a
/// continuation of a URL prefix are skipped.
pub fn parse_links(text: &str) -> Vec<ParsedLink> {
    let mut links = Vec::new();
    let mut prefix: Option<String> = None;

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut words: Vec<&str> = line.split_whitespace().collect();
        let is_favorite = words.len() > 1 && words.last() == Some(&"+");
        if is_favorite {
            words.pop();
        }
        let (head, rest) = match words.split_first() {
            Some((head, rest)) => (*head, rest),
            None => continue,
        };

        if is_url_start(head) {
            if rest.is_empty() && !is_favorite {
                prefix = Some(head.to_string());
                continue;
            }
            prefix = None;
            links.push(ParsedLink {
                url: head.to_string(),
                title: title_or(rest, head),
                is_favorite,
            });
        } else if let Some(prefix) = &prefix {
            let url = format!("{prefix}{head}");
            let title = title_or(rest, &url);
            links.push(ParsedLink { url, title, is_favorite });
        } else {
            log::debug!("skipping line {}: not a link", number + 1);
        }
    }
    links
}

fn is_url_start(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    lower.starts_with("http:") || lower.starts_with("https:")
}

/// Joins the title words and strips one pair of surrounding quotes.
fn title_or(words: &[&str], fallback: &str) -> String {
    let joined = words.join(" ");
    let title = ['\'', '"']
        .iter()
        .find_map(|q| {
            joined
                .strip_prefix(*q)
                .and_then(|t| t.strip_suffix(*q))
        })
        .unwrap_or(joined.as_str())
        .trim();
    if title.is_empty() {
        fallback.to_string()
    } else {
        title.to_string()
    }
}
