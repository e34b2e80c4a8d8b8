//! Conversions between link records and Rhai values.

use crate::LinkItem;
use rhai::{Dynamic, Map};
use std::cmp::Ordering;

/// Converts a [`LinkItem`] into the Rhai map that rule conditions see.
///
/// Keys use the same camelCase spelling as the JSON form of a link, so a
/// condition reads `item.isFavorite` or `a.thumbnailUrl`.
pub(crate) fn link_to_dynamic(link: &LinkItem) -> Dynamic {
    let mut map = Map::new();
    map.insert("id".into(), Dynamic::from(link.id.clone()));
    map.insert("url".into(), Dynamic::from(link.url.clone()));
    map.insert("title".into(), Dynamic::from(link.title.clone()));
    map.insert("domain".into(), Dynamic::from(link.domain.clone()));
    map.insert("isFavorite".into(), Dynamic::from(link.is_favorite));
    map.insert(
        "thumbnailUrl".into(),
        link.thumbnail_url
            .clone()
            .map_or(Dynamic::UNIT, Dynamic::from),
    );
    map.insert("order".into(), Dynamic::from(link.order));
    Dynamic::from(map)
}

/// Interprets the result of a sort condition.
///
/// Numbers order by sign; `true` means "greater", `false` means "equal".
pub(super) fn dynamic_to_ordering(value: &Dynamic) -> Result<Ordering, String> {
    if let Ok(n) = value.as_int() {
        return Ok(n.cmp(&0));
    }
    if let Ok(f) = value.as_float() {
        return f
            .partial_cmp(&0.0)
            .ok_or_else(|| "sort condition returned NaN".to_string());
    }
    if let Ok(b) = value.as_bool() {
        return Ok(if b { Ordering::Greater } else { Ordering::Equal });
    }
    Err(format!("sort condition must return a number, got {}", value.type_name()))
}

/// Interprets the result of a filter condition as a boolean.
pub(super) fn dynamic_truthy(value: Dynamic) -> bool {
    if let Ok(b) = value.as_bool() {
        return b;
    }
    if let Ok(n) = value.as_int() {
        return n != 0;
    }
    if let Ok(f) = value.as_float() {
        return f != 0.0 && !f.is_nan();
    }
    if value.is_unit() {
        return false;
    }
    if value.is_string() {
        return value.into_string().map(|s| !s.is_empty()).unwrap_or(false);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_map_has_camel_case_keys() {
        let link = LinkItem::new("7".into(), "https://a.com", "A", None, 2).unwrap();
        let map = link_to_dynamic(&link).cast::<Map>();
        assert_eq!(map["isFavorite"].as_bool().unwrap(), false);
        assert!(map["thumbnailUrl"].is_unit());
        assert_eq!(map["order"].as_int().unwrap(), 2);
        assert_eq!(map["domain"].clone().into_string().unwrap(), "a.com");
    }

    #[test]
    fn test_ordering_from_values() {
        assert_eq!(dynamic_to_ordering(&Dynamic::from(-3_i64)).unwrap(), Ordering::Less);
        assert_eq!(dynamic_to_ordering(&Dynamic::from(0.5_f64)).unwrap(), Ordering::Greater);
        assert_eq!(dynamic_to_ordering(&Dynamic::from(false)).unwrap(), Ordering::Equal);
        assert!(dynamic_to_ordering(&Dynamic::from("x".to_string())).is_err());
    }

    #[test]
    fn test_truthiness() {
        assert!(dynamic_truthy(Dynamic::from(true)));
        assert!(!dynamic_truthy(Dynamic::from(0_i64)));
        assert!(!dynamic_truthy(Dynamic::UNIT));
        assert!(!dynamic_truthy(Dynamic::from(String::new())));
        assert!(dynamic_truthy(Dynamic::from("yes".to_string())));
    }
}
