//! Sort and filter attribute records.

use serde::{Deserialize, Serialize};

/// Name of the built-in manual-order sort; also the initial sort criterion.
pub const SORT_CUSTOM: &str = "Custom";
/// Name of the built-in newest-first sort.
pub const SORT_NEWEST: &str = "Newest";
/// Name of the built-in oldest-first sort.
pub const SORT_OLDEST: &str = "Oldest";
/// Name of the built-in sort by domain.
pub const SORT_DOMAIN: &str = "Domain";
/// Name of the built-in sort by title.
pub const SORT_NAME: &str = "Name";
/// Name of the built-in favourites filter.
pub const FILTER_FAVORITES: &str = "Favorites";

/// Which catalog an attribute belongs to.
///
/// Serialized as `"sort"` / `"filter"` under the JSON key `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Sort,
    Filter,
}

impl AttributeKind {
    /// The storage / wire spelling of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sort => "sort",
            Self::Filter => "filter",
        }
    }
}

impl std::str::FromStr for AttributeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sort" => Ok(Self::Sort),
            "filter" => Ok(Self::Filter),
            other => Err(format!("unknown attribute type '{other}'")),
        }
    }
}

/// A named sort or filter criterion.
///
/// Built-in attributes (`is_default == true`) are synthesized at load time and
/// never persisted. User attributes usually carry a `condition` expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Attribute {
    /// A built-in attribute with a stable synthetic id.
    pub(crate) fn builtin(id: &str, name: &str, kind: AttributeKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            is_default: true,
            condition: None,
        }
    }
}

/// The built-in catalog, in display order: sorts first, then the favourites filter.
pub fn builtin_attributes() -> Vec<Attribute> {
    vec![
        Attribute::builtin("builtin-sort-custom", SORT_CUSTOM, AttributeKind::Sort),
        Attribute::builtin("builtin-sort-newest", SORT_NEWEST, AttributeKind::Sort),
        Attribute::builtin("builtin-sort-oldest", SORT_OLDEST, AttributeKind::Sort),
        Attribute::builtin("builtin-sort-domain", SORT_DOMAIN, AttributeKind::Sort),
        Attribute::builtin("builtin-sort-name", SORT_NAME, AttributeKind::Sort),
        Attribute::builtin("1", FILTER_FAVORITES, AttributeKind::Filter),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_wire_format() {
        let attr = Attribute {
            id: "42".into(),
            name: "Docs".into(),
            kind: AttributeKind::Filter,
            is_default: false,
            condition: Some("item.url.includes(\"docs\")".into()),
        };
        let json = serde_json::to_string(&attr).unwrap();
        assert!(json.contains("\"type\":\"filter\""));
        assert!(!json.contains("isDefault"));

        let parsed: Attribute =
            serde_json::from_str(r#"{"id":"1","name":"Favorites","type":"filter","isDefault":true}"#)
                .unwrap();
        assert!(parsed.is_default);
        assert!(parsed.condition.is_none());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Sort".parse::<AttributeKind>().unwrap(), AttributeKind::Sort);
        assert_eq!("filter".parse::<AttributeKind>().unwrap(), AttributeKind::Filter);
        assert!("order".parse::<AttributeKind>().is_err());
    }
}
