//! The in-memory catalog of sort and filter attributes for one workspace.

use crate::core::attribute::builtin_attributes;
use crate::{Attribute, AttributeKind, CaleannaError, Result};

/// Built-in attributes followed by the workspace's user-defined ones.
///
/// The registry never touches storage. Callers persist
/// [`user_attributes`](Self::user_attributes) after a mutation.
#[derive(Debug, Clone)]
pub struct AttributeRegistry {
    builtins: Vec<Attribute>,
    user: Vec<Attribute>,
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self::load(Vec::new())
    }
}

impl AttributeRegistry {
    /// Builds the catalog from persisted records.
    ///
    /// Persisted records marked default are dropped so a stray built-in copy in
    /// storage never shows up twice.
    pub fn load(persisted: Vec<Attribute>) -> Self {
        let user = persisted.into_iter().filter(|a| !a.is_default).collect();
        Self { builtins: builtin_attributes(), user }
    }

    /// The effective catalog for one kind: built-ins first, then user attributes.
    pub fn catalog(&self, kind: AttributeKind) -> Vec<&Attribute> {
        self.all().filter(|a| a.kind == kind).collect()
    }

    /// Every attribute, built-ins first.
    pub fn all(&self) -> impl Iterator<Item = &Attribute> {
        self.builtins.iter().chain(self.user.iter())
    }

    /// Finds the first attribute of `kind` called `name`.
    pub fn find(&self, name: &str, kind: AttributeKind) -> Option<&Attribute> {
        self.all().find(|a| a.kind == kind && a.name == name)
    }

    pub fn get(&self, id: &str) -> Option<&Attribute> {
        self.all().find(|a| a.id == id)
    }

    /// The attributes that belong in storage.
    pub fn user_attributes(&self) -> &[Attribute] {
        &self.user
    }

    /// Appends a user attribute and returns a copy of it.
    ///
    /// Blank conditions are stored as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::ValidationFailed`] when `name` is blank, or when
    /// the id or the name (within `kind`) is already taken.
    pub fn add(
        &mut self,
        id: String,
        name: &str,
        kind: AttributeKind,
        condition: Option<&str>,
    ) -> Result<Attribute> {
        let attribute = Self::build(id, name, kind, condition)?;
        if self.get(&attribute.id).is_some() {
            return Err(CaleannaError::ValidationFailed(format!(
                "Attribute id '{}' is already in use",
                attribute.id
            )));
        }
        if self.find(&attribute.name, kind).is_some() {
            return Err(CaleannaError::ValidationFailed(format!(
                "A {} attribute named '{}' already exists",
                kind.as_str(),
                attribute.name
            )));
        }
        self.user.push(attribute.clone());
        Ok(attribute)
    }

    /// Validates and builds a user attribute without adding it.
    fn build(
        id: String,
        name: &str,
        kind: AttributeKind,
        condition: Option<&str>,
    ) -> Result<Attribute> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CaleannaError::ValidationFailed(
                "Attribute name cannot be empty".to_string(),
            ));
        }
        let condition = condition
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        Ok(Attribute { id, name: name.to_string(), kind, is_default: false, condition })
    }

    /// Removes a user attribute. Built-ins and unknown ids are left alone and
    /// report `false`.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.user.len();
        self.user.retain(|a| a.id != id);
        self.user.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attribute::{FILTER_FAVORITES, SORT_CUSTOM};

    fn user(id: &str, name: &str, kind: AttributeKind) -> Attribute {
        Attribute {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            is_default: false,
            condition: Some("true".to_string()),
        }
    }

    #[test]
    fn test_favorites_always_leads_filter_catalog() {
        let mut stray = Attribute::builtin("1", FILTER_FAVORITES, AttributeKind::Filter);
        stray.is_default = true;
        let registry = AttributeRegistry::load(vec![
            user("10", "Docs", AttributeKind::Filter),
            stray,
            user("11", "Alpha", AttributeKind::Sort),
        ]);

        let filters: Vec<&str> = registry
            .catalog(AttributeKind::Filter)
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(filters, vec!["Favorites", "Docs"]);

        let sorts = registry.catalog(AttributeKind::Sort);
        assert_eq!(sorts[0].name, SORT_CUSTOM);
        assert_eq!(sorts.last().unwrap().name, "Alpha");
    }

    #[test]
    fn test_add_trims_and_drops_blank_condition() {
        let mut registry = AttributeRegistry::default();
        let added = registry
            .add("20".into(), "  Mine ", AttributeKind::Filter, Some("   "))
            .unwrap();
        assert_eq!(added.name, "Mine");
        assert!(added.condition.is_none());
        assert_eq!(registry.user_attributes().len(), 1);
        assert!(registry.find("Mine", AttributeKind::Filter).is_some());
        assert!(registry.find("Mine", AttributeKind::Sort).is_none());
    }

    #[test]
    fn test_add_rejects_blank_name_and_duplicate_id() {
        let mut registry = AttributeRegistry::default();
        assert!(matches!(
            registry.add("20".into(), " ", AttributeKind::Sort, None),
            Err(CaleannaError::ValidationFailed(_))
        ));
        registry.add("20".into(), "A", AttributeKind::Sort, None).unwrap();
        assert!(registry.add("20".into(), "B", AttributeKind::Sort, None).is_err());
        // Built-in ids are reserved too.
        assert!(registry.add("1".into(), "C", AttributeKind::Filter, None).is_err());
        assert!(registry.add("21".into(), "Favorites", AttributeKind::Filter, None).is_err());
        assert!(registry.add("22".into(), "A", AttributeKind::Filter, None).is_ok());
    }

    #[test]
    fn test_builtins_cannot_be_deleted() {
        let mut registry = AttributeRegistry::load(vec![user("30", "Docs", AttributeKind::Filter)]);
        assert!(!registry.delete("1"));
        assert!(!registry.delete("builtin-sort-custom"));
        assert!(!registry.delete("missing"));
        assert!(registry.delete("30"));
        assert!(registry.user_attributes().is_empty());
        assert_eq!(registry.catalog(AttributeKind::Filter).len(), 1);
    }
}
