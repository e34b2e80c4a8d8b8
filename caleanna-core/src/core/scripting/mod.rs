//! Rhai-based rule engine for sort and filter attributes.
//!
//! [`RuleEngine`] owns a sandboxed Rhai [`Engine`] and compiles attributes into
//! [`SortRule`]s and [`FilterRule`]s. User conditions are compiled as single
//! expressions: no statements, loops or function definitions, and only the
//! implicit records (`item` for filters, `a` and `b` for sorts) are in scope.
//!
//! A rule that fails to compile or evaluate never surfaces as an error to the
//! ordering pipeline. It is logged and degrades to a no-op sort or a filter
//! that keeps everything.

mod record;

pub(crate) use record::link_to_dynamic;

use crate::core::attribute::{
    FILTER_FAVORITES, SORT_CUSTOM, SORT_DOMAIN, SORT_NAME, SORT_NEWEST, SORT_OLDEST,
};
use crate::core::ordering::{compare_numeric_ids, locale_compare};
use crate::{Attribute, AttributeKind, CaleannaError, LinkItem, Result};
use record::{dynamic_to_ordering, dynamic_truthy};
use rhai::{Dynamic, Engine, Scope, AST};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const MAX_OPERATIONS: u64 = 50_000;
const MAX_STRING_SIZE: usize = 64 * 1024;
const MAX_COLLECTION_SIZE: usize = 1024;

/// A non-fatal problem with a user rule, reported next to a successful result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDiagnostic {
    /// Name of the attribute whose condition is broken.
    pub attribute: String,
    pub message: String,
}

/// A compiled sort criterion.
#[derive(Debug, Clone)]
pub enum SortRule {
    /// Ascending by the stored manual `order`.
    Custom,
    /// Descending by numeric id (most recently created first).
    Newest,
    /// Ascending by numeric id.
    Oldest,
    Domain,
    Name,
    /// A user condition over `a` and `b`.
    Script { name: String, ast: AST },
    /// Leaves the incoming order untouched.
    Noop,
}

/// A compiled filter criterion.
#[derive(Debug, Clone)]
pub enum FilterRule {
    Favorites,
    /// A user condition over `item`.
    Script { name: String, ast: AST },
    /// Keeps every link.
    AlwaysTrue,
}

/// Owns the sandboxed Rhai engine used to evaluate user conditions.
#[derive(Debug)]
pub struct RuleEngine {
    engine: Engine,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine
            .set_strict_variables(true)
            .set_max_operations(MAX_OPERATIONS)
            .set_max_expr_depths(64, 32)
            .set_max_call_levels(16)
            .set_max_string_size(MAX_STRING_SIZE)
            .set_max_array_size(MAX_COLLECTION_SIZE)
            .set_max_map_size(MAX_COLLECTION_SIZE);
        engine.disable_symbol("eval");
        engine.on_print(|_| {});
        engine.on_debug(|_, _, _| {});

        // Helpers so conditions read naturally: `item.url.includes("docs")`,
        // `a.title.localeCompare(b.title)`.
        engine.register_fn("includes", |text: &str, needle: &str| text.contains(needle));
        engine.register_fn("localeCompare", |a: &str, b: &str| ordering_to_int(locale_compare(a, b)));
        engine.register_fn("compare", |a: &str, b: &str| ordering_to_int(locale_compare(a, b)));
        engine.register_fn("compare", |a: i64, b: i64| ordering_to_int(a.cmp(&b)));
        engine.register_fn("compare", |a: f64, b: f64| {
            ordering_to_int(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
        });

        Self { engine }
    }

    /// Compiles `condition` the way a rule of `kind` would be compiled.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::RuleCompilationFailed`] with the parser message.
    pub fn check_condition(&self, name: &str, kind: AttributeKind, condition: &str) -> Result<()> {
        self.compile(name, kind, condition).map(|_| ())
    }

    fn compile(&self, name: &str, kind: AttributeKind, condition: &str) -> Result<AST> {
        let scope = template_scope(kind);
        self.engine
            .compile_expression_with_scope(&scope, condition)
            .map_err(|e| CaleannaError::RuleCompilationFailed {
                rule: name.to_string(),
                message: e.to_string(),
            })
    }

    /// Compiles a sort attribute. Built-in names win over any condition.
    pub fn compile_sort(&self, attribute: &Attribute) -> SortRule {
        match attribute.name.as_str() {
            SORT_NEWEST => SortRule::Newest,
            SORT_OLDEST => SortRule::Oldest,
            SORT_DOMAIN => SortRule::Domain,
            SORT_NAME => SortRule::Name,
            SORT_CUSTOM => SortRule::Custom,
            _ => match attribute.condition.as_deref() {
                Some(condition) => match self.compile(&attribute.name, AttributeKind::Sort, condition) {
                    Ok(ast) => SortRule::Script { name: attribute.name.clone(), ast },
                    Err(e) => {
                        log::warn!("invalid sort condition: {e}");
                        SortRule::Noop
                    }
                },
                None => SortRule::Noop,
            },
        }
    }

    /// Compiles a filter attribute. Built-in names win over any condition.
    pub fn compile_filter(&self, attribute: &Attribute) -> FilterRule {
        if attribute.name == FILTER_FAVORITES {
            return FilterRule::Favorites;
        }
        match attribute.condition.as_deref() {
            Some(condition) => match self.compile(&attribute.name, AttributeKind::Filter, condition) {
                Ok(ast) => FilterRule::Script { name: attribute.name.clone(), ast },
                Err(e) => {
                    log::warn!("invalid filter condition: {e}");
                    FilterRule::AlwaysTrue
                }
            },
            None => FilterRule::AlwaysTrue,
        }
    }

    /// Evaluates a sort condition over two pre-converted records.
    pub(crate) fn eval_comparator(
        &self,
        name: &str,
        ast: &AST,
        a: &Dynamic,
        b: &Dynamic,
    ) -> Result<Ordering> {
        let mut scope = Scope::new();
        scope.push_dynamic("a", a.clone());
        scope.push_dynamic("b", b.clone());
        let value = self.eval(name, ast, &mut scope)?;
        dynamic_to_ordering(&value).map_err(|message| CaleannaError::RuleCompilationFailed {
            rule: name.to_string(),
            message,
        })
    }

    /// Evaluates a filter condition over one pre-converted record.
    pub(crate) fn eval_predicate(&self, name: &str, ast: &AST, item: &Dynamic) -> Result<bool> {
        let mut scope = Scope::new();
        scope.push_dynamic("item", item.clone());
        self.eval(name, ast, &mut scope).map(dynamic_truthy)
    }

    fn eval(&self, name: &str, ast: &AST, scope: &mut Scope) -> Result<Dynamic> {
        self.engine
            .eval_ast_with_scope::<Dynamic>(scope, ast)
            .map_err(|e| CaleannaError::RuleCompilationFailed {
                rule: name.to_string(),
                message: e.to_string(),
            })
    }
}

impl SortRule {
    /// Orders two links. Script evaluation errors are returned to the caller,
    /// which decides how to degrade.
    pub fn compare(&self, engine: &RuleEngine, a: &LinkItem, b: &LinkItem) -> Result<Ordering> {
        Ok(match self {
            Self::Custom => a.order.cmp(&b.order),
            Self::Newest => compare_numeric_ids(b, a),
            Self::Oldest => compare_numeric_ids(a, b),
            Self::Domain => locale_compare(&a.domain, &b.domain),
            Self::Name => locale_compare(&a.title, &b.title),
            Self::Noop => Ordering::Equal,
            Self::Script { name, ast } => {
                return engine.eval_comparator(name, ast, &link_to_dynamic(a), &link_to_dynamic(b));
            }
        })
    }
}

impl FilterRule {
    /// Tests one link. Evaluation failures keep the link and are logged.
    pub fn matches(&self, engine: &RuleEngine, item: &LinkItem) -> bool {
        match self {
            Self::Favorites => item.is_favorite,
            Self::AlwaysTrue => true,
            Self::Script { name, ast } => {
                match engine.eval_predicate(name, ast, &link_to_dynamic(item)) {
                    Ok(keep) => keep,
                    Err(e) => {
                        log::warn!("filter evaluation failed for link {}: {e}", item.id);
                        true
                    }
                }
            }
        }
    }
}

/// Scope holding placeholder records so strict-variable compilation knows
/// which names a condition may reference.
fn template_scope(kind: AttributeKind) -> Scope<'static> {
    let mut scope = Scope::new();
    match kind {
        AttributeKind::Filter => {
            scope.push_dynamic("item", Dynamic::UNIT);
        }
        AttributeKind::Sort => {
            scope.push_dynamic("a", Dynamic::UNIT);
            scope.push_dynamic("b", Dynamic::UNIT);
        }
    }
    scope
}

fn ordering_to_int(ordering: Ordering) -> i64 {
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(name: &str, kind: AttributeKind, condition: Option<&str>) -> Attribute {
        Attribute {
            id: "100".to_string(),
            name: name.to_string(),
            kind,
            is_default: false,
            condition: condition.map(str::to_string),
        }
    }

    fn link(id: &str, url: &str, title: &str) -> LinkItem {
        LinkItem::new(id.to_string(), url, title, None, 0).unwrap()
    }

    #[test]
    fn test_builtin_names_compile_to_builtin_rules() {
        let engine = RuleEngine::new();
        assert!(matches!(engine.compile_sort(&attr("Newest", AttributeKind::Sort, None)), SortRule::Newest));
        assert!(matches!(engine.compile_sort(&attr("Custom", AttributeKind::Sort, None)), SortRule::Custom));
        assert!(matches!(
            engine.compile_filter(&attr("Favorites", AttributeKind::Filter, Some("false"))),
            FilterRule::Favorites
        ));
    }

    #[test]
    fn test_filter_condition_with_includes() {
        let engine = RuleEngine::new();
        let rule = engine.compile_filter(&attr(
            "Docs",
            AttributeKind::Filter,
            Some(r#"item.url.includes("docs")"#),
        ));
        assert!(rule.matches(&engine, &link("1", "https://docs.rs", "Docs")));
        assert!(!rule.matches(&engine, &link("2", "https://crates.io", "Crates")));
    }

    #[test]
    fn test_sort_condition_with_locale_compare() {
        let engine = RuleEngine::new();
        let rule = engine.compile_sort(&attr(
            "By title",
            AttributeKind::Sort,
            Some("a.title.localeCompare(b.title)"),
        ));
        let a = link("1", "https://a.com", "apple");
        let b = link("2", "https://b.com", "Banana");
        assert_eq!(rule.compare(&engine, &a, &b).unwrap(), Ordering::Less);
        assert_eq!(rule.compare(&engine, &b, &a).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_numeric_sort_condition() {
        let engine = RuleEngine::new();
        let rule = engine.compile_sort(&attr("Reverse order", AttributeKind::Sort, Some("b.order - a.order")));
        let mut a = link("1", "https://a.com", "a");
        let mut b = link("2", "https://b.com", "b");
        a.order = 1;
        b.order = 5;
        assert_eq!(rule.compare(&engine, &a, &b).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_undefined_variable_fails_compilation() {
        let engine = RuleEngine::new();
        let err = engine
            .check_condition("Broken", AttributeKind::Filter, "missing.isFavorite")
            .unwrap_err();
        assert!(matches!(err, CaleannaError::RuleCompilationFailed { .. }));
        assert!(matches!(
            engine.compile_filter(&attr("Broken", AttributeKind::Filter, Some("missing.isFavorite"))),
            FilterRule::AlwaysTrue
        ));
        assert!(matches!(
            engine.compile_sort(&attr("Broken", AttributeKind::Sort, Some("item.order"))),
            SortRule::Noop
        ));
    }

    #[test]
    fn test_statements_are_rejected() {
        let engine = RuleEngine::new();
        assert!(engine
            .check_condition("Loop", AttributeKind::Filter, "loop { }")
            .is_err());
        assert!(engine
            .check_condition("Let", AttributeKind::Filter, "let x = 1; x")
            .is_err());
        assert!(engine
            .check_condition("Fn", AttributeKind::Filter, "fn f() { 1 }")
            .is_err());
    }

    #[test]
    fn test_runtime_error_fails_open_for_filters() {
        let engine = RuleEngine::new();
        // Compiles, but `undefined_field` is unit and unit + 1 has no operator.
        let rule = engine.compile_filter(&attr(
            "Runtime",
            AttributeKind::Filter,
            Some("item.undefined_field + 1 > 0"),
        ));
        assert!(matches!(rule, FilterRule::Script { .. }));
        assert!(rule.matches(&engine, &link("1", "https://a.com", "a")));
    }

    #[test]
    fn test_runtime_error_surfaces_from_sort_compare() {
        let engine = RuleEngine::new();
        let rule = engine.compile_sort(&attr("Bad", AttributeKind::Sort, Some(r#"a.title"#)));
        let a = link("1", "https://a.com", "a");
        assert!(rule.compare(&engine, &a, &a).is_err());
    }

    #[test]
    fn test_condition_less_attributes_degrade() {
        let engine = RuleEngine::new();
        assert!(matches!(engine.compile_sort(&attr("Nothing", AttributeKind::Sort, None)), SortRule::Noop));
        assert!(matches!(
            engine.compile_filter(&attr("Nothing", AttributeKind::Filter, None)),
            FilterRule::AlwaysTrue
        ));
    }
}
