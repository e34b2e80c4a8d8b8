//! Derives the displayed link sequence from stored links and the view state.
//!
//! [`arrange`] is a pure function: sort, then filter, then search, each stage
//! working on the previous stage's output. Manual drag-and-drop ordering is a
//! separate write path, [`reorder`], which produces new `order` values for the
//! caller to persist.

use crate::core::attribute::SORT_CUSTOM;
use crate::core::scripting::{FilterRule, RuleEngine, SortRule};
use crate::{AttributeKind, AttributeRegistry, CaleannaError, LinkItem, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// The user-selected sort, filter and search criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub sort_by: String,
    /// Name of the active filter attribute, if any.
    pub filter_by: Option<String>,
    pub search_term: String,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            sort_by: SORT_CUSTOM.to_string(),
            filter_by: None,
            search_term: String::new(),
        }
    }
}

/// Computes the sequence of links to display.
///
/// Returns fresh clones; `links` is never modified. Broken user rules degrade
/// instead of failing: a sort that cannot be evaluated leaves the order as it
/// was, a filter that cannot be evaluated keeps the link.
pub fn arrange(
    links: &[LinkItem],
    view: &ViewState,
    registry: &AttributeRegistry,
    rules: &RuleEngine,
) -> Vec<LinkItem> {
    let sorted = sort_stage(links.to_vec(), &view.sort_by, registry, rules);
    let filtered = filter_stage(sorted, view.filter_by.as_deref(), registry, rules);
    search_stage(filtered, &view.search_term)
}

fn sort_stage(
    links: Vec<LinkItem>,
    sort_by: &str,
    registry: &AttributeRegistry,
    rules: &RuleEngine,
) -> Vec<LinkItem> {
    let rule = if sort_by == SORT_CUSTOM {
        SortRule::Custom
    } else {
        match registry.find(sort_by, AttributeKind::Sort) {
            Some(attribute) => rules.compile_sort(attribute),
            None => {
                log::debug!("sort attribute '{sort_by}' not found, keeping order");
                return links;
            }
        }
    };
    if matches!(rule, SortRule::Noop) {
        return links;
    }

    match try_stable_sort(&links, |a, b| rule.compare(rules, a, b)) {
        Ok(sorted) => sorted,
        Err(e) => {
            log::warn!("sort '{sort_by}' abandoned: {e}");
            links
        }
    }
}

fn filter_stage(
    mut links: Vec<LinkItem>,
    filter_by: Option<&str>,
    registry: &AttributeRegistry,
    rules: &RuleEngine,
) -> Vec<LinkItem> {
    let Some(filter_by) = filter_by.filter(|f| !f.is_empty()) else {
        return links;
    };
    let Some(attribute) = registry.find(filter_by, AttributeKind::Filter) else {
        log::debug!("filter attribute '{filter_by}' not found, keeping all links");
        return links;
    };
    let rule = rules.compile_filter(attribute);
    if !matches!(rule, FilterRule::AlwaysTrue) {
        links.retain(|link| rule.matches(rules, link));
    }
    links
}

fn search_stage(mut links: Vec<LinkItem>, term: &str) -> Vec<LinkItem> {
    let term = term.to_lowercase();
    if term.is_empty() {
        return links;
    }
    links.retain(|link| {
        link.title.to_lowercase().contains(&term) || link.url.to_lowercase().contains(&term)
    });
    links
}

/// Case-insensitive text comparison; ties fall back to the original text so
/// the result is a total order.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Ascending by the numeric value of the id. Non-numeric ids sort after every
/// numeric one, among themselves by text.
pub fn compare_numeric_ids(a: &LinkItem, b: &LinkItem) -> Ordering {
    match (a.numeric_id(), b.numeric_id()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    }
}

/// Stable merge sort over a fallible comparator.
///
/// Unlike `slice::sort_by` this never panics when the comparator is not a total
/// order; it simply produces some permutation. The first comparator error
/// aborts the sort.
pub fn try_stable_sort<T, E, F>(items: &[T], mut compare: F) -> std::result::Result<Vec<T>, E>
where
    T: Clone,
    F: FnMut(&T, &T) -> std::result::Result<Ordering, E>,
{
    merge_sort(items, &mut compare)
}

fn merge_sort<T, E, F>(items: &[T], compare: &mut F) -> std::result::Result<Vec<T>, E>
where
    T: Clone,
    F: FnMut(&T, &T) -> std::result::Result<Ordering, E>,
{
    if items.len() <= 1 {
        return Ok(items.to_vec());
    }
    let mid = items.len() / 2;
    let left = merge_sort(&items[..mid], compare)?;
    let right = merge_sort(&items[mid..], compare)?;

    let mut merged = Vec::with_capacity(items.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        // Take from the right run only when it is strictly smaller.
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(l, r)? == Ordering::Greater,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    Ok(merged)
}

/// Links present in `all` but absent from `displayed`, in custom order.
pub fn hidden_links(all: &[LinkItem], displayed: &[LinkItem]) -> Vec<LinkItem> {
    let shown: HashSet<&str> = displayed.iter().map(|l| l.id.as_str()).collect();
    let hidden: Vec<LinkItem> = all
        .iter()
        .filter(|l| !shown.contains(l.id.as_str()))
        .cloned()
        .collect();
    sort_by_custom_order(hidden)
}

fn sort_by_custom_order(mut links: Vec<LinkItem>) -> Vec<LinkItem> {
    // `order` is an integer key, so the std stable sort is safe here.
    links.sort_by_key(|l| l.order);
    links
}

/// Moves the displayed item at `from` to position `to` and renumbers the
/// whole collection.
///
/// `hidden` holds the links the current filter or search is not showing; they
/// keep their relative custom order and are placed after the displayed ones.
/// Every returned link gets a dense 0-based `order` equal to its position.
///
/// # Errors
///
/// Returns [`CaleannaError::ValidationFailed`] when either index is outside
/// the displayed sequence.
pub fn reorder(
    displayed: &[LinkItem],
    hidden: &[LinkItem],
    from: usize,
    to: usize,
) -> Result<Vec<LinkItem>> {
    let len = displayed.len();
    if from >= len || to >= len {
        return Err(CaleannaError::ValidationFailed(format!(
            "Cannot move position {from} to {to} in a list of {len} links"
        )));
    }

    // 1. Move within the displayed sequence
    let mut sequence = displayed.to_vec();
    let moved = sequence.remove(from);
    sequence.insert(to, moved);

    // 2. Append the links the view is hiding
    sequence.extend(sort_by_custom_order(hidden.to_vec()));

    // 3. Dense renumbering
    for (position, link) in sequence.iter_mut().enumerate() {
        link.order = i64::try_from(position).unwrap_or(i64::MAX);
    }
    Ok(sequence)
}
