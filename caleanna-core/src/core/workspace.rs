//! Workspace records and their display ordering.

use crate::{Attribute, LinkItem};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Identifier reserved for the workspace synthesized on first run.
pub const DEFAULT_WORKSPACE_ID: &str = "default";
/// Display name of the synthesized default workspace.
pub const DEFAULT_WORKSPACE_NAME: &str = "Default";

/// An isolated, named collection of links and attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

impl Workspace {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }

    /// The reserved first-run workspace.
    pub fn default_workspace() -> Self {
        Self::new(DEFAULT_WORKSPACE_ID, DEFAULT_WORKSPACE_NAME)
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_WORKSPACE_ID
    }
}

/// A workspace together with everything it owns.
///
/// This is both the unit of atomic import and the body of a transfer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    pub workspace: Workspace,
    pub links: Vec<LinkItem>,
    pub attributes: Vec<Attribute>,
}

/// Composite natural-sort key used for the workspace list.
///
/// The default workspace ranks first. Every other name is split into its
/// ASCII letters (lower-cased), non-ASCII characters, ASCII digits and
/// remaining ASCII symbols, compared in that order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct WorkspaceSortKey {
    rank: u8,
    letters: String,
    non_ascii: String,
    digits: String,
    symbols: String,
}

impl WorkspaceSortKey {
    pub fn of(workspace: &Workspace) -> Self {
        if workspace.is_default() {
            return Self {
                rank: 0,
                letters: String::new(),
                non_ascii: String::new(),
                digits: String::new(),
                symbols: String::new(),
            };
        }
        let name = &workspace.name;
        Self {
            rank: 1,
            letters: name
                .chars()
                .filter(char::is_ascii_alphabetic)
                .map(|c| c.to_ascii_lowercase())
                .collect(),
            non_ascii: name.chars().filter(|c| !c.is_ascii()).collect(),
            digits: name.chars().filter(char::is_ascii_digit).collect(),
            symbols: name
                .chars()
                .filter(|c| c.is_ascii() && !c.is_ascii_alphanumeric())
                .collect(),
        }
    }
}

/// Compares two workspaces by [`WorkspaceSortKey`].
pub fn compare_workspaces(a: &Workspace, b: &Workspace) -> Ordering {
    WorkspaceSortKey::of(a).cmp(&WorkspaceSortKey::of(b))
}

/// Sorts `workspaces` in place for display.
pub fn sort_workspaces(workspaces: &mut [Workspace]) {
    workspaces.sort_by_cached_key(WorkspaceSortKey::of);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[Workspace]) -> Vec<&str> {
        list.iter().map(|w| w.name.as_str()).collect()
    }

    #[test]
    fn test_default_sorts_first() {
        let mut list = vec![
            Workspace::new("3", "alpha"),
            Workspace::default_workspace(),
            Workspace::new("2", "Aardvark"),
        ];
        sort_workspaces(&mut list);
        assert_eq!(names(&list), vec!["Default", "Aardvark", "alpha"]);
    }

    #[test]
    fn test_letters_compare_before_digits() {
        let mut list = vec![
            Workspace::new("1", "Work 2"),
            Workspace::new("2", "Work 10"),
            Workspace::new("3", "Home"),
            Workspace::new("4", "work 1"),
        ];
        sort_workspaces(&mut list);
        // Digits compare as text once letters tie.
        assert_eq!(names(&list), vec!["Home", "work 1", "Work 10", "Work 2"]);
    }

    #[test]
    fn test_non_ascii_breaks_letter_ties() {
        let a = Workspace::new("1", "Café");
        let b = Workspace::new("2", "Caf");
        assert_eq!(compare_workspaces(&b, &a), Ordering::Less);
    }

    #[test]
    fn test_symbols_are_last_resort() {
        let a = Workspace::new("1", "notes!");
        let b = Workspace::new("2", "notes");
        assert_eq!(compare_workspaces(&b, &a), Ordering::Less);
    }
}
