//! Core library for Caleanna, a local-first link shelf.
//!
//! Links live in named workspaces stored in a SQLite file. The primary entry
//! point is [`Session`], which opens a [`Storage`], selects a workspace and
//! exposes every operation a front-end needs: adding and editing links,
//! manual reordering, sort/filter/search views, user-defined rules, and
//! transfer tokens for moving a workspace between machines.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use crate::core::{
    attribute::{builtin_attributes, Attribute, AttributeKind},
    error::{CaleannaError, Result},
    link::{derive_domain, normalize_url, LinkEdit, LinkItem},
    ordering::{arrange, locale_compare, ViewState},
    registry::AttributeRegistry,
    scripting::{FilterRule, RuleDiagnostic, RuleEngine, SortRule},
    session::Session,
    storage::{Storage, StoreLocation, WorkspaceDeletion, STORE_VERSION},
    text_import::{parse_links, ParsedLink},
    transfer::{decode_token, encode_token, export_url, extract_token},
    workspace::{sort_workspaces, Workspace, WorkspaceSnapshot, DEFAULT_WORKSPACE_ID},
};
