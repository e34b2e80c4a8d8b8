//! Internal domain modules for the Caleanna core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod attribute;
pub mod error;
pub mod ids;
pub mod link;
pub mod ordering;
pub mod registry;
pub mod scripting;
pub mod session;
pub mod storage;
pub mod text_import;
pub mod transfer;
pub mod workspace;

#[doc(inline)]
pub use attribute::{builtin_attributes, Attribute, AttributeKind};
#[doc(inline)]
pub use error::{CaleannaError, Result};
#[doc(inline)]
pub use ids::IdGenerator;
#[doc(inline)]
pub use link::{LinkEdit, LinkItem};
#[doc(inline)]
pub use ordering::{arrange, reorder, ViewState};
#[doc(inline)]
pub use registry::AttributeRegistry;
#[doc(inline)]
pub use scripting::{FilterRule, RuleDiagnostic, RuleEngine, SortRule};
#[doc(inline)]
pub use session::Session;
#[doc(inline)]
pub use storage::{Storage, StoreLocation, WorkspaceDeletion, STORE_VERSION};
#[doc(inline)]
pub use text_import::{parse_links, ParsedLink};
#[doc(inline)]
pub use workspace::{sort_workspaces, Workspace, WorkspaceSnapshot};
