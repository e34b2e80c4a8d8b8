//! The open-session façade: one selected workspace and everything a front-end
//! needs to display and edit it.
//!
//! Every mutation follows the same order: build the new state to the side,
//! write it through [`Storage`], and only then apply it in memory. A failed
//! write leaves the session exactly as it was.

use crate::core::attribute::SORT_CUSTOM;
use crate::core::ids::IdGenerator;
use crate::core::ordering::{self, arrange, hidden_links, ViewState};
use crate::core::scripting::{RuleDiagnostic, RuleEngine};
use crate::core::storage::WorkspaceDeletion;
use crate::core::text_import::parse_links;
use crate::core::transfer;
use crate::core::workspace::sort_workspaces;
use crate::{
    Attribute, AttributeKind, AttributeRegistry, CaleannaError, LinkEdit, LinkItem, Result,
    Storage, Workspace,
};

/// An open workspace session backed by a [`Storage`].
pub struct Session {
    storage: Storage,
    rules: RuleEngine,
    registry: AttributeRegistry,
    ids: IdGenerator,
    workspaces: Vec<Workspace>,
    current: Workspace,
    links: Vec<LinkItem>,
    view: ViewState,
}

impl Session {
    /// Opens `storage` and selects a workspace.
    ///
    /// `requested` names the workspace to select (typically the last one the
    /// user had open). When it is `None` or no longer exists, the first stored
    /// workspace is used, and the reserved default workspace is created if
    /// the store is empty.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be opened or read.
    pub fn open(mut storage: Storage, requested: Option<&str>) -> Result<Self> {
        storage.initialize()?;
        let fallback = storage.get_or_create_default_workspace()?;
        let mut workspaces = storage.list_workspaces()?;
        sort_workspaces(&mut workspaces);

        let current = match requested {
            Some(id) => match workspaces.iter().find(|w| w.id == id) {
                Some(found) => found.clone(),
                None => {
                    log::warn!("workspace {id} not found, opening {}", fallback.id);
                    fallback
                }
            },
            None => fallback,
        };

        let mut ids = IdGenerator::new();
        for workspace in &workspaces {
            ids.observe(&workspace.id);
        }

        let mut session = Self {
            storage,
            rules: RuleEngine::new(),
            registry: AttributeRegistry::default(),
            ids,
            workspaces,
            current: current.clone(),
            links: Vec::new(),
            view: ViewState::default(),
        };
        session.load_workspace(current)?;
        Ok(session)
    }

    /// Reads the links and attributes of `workspace` and makes it current.
    fn load_workspace(&mut self, workspace: Workspace) -> Result<()> {
        let (links, registry) = self.read_workspace(&workspace.id)?;
        self.apply_workspace(workspace, links, registry);
        Ok(())
    }

    fn read_workspace(&mut self, workspace_id: &str) -> Result<(Vec<LinkItem>, AttributeRegistry)> {
        let links = self.storage.get_links(workspace_id)?;
        let attributes = self.storage.get_attributes(workspace_id)?;
        Ok((links, AttributeRegistry::load(attributes)))
    }

    fn apply_workspace(&mut self, workspace: Workspace, links: Vec<LinkItem>, registry: AttributeRegistry) {
        // New ids must sort after anything already stored, whatever clock made it.
        for link in &links {
            self.ids.observe(&link.id);
        }
        for attribute in registry.user_attributes() {
            self.ids.observe(&attribute.id);
        }
        self.registry = registry;
        self.links = links;
        self.current = workspace;
        self.view = ViewState::default();
    }

    /// Closes the underlying store.
    pub fn close(mut self) -> Result<()> {
        self.storage.close()
    }

    // ── Outbound ─────────────────────────────────────────────────

    /// The links to display, after sort, filter and search.
    pub fn displayed_links(&self) -> Vec<LinkItem> {
        arrange(&self.links, &self.view, &self.registry, &self.rules)
    }

    /// Every link of the current workspace, in storage order.
    pub fn links(&self) -> &[LinkItem] {
        &self.links
    }

    pub fn attributes(&self, kind: AttributeKind) -> Vec<&Attribute> {
        self.registry.catalog(kind)
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    /// All workspaces in display order.
    pub fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    pub fn current_workspace(&self) -> &Workspace {
        &self.current
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    // ── Links ────────────────────────────────────────────────────

    /// Adds a link at the end of the custom order.
    ///
    /// A blank title falls back to the URL.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::InvalidUrl`] for an unusable URL, or a storage
    /// error if the write fails.
    pub fn add_link(&mut self, url: &str, title: &str, thumbnail_url: Option<String>) -> Result<LinkItem> {
        let title = if title.trim().is_empty() { url } else { title };
        let order = self.next_order()?;
        let link = LinkItem::new(self.ids.next_id(), url, title, thumbnail_url, order)?;
        self.storage.save_links(std::slice::from_ref(&link), &self.current.id)?;
        self.links.push(link.clone());
        Ok(link)
    }

    /// Applies `edit` to the link with `link_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::LinkNotFound`] for an unknown id.
    pub fn edit_link(&mut self, link_id: &str, edit: LinkEdit) -> Result<LinkItem> {
        let index = self.link_index(link_id)?;
        let mut updated = self.links[index].clone();
        updated.apply_edit(edit)?;
        self.storage.save_links(std::slice::from_ref(&updated), &self.current.id)?;
        self.links[index] = updated.clone();
        Ok(updated)
    }

    pub fn delete_link(&mut self, link_id: &str) -> Result<()> {
        let index = self.link_index(link_id)?;
        self.storage.delete_link(link_id, &self.current.id)?;
        self.links.remove(index);
        Ok(())
    }

    /// Flips the favourite flag and returns the new value.
    pub fn toggle_favorite(&mut self, link_id: &str) -> Result<bool> {
        let index = self.link_index(link_id)?;
        let mut updated = self.links[index].clone();
        updated.is_favorite = !updated.is_favorite;
        self.storage.save_links(std::slice::from_ref(&updated), &self.current.id)?;
        let is_favorite = updated.is_favorite;
        self.links[index] = updated;
        Ok(is_favorite)
    }

    /// Moves the displayed link at `from` to `to` and makes the result the
    /// custom order. The sort switches back to `Custom`.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::ValidationFailed`] for an index outside the
    /// displayed sequence.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let displayed = self.displayed_links();
        let hidden = hidden_links(&self.links, &displayed);
        let renumbered = ordering::reorder(&displayed, &hidden, from, to)?;
        self.storage.save_links(&renumbered, &self.current.id)?;
        self.links = renumbered;
        self.view.sort_by = SORT_CUSTOM.to_string();
        Ok(())
    }

    /// Appends the links found in plain `text` (see [`parse_links`]).
    ///
    /// Lines whose URL cannot be used are skipped with a warning. Returns the
    /// links that were added.
    pub fn import_text(&mut self, text: &str) -> Result<Vec<LinkItem>> {
        let mut order = self.next_order()?;
        let mut added = Vec::new();
        for parsed in parse_links(text) {
            match LinkItem::new(self.ids.next_id(), &parsed.url, &parsed.title, None, order) {
                Ok(mut link) => {
                    link.is_favorite = parsed.is_favorite;
                    added.push(link);
                    order = order.checked_add(1).ok_or_else(order_exhausted)?;
                }
                Err(e) => log::warn!("skipping imported link: {e}"),
            }
        }
        if !added.is_empty() {
            self.storage.save_links(&added, &self.current.id)?;
            self.links.extend(added.iter().cloned());
            log::info!("imported {} links into workspace {}", added.len(), self.current.id);
        }
        Ok(added)
    }

    fn link_index(&self, link_id: &str) -> Result<usize> {
        self.links
            .iter()
            .position(|l| l.id == link_id)
            .ok_or_else(|| CaleannaError::LinkNotFound(link_id.to_string()))
    }

    fn next_order(&self) -> Result<i64> {
        match self.links.iter().map(|l| l.order).max() {
            Some(last) => last.checked_add(1).ok_or_else(order_exhausted),
            None => Ok(0),
        }
    }

    // ── View ─────────────────────────────────────────────────────

    /// Selects the sort attribute called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::AttributeNotFound`] when no sort has that name.
    pub fn set_sort(&mut self, name: &str) -> Result<()> {
        if self.registry.find(name, AttributeKind::Sort).is_none() {
            return Err(CaleannaError::AttributeNotFound(name.to_string()));
        }
        self.view.sort_by = name.to_string();
        Ok(())
    }

    /// Selects a filter, or clears it for `None`, an empty name, or the name
    /// of the filter already active.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::AttributeNotFound`] when no filter has that name.
    pub fn set_filter(&mut self, name: Option<&str>) -> Result<()> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        match name {
            None => self.view.filter_by = None,
            Some(name) if self.view.filter_by.as_deref() == Some(name) => {
                self.view.filter_by = None;
            }
            Some(name) => {
                if self.registry.find(name, AttributeKind::Filter).is_none() {
                    return Err(CaleannaError::AttributeNotFound(name.to_string()));
                }
                self.view.filter_by = Some(name.to_string());
            }
        }
        Ok(())
    }

    pub fn set_search(&mut self, term: &str) {
        self.view.search_term = term.to_string();
    }

    // ── Attributes ───────────────────────────────────────────────

    /// Adds a user attribute to the current workspace.
    ///
    /// A condition that does not compile is still saved (it degrades at use
    /// time); the problem is returned as a [`RuleDiagnostic`].
    pub fn add_attribute(
        &mut self,
        name: &str,
        kind: AttributeKind,
        condition: Option<&str>,
    ) -> Result<(Attribute, Option<RuleDiagnostic>)> {
        let mut staged = self.registry.clone();
        let attribute = staged.add(self.ids.next_id(), name, kind, condition)?;
        self.storage
            .save_attributes(std::slice::from_ref(&attribute), &self.current.id)?;
        self.registry = staged;

        let diagnostic = attribute.condition.as_deref().and_then(|condition| {
            self.rules
                .check_condition(&attribute.name, kind, condition)
                .err()
                .map(|e| RuleDiagnostic {
                    attribute: attribute.name.clone(),
                    message: e.to_string(),
                })
        });
        Ok((attribute, diagnostic))
    }

    /// Deletes a user attribute. Built-ins are left alone and report `false`.
    ///
    /// If the deleted attribute was the active sort or filter, the view falls
    /// back to the custom order or no filter.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::AttributeNotFound`] for an unknown id.
    pub fn delete_attribute(&mut self, attribute_id: &str) -> Result<bool> {
        let attribute = self
            .registry
            .get(attribute_id)
            .cloned()
            .ok_or_else(|| CaleannaError::AttributeNotFound(attribute_id.to_string()))?;
        if attribute.is_default {
            return Ok(false);
        }
        self.storage.delete_attribute(attribute_id, &self.current.id)?;
        self.registry.delete(attribute_id);

        match attribute.kind {
            AttributeKind::Sort if self.view.sort_by == attribute.name => {
                self.view.sort_by = SORT_CUSTOM.to_string();
            }
            AttributeKind::Filter if self.view.filter_by.as_deref() == Some(attribute.name.as_str()) => {
                self.view.filter_by = None;
            }
            _ => {}
        }
        Ok(true)
    }

    // ── Workspaces ───────────────────────────────────────────────

    /// Creates a workspace. Does not select it.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::ValidationFailed`] for a blank name.
    pub fn add_workspace(&mut self, name: &str) -> Result<Workspace> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CaleannaError::ValidationFailed(
                "Workspace name cannot be empty".to_string(),
            ));
        }
        let workspace = Workspace::new(self.ids.next_id(), name);
        self.storage.save_workspace(&workspace)?;
        self.workspaces.push(workspace.clone());
        sort_workspaces(&mut self.workspaces);
        Ok(workspace)
    }

    /// Deletes a workspace with all its links and attributes.
    ///
    /// Deleting the current workspace selects the first remaining one.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::ValidationFailed`] for the reserved default
    /// workspace or the last remaining workspace.
    pub fn delete_workspace(&mut self, workspace_id: &str) -> Result<WorkspaceDeletion> {
        if !self.workspaces.iter().any(|w| w.id == workspace_id) {
            return Err(CaleannaError::WorkspaceNotFound(workspace_id.to_string()));
        }
        if Workspace::new(workspace_id, "").is_default() {
            return Err(CaleannaError::ValidationFailed(
                "The default workspace cannot be deleted".to_string(),
            ));
        }
        if self.workspaces.len() <= 1 {
            return Err(CaleannaError::ValidationFailed(
                "The last workspace cannot be deleted".to_string(),
            ));
        }

        // Read the replacement before deleting so a failed read leaves both intact.
        let mut replacement = None;
        if self.current.id == workspace_id {
            if let Some(next) = self.workspaces.iter().find(|w| w.id != workspace_id).cloned() {
                let (links, registry) = self.read_workspace(&next.id)?;
                replacement = Some((next, links, registry));
            }
        }

        let deletion = self.storage.delete_workspace(workspace_id)?;
        self.workspaces.retain(|w| w.id != workspace_id);
        if let Some((next, links, registry)) = replacement {
            self.apply_workspace(next, links, registry);
        }
        Ok(deletion)
    }

    /// Makes the workspace with `workspace_id` current.
    pub fn select_workspace(&mut self, workspace_id: &str) -> Result<()> {
        let workspace = self
            .workspaces
            .iter()
            .find(|w| w.id == workspace_id)
            .cloned()
            .ok_or_else(|| CaleannaError::WorkspaceNotFound(workspace_id.to_string()))?;
        self.load_workspace(workspace)
    }

    // ── Transfer ─────────────────────────────────────────────────

    /// Exports the current workspace as a token.
    pub fn export_token(&self) -> Result<String> {
        self.export_token_at(chrono::Utc::now().timestamp_millis())
    }

    fn export_token_at(&self, timestamp_millis: i64) -> Result<String> {
        let snapshot =
            transfer::build_envelope(&self.links, self.registry.user_attributes(), timestamp_millis);
        transfer::encode_token(&snapshot)
    }

    /// Exports the current workspace as an import URL under `base_url`.
    pub fn export_current(&self, base_url: &str) -> Result<String> {
        let token = self.export_token()?;
        transfer::export_url(base_url, &token)
    }

    /// Imports a token or import URL as a workspace and selects it.
    ///
    /// Importing the same token again updates the same workspace.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::InvalidImportPayload`] for anything that does
    /// not decode to a complete workspace; nothing is written in that case.
    pub fn import(&mut self, token_or_url: &str) -> Result<Workspace> {
        let snapshot = transfer::decode_token(token_or_url)?;
        self.storage.save_snapshot(&snapshot)?;
        log::info!(
            "imported workspace {} ({} links, {} attributes)",
            snapshot.workspace.id,
            snapshot.links.len(),
            snapshot.attributes.len()
        );

        let workspace = snapshot.workspace;
        self.ids.observe(&workspace.id);
        self.workspaces.retain(|w| w.id != workspace.id);
        self.workspaces.push(workspace.clone());
        sort_workspaces(&mut self.workspaces);
        self.load_workspace(workspace.clone())?;
        Ok(workspace)
    }
}

fn order_exhausted() -> CaleannaError {
    CaleannaError::ValidationFailed("No room left at the end of the custom order".to_string())
}
