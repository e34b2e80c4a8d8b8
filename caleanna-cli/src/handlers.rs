use std::io::{self, Read};
use std::path::Path;

use caleanna_core::{AttributeKind, LinkEdit, LinkItem, Result, Session};

use crate::commands::{KindArg, ViewArgs};

impl From<KindArg> for AttributeKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Sort => AttributeKind::Sort,
            KindArg::Filter => AttributeKind::Filter,
        }
    }
}

/// Applies one-shot view criteria to a freshly opened session.
fn apply_view(session: &mut Session, view: &ViewArgs) -> Result<()> {
    if let Some(sort) = &view.sort {
        session.set_sort(sort)?;
    }
    if let Some(filter) = &view.filter {
        session.set_filter(Some(filter))?;
    }
    if let Some(search) = &view.search {
        session.set_search(search);
    }
    Ok(())
}

fn print_links(links: &[LinkItem]) {
    for (position, link) in links.iter().enumerate() {
        let star = if link.is_favorite { '*' } else { ' ' };
        println!("  {position:>3}. {star} {} <{}> ({})", link.title, link.url, link.id);
    }
}

// ── Workspaces ───────────────────────────────────────────────────

pub fn handle_workspace_list(session: &Session, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(session.workspaces())?);
        return Ok(());
    }
    let current = &session.current_workspace().id;
    println!("Workspaces:\n");
    for workspace in session.workspaces() {
        let marker = if &workspace.id == current { '*' } else { ' ' };
        println!("  {marker} {} ({})", workspace.name, workspace.id);
    }
    Ok(())
}

pub fn handle_workspace_add(session: &mut Session, name: &str) -> Result<()> {
    let workspace = session.add_workspace(name)?;
    println!("Created workspace '{}' ({})", workspace.name, workspace.id);
    Ok(())
}

pub fn handle_workspace_delete(session: &mut Session, id: &str) -> Result<()> {
    let deletion = session.delete_workspace(id)?;
    println!(
        "Deleted workspace {id} ({} links, {} attributes)",
        deletion.links_removed, deletion.attributes_removed
    );
    Ok(())
}

pub fn handle_workspace_select(session: &mut Session, id: &str) -> Result<()> {
    session.select_workspace(id)?;
    let workspace = session.current_workspace();
    println!("Selected workspace '{}' ({})", workspace.name, workspace.id);
    Ok(())
}

// ── Links ────────────────────────────────────────────────────────

pub fn handle_link_add(
    session: &mut Session,
    url: &str,
    title: Option<&str>,
    thumbnail: Option<String>,
    json: bool,
) -> Result<()> {
    let link = session.add_link(url, title.unwrap_or_default(), thumbnail)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&link)?);
    } else {
        println!("Added {} ({})", link.url, link.id);
    }
    Ok(())
}

pub fn handle_link_edit(
    session: &mut Session,
    id: &str,
    url: Option<String>,
    title: Option<String>,
    thumbnail: Option<String>,
    clear_thumbnail: bool,
) -> Result<()> {
    let thumbnail_url = if clear_thumbnail { Some(None) } else { thumbnail.map(Some) };
    let link = session.edit_link(id, LinkEdit { url, title, thumbnail_url })?;
    println!("Updated {} <{}>", link.title, link.url);
    Ok(())
}

pub fn handle_link_delete(session: &mut Session, id: &str) -> Result<()> {
    session.delete_link(id)?;
    println!("Deleted link {id}");
    Ok(())
}

pub fn handle_link_favorite(session: &mut Session, id: &str) -> Result<()> {
    if session.toggle_favorite(id)? {
        println!("Added {id} to favorites");
    } else {
        println!("Removed {id} from favorites");
    }
    Ok(())
}

pub fn handle_link_move(session: &mut Session, from: usize, to: usize, view: &ViewArgs) -> Result<()> {
    apply_view(session, view)?;
    session.reorder(from, to)?;
    print_links(&session.displayed_links());
    Ok(())
}

pub fn handle_list(session: &mut Session, view: &ViewArgs, json: bool) -> Result<()> {
    apply_view(session, view)?;
    let links = session.displayed_links();
    if json {
        println!("{}", serde_json::to_string_pretty(&links)?);
        return Ok(());
    }
    if links.is_empty() {
        println!("No links found.");
        return Ok(());
    }

    let state = session.view();
    let mut criteria = format!("sort: {}", state.sort_by);
    if let Some(filter) = &state.filter_by {
        criteria.push_str(&format!(", filter: {filter}"));
    }
    if !state.search_term.is_empty() {
        criteria.push_str(&format!(", search: \"{}\"", state.search_term));
    }
    println!("{} ({criteria}):\n", session.current_workspace().name);
    print_links(&links);
    Ok(())
}

pub fn handle_import_txt(session: &mut Session, path: &Path) -> Result<()> {
    let text = if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(path)?
    };
    let added = session.import_text(&text)?;
    println!("Imported {} links", added.len());
    Ok(())
}

// ── Attributes ───────────────────────────────────────────────────

pub fn handle_attribute_list(session: &Session, kind: Option<KindArg>, json: bool) -> Result<()> {
    let kinds: Vec<AttributeKind> = match kind {
        Some(kind) => vec![kind.into()],
        None => vec![AttributeKind::Sort, AttributeKind::Filter],
    };
    if json {
        let attributes: Vec<_> = kinds.iter().flat_map(|k| session.attributes(*k)).collect();
        println!("{}", serde_json::to_string_pretty(&attributes)?);
        return Ok(());
    }
    for kind in kinds {
        println!("{}:", if kind == AttributeKind::Sort { "Sorts" } else { "Filters" });
        for attribute in session.attributes(kind) {
            match &attribute.condition {
                _ if attribute.is_default => {
                    println!("  - {} ({}) [built-in]", attribute.name, attribute.id)
                }
                Some(condition) => println!("  - {} ({}): {condition}", attribute.name, attribute.id),
                None => println!("  - {} ({})", attribute.name, attribute.id),
            }
        }
    }
    Ok(())
}

pub fn handle_attribute_add(
    session: &mut Session,
    name: &str,
    kind: KindArg,
    condition: Option<&str>,
) -> Result<()> {
    let (attribute, diagnostic) = session.add_attribute(name, kind.into(), condition)?;
    println!(
        "Added {} attribute '{}' ({})",
        attribute.kind.as_str(),
        attribute.name,
        attribute.id
    );
    if let Some(diagnostic) = diagnostic {
        eprintln!(
            "Warning: rule '{}' will be ignored until fixed: {}",
            diagnostic.attribute, diagnostic.message
        );
    }
    Ok(())
}

pub fn handle_attribute_delete(session: &mut Session, id: &str) -> Result<()> {
    if session.delete_attribute(id)? {
        println!("Deleted attribute {id}");
    } else {
        println!("Built-in attribute {id} cannot be deleted");
    }
    Ok(())
}

// ── Transfer ─────────────────────────────────────────────────────

pub fn handle_export(session: &Session, base_url: &str, token_only: bool) -> Result<()> {
    if token_only {
        println!("{}", session.export_token()?);
    } else {
        println!("{}", session.export_current(base_url)?);
    }
    Ok(())
}

pub fn handle_import(session: &mut Session, token: &str) -> Result<()> {
    let workspace = session.import(token)?;
    println!(
        "Imported workspace '{}' ({}) with {} links",
        workspace.name,
        workspace.id,
        session.links().len()
    );
    Ok(())
}
