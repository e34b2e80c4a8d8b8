//! SQLite-backed record store for workspaces, links and attributes.
//!
//! [`Storage`] owns its connection explicitly. It does no I/O on construction;
//! [`Storage::initialize`] opens the database and prepares the schema, and
//! every other operation initialises lazily on first use. Each write runs in
//! its own transaction scoped to the tables it touches.

use crate::core::error::{read_failed, write_failed};
use crate::{Attribute, AttributeKind, CaleannaError, LinkItem, Result, Workspace, WorkspaceSnapshot};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Transaction};
use std::path::{Path, PathBuf};

/// Version marker stored in `PRAGMA user_version`.
pub const STORE_VERSION: i32 = 1;

/// Where the backing database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    InMemory,
}

/// Counts of records removed by [`Storage::delete_workspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkspaceDeletion {
    pub links_removed: usize,
    pub attributes_removed: usize,
}

pub struct Storage {
    location: StoreLocation,
    conn: Option<Connection>,
}

impl Storage {
    pub fn new(location: StoreLocation) -> Self {
        Self { location, conn: None }
    }

    /// Store backed by the database file at `path`, created on first open.
    pub fn at<P: AsRef<Path>>(path: P) -> Self {
        Self::new(StoreLocation::File(path.as_ref().to_path_buf()))
    }

    pub fn in_memory() -> Self {
        Self::new(StoreLocation::InMemory)
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Opens the database and ensures all tables and workspace indices exist.
    ///
    /// Calling this on an already-open store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::StorageUnavailable`] if the file cannot be
    /// opened at all, or [`CaleannaError::StorageInitFailed`] if it is not a
    /// usable Caleanna database.
    pub fn initialize(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let conn = match &self.location {
            StoreLocation::File(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| CaleannaError::StorageUnavailable(format!("{}: {e}", path.display())))?,
            StoreLocation::InMemory => Connection::open_in_memory()
                .map_err(|e| CaleannaError::StorageUnavailable(e.to_string()))?,
        };
        prepare_schema(&conn)?;
        self.conn = Some(conn);
        Ok(())
    }

    /// Closes the connection. A later operation reopens it lazily.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::StorageWriteFailed`] if SQLite refuses to close
    /// (for example because a statement is still pending).
    pub fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            if let Err((conn, e)) = conn.close() {
                self.conn = Some(conn);
                return Err(write_failed("close", &[])(e));
            }
        }
        Ok(())
    }

    fn conn_mut(&mut self) -> Result<&mut Connection> {
        if self.conn.is_none() {
            self.initialize().map_err(|e| match e {
                CaleannaError::StorageInitFailed(_) => e,
                other => CaleannaError::StorageInitFailed(other.to_string()),
            })?;
        }
        self.conn
            .as_mut()
            .ok_or_else(|| CaleannaError::StorageInitFailed("connection unavailable".to_string()))
    }

    // ── Workspaces ───────────────────────────────────────────────

    /// Returns the first stored workspace, creating the reserved default one
    /// when the store holds none.
    pub fn get_or_create_default_workspace(&mut self) -> Result<Workspace> {
        if let Some(first) = self.list_workspaces()?.into_iter().next() {
            return Ok(first);
        }
        let workspace = Workspace::default_workspace();
        self.save_workspace(&workspace)?;
        log::info!("created default workspace");
        Ok(workspace)
    }

    /// Returns all workspaces in insertion order.
    pub fn list_workspaces(&mut self) -> Result<Vec<Workspace>> {
        let conn = self.conn_mut()?;
        let mut stmt = conn
            .prepare("SELECT id, name FROM workspaces ORDER BY rowid")
            .map_err(read_failed("list_workspaces", &[]))?;
        let workspaces = stmt
            .query_map([], |row| Ok(Workspace::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(read_failed("list_workspaces", &[]))?;
        Ok(workspaces)
    }

    pub fn get_workspace(&mut self, workspace_id: &str) -> Result<Option<Workspace>> {
        self.conn_mut()?
            .query_row(
                "SELECT id, name FROM workspaces WHERE id = ?",
                [workspace_id],
                |row| Ok(Workspace::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(read_failed("get_workspace", &[workspace_id]))
    }

    /// Inserts or replaces a workspace record by id.
    pub fn save_workspace(&mut self, workspace: &Workspace) -> Result<()> {
        let on_err = || write_failed("save_workspace", &[workspace.id.as_str()]);
        let tx = self.conn_mut()?.transaction().map_err(on_err())?;
        upsert_workspace(&tx, workspace).map_err(on_err())?;
        tx.commit().map_err(on_err())
    }

    /// Removes a workspace and every link and attribute it owns, atomically.
    pub fn delete_workspace(&mut self, workspace_id: &str) -> Result<WorkspaceDeletion> {
        let on_err = || write_failed("delete_workspace", &[workspace_id]);
        let tx = self.conn_mut()?.transaction().map_err(on_err())?;
        let links_removed = tx
            .execute("DELETE FROM links WHERE workspace_id = ?", [workspace_id])
            .map_err(on_err())?;
        let attributes_removed = tx
            .execute("DELETE FROM attributes WHERE workspace_id = ?", [workspace_id])
            .map_err(on_err())?;
        tx.execute("DELETE FROM workspaces WHERE id = ?", [workspace_id])
            .map_err(on_err())?;
        tx.commit().map_err(on_err())?;
        log::info!(
            "deleted workspace {workspace_id} ({links_removed} links, {attributes_removed} attributes)"
        );
        Ok(WorkspaceDeletion { links_removed, attributes_removed })
    }

    // ── Links ────────────────────────────────────────────────────

    /// Returns every link owned by `workspace_id`, in insertion order.
    pub fn get_links(&mut self, workspace_id: &str) -> Result<Vec<LinkItem>> {
        let conn = self.conn_mut()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, url, title, domain, is_favorite, thumbnail_url, sort_order
                 FROM links WHERE workspace_id = ? ORDER BY rowid",
            )
            .map_err(read_failed("get_links", &[workspace_id]))?;
        let links = stmt
            .query_map([workspace_id], map_link_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(read_failed("get_links", &[workspace_id]))?;
        Ok(links)
    }

    /// Upserts `links`, stamping each with `workspace_id`, in one transaction.
    pub fn save_links(&mut self, links: &[LinkItem], workspace_id: &str) -> Result<()> {
        let ids: Vec<&str> = links.iter().map(|l| l.id.as_str()).collect();
        let tx = self
            .conn_mut()?
            .transaction()
            .map_err(write_failed("save_links", &[workspace_id]))?;
        upsert_links(&tx, links, workspace_id).map_err(write_failed("save_links", &ids))?;
        tx.commit().map_err(write_failed("save_links", &ids))
    }

    /// Deletes one link of `workspace_id`. Returns `true` if a row was removed.
    pub fn delete_link(&mut self, link_id: &str, workspace_id: &str) -> Result<bool> {
        let on_err = || write_failed("delete_link", &[link_id, workspace_id]);
        let tx = self.conn_mut()?.transaction().map_err(on_err())?;
        let removed = tx
            .execute(
                "DELETE FROM links WHERE workspace_id = ? AND id = ?",
                [workspace_id, link_id],
            )
            .map_err(on_err())?;
        tx.commit().map_err(on_err())?;
        Ok(removed > 0)
    }

    // ── Attributes ───────────────────────────────────────────────

    pub fn get_attributes(&mut self, workspace_id: &str) -> Result<Vec<Attribute>> {
        let conn = self.conn_mut()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, kind, is_default, condition
                 FROM attributes WHERE workspace_id = ? ORDER BY rowid",
            )
            .map_err(read_failed("get_attributes", &[workspace_id]))?;
        let attributes = stmt
            .query_map([workspace_id], map_attribute_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(read_failed("get_attributes", &[workspace_id]))?;
        Ok(attributes)
    }

    /// Upserts `attributes`, stamping each with `workspace_id`, in one transaction.
    pub fn save_attributes(&mut self, attributes: &[Attribute], workspace_id: &str) -> Result<()> {
        let ids: Vec<&str> = attributes.iter().map(|a| a.id.as_str()).collect();
        let tx = self
            .conn_mut()?
            .transaction()
            .map_err(write_failed("save_attributes", &[workspace_id]))?;
        upsert_attributes(&tx, attributes, workspace_id)
            .map_err(write_failed("save_attributes", &ids))?;
        tx.commit().map_err(write_failed("save_attributes", &ids))
    }

    /// Deletes one attribute of `workspace_id`. Returns `true` if a row was removed.
    pub fn delete_attribute(&mut self, attribute_id: &str, workspace_id: &str) -> Result<bool> {
        let on_err = || write_failed("delete_attribute", &[attribute_id, workspace_id]);
        let tx = self.conn_mut()?.transaction().map_err(on_err())?;
        let removed = tx
            .execute(
                "DELETE FROM attributes WHERE workspace_id = ? AND id = ?",
                [workspace_id, attribute_id],
            )
            .map_err(on_err())?;
        tx.commit().map_err(on_err())?;
        Ok(removed > 0)
    }

    // ── Snapshots ────────────────────────────────────────────────

    /// Reads a workspace with all of its links and attributes.
    ///
    /// # Errors
    ///
    /// Returns [`CaleannaError::WorkspaceNotFound`] if no such workspace is stored.
    pub fn load_snapshot(&mut self, workspace_id: &str) -> Result<WorkspaceSnapshot> {
        let workspace = self
            .get_workspace(workspace_id)?
            .ok_or_else(|| CaleannaError::WorkspaceNotFound(workspace_id.to_string()))?;
        let links = self.get_links(workspace_id)?;
        let attributes = self.get_attributes(workspace_id)?;
        Ok(WorkspaceSnapshot { workspace, links, attributes })
    }

    /// Writes a workspace, its links and its attributes in a single transaction.
    ///
    /// Either all three collections are updated or none is.
    pub fn save_snapshot(&mut self, snapshot: &WorkspaceSnapshot) -> Result<()> {
        let workspace_id = snapshot.workspace.id.as_str();
        let on_err = || write_failed("save_snapshot", &[workspace_id]);
        let tx = self.conn_mut()?.transaction().map_err(on_err())?;
        upsert_workspace(&tx, &snapshot.workspace).map_err(on_err())?;
        upsert_links(&tx, &snapshot.links, workspace_id).map_err(on_err())?;
        upsert_attributes(&tx, &snapshot.attributes, workspace_id).map_err(on_err())?;
        tx.commit().map_err(on_err())
    }
}

/// Runs the schema script and bumps the version marker when needed.
fn prepare_schema(conn: &Connection) -> Result<()> {
    let init_failed = |e: rusqlite::Error| CaleannaError::StorageInitFailed(e.to_string());
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(init_failed)?;
    if version > STORE_VERSION {
        return Err(CaleannaError::StorageInitFailed(format!(
            "store version {version} is newer than supported version {STORE_VERSION}"
        )));
    }
    // IF NOT EXISTS keeps this safe to repeat; it also restores missing indices.
    conn.execute_batch(include_str!("schema.sql")).map_err(init_failed)?;
    if version < STORE_VERSION {
        log::debug!("upgrading store from version {version} to {STORE_VERSION}");
        conn.pragma_update(None, "user_version", STORE_VERSION)
            .map_err(init_failed)?;
    }
    Ok(())
}

fn upsert_workspace(tx: &Transaction, workspace: &Workspace) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO workspaces (id, name) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        rusqlite::params![workspace.id, workspace.name],
    )?;
    Ok(())
}

fn upsert_links(tx: &Transaction, links: &[LinkItem], workspace_id: &str) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO links (id, workspace_id, url, title, domain, is_favorite, thumbnail_url, sort_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(workspace_id, id) DO UPDATE SET
            url = excluded.url,
            title = excluded.title,
            domain = excluded.domain,
            is_favorite = excluded.is_favorite,
            thumbnail_url = excluded.thumbnail_url,
            sort_order = excluded.sort_order",
    )?;
    for link in links {
        stmt.execute(rusqlite::params![
            link.id,
            workspace_id,
            link.url,
            link.title,
            link.domain,
            link.is_favorite,
            link.thumbnail_url,
            link.order,
        ])?;
    }
    Ok(())
}

fn upsert_attributes(
    tx: &Transaction,
    attributes: &[Attribute],
    workspace_id: &str,
) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO attributes (id, workspace_id, name, kind, is_default, condition)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(workspace_id, id) DO UPDATE SET
            name = excluded.name,
            kind = excluded.kind,
            is_default = excluded.is_default,
            condition = excluded.condition",
    )?;
    for attribute in attributes {
        stmt.execute(rusqlite::params![
            attribute.id,
            workspace_id,
            attribute.name,
            attribute.kind,
            attribute.is_default,
            attribute.condition,
        ])?;
    }
    Ok(())
}

fn map_link_row(row: &rusqlite::Row) -> rusqlite::Result<LinkItem> {
    Ok(LinkItem {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        domain: row.get(3)?,
        is_favorite: row.get(4)?,
        thumbnail_url: row.get(5)?,
        order: row.get(6)?,
    })
}

fn map_attribute_row(row: &rusqlite::Row) -> rusqlite::Result<Attribute> {
    Ok(Attribute {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        is_default: row.get(3)?,
        condition: row.get(4)?,
    })
}

impl ToSql for AttributeKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AttributeKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}
