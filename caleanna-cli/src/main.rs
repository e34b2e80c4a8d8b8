mod commands;
mod handlers;
mod settings;

use std::fs;
use std::path::PathBuf;

use caleanna_core::{CaleannaError, Result, Session, Storage};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::{AttributeAction, Cli, Commands, LinkAction, WorkspaceAction};
use handlers::*;
use settings::{load_settings, save_settings, AppSettings};

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(command: Commands, session: &mut Session, settings: &AppSettings) -> Result<()> {
    match command {
        Commands::Workspace(ws) => match ws.action {
            WorkspaceAction::List { json } => handle_workspace_list(session, json),
            WorkspaceAction::Add { name } => handle_workspace_add(session, &name),
            WorkspaceAction::Delete { id } => handle_workspace_delete(session, &id),
            WorkspaceAction::Select { id } => handle_workspace_select(session, &id),
        },
        Commands::Link(link) => match link.action {
            LinkAction::Add {
                url,
                title,
                thumbnail,
                json,
            } => handle_link_add(session, &url, title.as_deref(), thumbnail, json),
            LinkAction::Edit {
                id,
                url,
                title,
                thumbnail,
                clear_thumbnail,
            } => handle_link_edit(session, &id, url, title, thumbnail, clear_thumbnail),
            LinkAction::Delete { id } => handle_link_delete(session, &id),
            LinkAction::Favorite { id } => handle_link_favorite(session, &id),
            LinkAction::Move { from, to, view } => handle_link_move(session, from, to, &view),
        },
        Commands::List { view, json } => handle_list(session, &view, json),
        Commands::Attribute(attr) => match attr.action {
            AttributeAction::List { kind, json } => handle_attribute_list(session, kind, json),
            AttributeAction::Add {
                name,
                kind,
                condition,
            } => handle_attribute_add(session, &name, kind, condition.as_deref()),
            AttributeAction::Delete { id } => handle_attribute_delete(session, &id),
        },
        Commands::Export {
            base_url,
            token_only,
        } => {
            let base_url = base_url.as_deref().unwrap_or(&settings.share_base_url);
            handle_export(session, base_url, token_only)
        }
        Commands::Import { token } => handle_import(session, &token),
        Commands::ImportTxt { path } => handle_import_txt(session, &path),
    }
}

fn run(cli: Cli, settings: &mut AppSettings) -> Result<()> {
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.database_path));
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    log::debug!("opening store at {}", db_path.display());

    let requested = cli.workspace.as_deref().or(settings.current_workspace.as_deref());
    let mut session = Session::open(Storage::at(&db_path), requested)?;
    if let Some(wanted) = &cli.workspace {
        if &session.current_workspace().id != wanted {
            return Err(CaleannaError::WorkspaceNotFound(wanted.clone()));
        }
    }

    let selected_before = session.current_workspace().id.clone();
    let outcome = dispatch(cli.command, &mut session, settings);

    // A one-off --workspace does not become the remembered selection unless the
    // command itself switched workspaces.
    let selected = session.current_workspace().id.clone();
    let changed = selected != selected_before;
    if changed || (cli.workspace.is_none() && settings.current_workspace.as_ref() != Some(&selected)) {
        settings.current_workspace = Some(selected);
        if let Err(e) = save_settings(settings) {
            log::warn!("could not remember the selected workspace: {e}");
        }
    }

    session.close()?;
    outcome
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = load_settings();
    if let Err(e) = run(cli, &mut settings) {
        log::debug!("{e:?}");
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}
