use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "caleanna")]
#[command(version, about = "A local-first link shelf with workspaces and portable exports")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file to use instead of the one in the settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Workspace to operate on for this invocation only
    #[arg(long, short = 'w', global = true, value_name = "ID")]
    pub workspace: Option<String>,

    /// More log output (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage workspaces
    Workspace(WorkspaceCommand),

    /// Manage links in the current workspace
    Link(LinkCommand),

    /// Show the links of the current workspace
    List {
        #[command(flatten)]
        view: ViewArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage sort and filter attributes
    Attribute(AttributeCommand),

    /// Export the current workspace as an import URL
    Export {
        /// Origin for the URL (defaults to the shareBaseUrl setting)
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,

        /// Print only the token, not the full URL
        #[arg(long)]
        token_only: bool,
    },

    /// Import a workspace from a token or import URL and select it
    Import {
        /// Token or full import URL
        token: String,
    },

    /// Append links from a plain-text file ("-" reads stdin)
    ImportTxt {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

/// The sort/filter/search criteria that define the displayed sequence.
#[derive(Args, Debug, Default, Clone)]
pub struct ViewArgs {
    /// Sort attribute name (Custom, Newest, Oldest, Domain, Name or a user sort)
    #[arg(long, short = 's')]
    pub sort: Option<String>,

    /// Filter attribute name (Favorites or a user filter)
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Keep only links whose title or URL contains this text
    #[arg(long, short = 'q')]
    pub search: Option<String>,
}

#[derive(Args, Debug)]
pub struct WorkspaceCommand {
    #[command(subcommand)]
    pub action: WorkspaceAction,
}

#[derive(Subcommand, Debug)]
pub enum WorkspaceAction {
    /// List workspaces, default first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a workspace
    Add { name: String },

    /// Delete a workspace with all of its links and attributes
    Delete { id: String },

    /// Make a workspace the current one
    Select { id: String },
}

#[derive(Args, Debug)]
pub struct LinkCommand {
    #[command(subcommand)]
    pub action: LinkAction,
}

#[derive(Subcommand, Debug)]
pub enum LinkAction {
    /// Add a link at the end of the custom order
    Add {
        url: String,

        /// Link title (defaults to the URL)
        title: Option<String>,

        /// Thumbnail image URL
        #[arg(long)]
        thumbnail: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a link's URL, title or thumbnail
    Edit {
        id: String,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, conflicts_with = "clear_thumbnail")]
        thumbnail: Option<String>,

        /// Remove the thumbnail
        #[arg(long)]
        clear_thumbnail: bool,
    },

    /// Delete a link
    Delete { id: String },

    /// Toggle a link's favourite flag
    Favorite { id: String },

    /// Move a link within the displayed list and save the result as the custom order
    Move {
        /// Current position (0-based) in the displayed list
        from: usize,

        /// New position (0-based)
        to: usize,

        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Args, Debug)]
pub struct AttributeCommand {
    #[command(subcommand)]
    pub action: AttributeAction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Sort,
    Filter,
}

#[derive(Subcommand, Debug)]
pub enum AttributeAction {
    /// List the sort and filter catalogs
    List {
        /// Only list one kind
        #[arg(long, value_enum)]
        kind: Option<KindArg>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a user-defined attribute
    Add {
        name: String,

        #[arg(long, value_enum)]
        kind: KindArg,

        /// Rule expression, e.g. 'item.url.includes("docs")' or 'a.title.localeCompare(b.title)'
        #[arg(long)]
        condition: Option<String>,
    },

    /// Delete a user-defined attribute
    Delete { id: String },
}
