//! CLI argument parsing using clap.
//!
//! Contains the Cli struct, Commands enum, and all subcommand enums.

use clap::{
    ArgAction, Args, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Documents whose metadata lives in their filenames
#[derive(Parser, Debug)]
#[command(
    name = "docname",
    version = env!("CARGO_PKG_VERSION"),
    about = "Manage a directory of documents named YYYYMMDD-COUNTRY-GROUP-SENTBY-PURPOSE-concept-SENTTO.ext",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Repository directory (defaults to `repository` from settings, then the current directory)
    #[arg(short = 'C', long, global = true)]
    pub repository: Option<PathBuf>,

    /// More log output: -v info, -vv debug, -vvv trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Minimum log level requested with `-v` flags.
    pub fn log_level(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("info"),
            2 => Some("debug"),
            _ => Some("trace"),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a repository (metadata directory and catalogs)
    Init {
        /// Directory to initialize (defaults to the repository option)
        path: Option<PathBuf>,

        /// Also write a default settings.toml
        #[arg(long)]
        write_config: bool,

        /// Overwrite an existing settings.toml
        #[arg(short, long, requires = "write_config")]
        force: bool,
    },

    /// List documents matching filters
    List(ListArgs),

    /// Copy files into the repository under their normalized names
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Rename a document
    Rename { from: String, to: String },

    /// Change individual metadata fields of a document
    Edit(EditArgs),

    /// Delete a document
    Delete { name: String },

    /// Inspect and edit vocabulary catalogs
    Vocab {
        #[command(subcommand)]
        action: VocabAction,
    },

    /// Poll the repository and print events until Ctrl-C
    Watch {
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Display active settings
    Config,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Case-insensitive text to search for
    #[arg(short, long)]
    pub text: Option<String>,

    /// Earliest date (YYYYMMDD, `today` or `now`)
    #[arg(long, conflicts_with = "undated")]
    pub from: Option<String>,

    /// Latest date (YYYYMMDD, `today` or `now`)
    #[arg(long, conflicts_with = "undated")]
    pub to: Option<String>,

    /// Only documents without a valid date
    #[arg(long)]
    pub undated: bool,

    /// Country key, `any` or `none`
    #[arg(long, value_name = "KEY")]
    pub country: Option<String>,

    /// Group key, `any` or `none`
    #[arg(long, value_name = "KEY")]
    pub group: Option<String>,

    /// Sender key, `any` or `none`
    #[arg(long, value_name = "KEY")]
    pub sent_by: Option<String>,

    /// Purpose key, `any` or `none`
    #[arg(long, value_name = "KEY")]
    pub purpose: Option<String>,

    /// Recipient key, `any` or `none`
    #[arg(long, value_name = "KEY")]
    pub sent_to: Option<String>,

    /// Show inactive documents that need attention instead
    #[arg(long)]
    pub review: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Current document name
    pub name: String,

    /// New date (YYYYMMDD)
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long, value_name = "KEY")]
    pub country: Option<String>,

    #[arg(long, value_name = "KEY")]
    pub group: Option<String>,

    #[arg(long, value_name = "KEY")]
    pub sent_by: Option<String>,

    #[arg(long, value_name = "KEY")]
    pub purpose: Option<String>,

    /// Free text; spaces become underscores
    #[arg(long)]
    pub concept: Option<String>,

    #[arg(long, value_name = "KEY")]
    pub sent_to: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum VocabAction {
    /// Show catalog entries
    List {
        /// Field to show (all fields if omitted)
        field: Option<String>,

        /// Only keys enabled for this repository
        #[arg(long)]
        used: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a key (to `available`, or enable it with --used)
    Add {
        field: String,
        key: String,
        /// Human-readable description (defaults to the key)
        description: Option<String>,

        /// Enable the key for this repository, adding it to `available` if needed
        #[arg(long)]
        used: bool,
    },

    /// Remove a key; refused while documents reference it
    Remove {
        field: String,
        key: String,

        /// Only disable it for this repository
        #[arg(long)]
        used: bool,
    },
}
