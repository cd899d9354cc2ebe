//! # Weekly CLI Module
//!
//! This module implements the CLI interface for Weekly.
//!
//! ## Available Commands
//!
//! - `init` - Create the local database and seed the default admin
//! - `login` / `logout` / `whoami` - Session management
//! - `user` - Account administration (admin)
//! - `config` - Domain/brand/model/baseline/module catalog
//! - `report` - Create, edit, submit and compose reports
//! - `query` - Filter, page and export reports
//! - `stats` - Dashboard counters
//! - `cleanup` - Drop old submitted reports (admin)
//! - `sync` - Push to / pull from the remote store

mod commands;

use crate::settings::Settings;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use weekly_core::{
    Collection, ConfigGraph, ContentEntry, Level, NodeRefs, RecordId, ReportStatus, Repository,
    Role, Selection, WeeklyError,
};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Weekly - weekly work reports with a domain/brand/model/baseline catalog
/// and remote sync.
#[derive(Parser, Debug)]
#[command(name = "weekly")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Settings file (default: ./weekly.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the local database (overrides settings)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long = "json", global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the local database
    Init {
        /// Remove an existing database first
        #[arg(short, long)]
        force: bool,
    },

    /// Sign in
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Manage user accounts (admin)
    #[command(subcommand)]
    User(UserCommand),

    /// Manage the configuration catalog
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Work with reports
    #[command(subcommand)]
    Report(ReportCommand),

    /// Filter reports, page through them or export them
    Query(QueryArgs),

    /// Show dashboard counters
    Stats,

    /// Delete submitted reports older than N days (admin)
    Cleanup {
        #[arg(long, default_value_t = weekly_core::primitives::RETENTION_DAYS)]
        days: i64,
    },

    /// Synchronize with the remote store
    #[command(subcommand)]
    Sync(SyncCommand),
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// List accounts
    List,

    /// Create an account
    Add {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "")]
        email: String,

        #[arg(long, default_value = "user")]
        role: Role,
    },

    /// Change an account
    Edit {
        id: RecordId,

        #[arg(short, long)]
        username: Option<String>,

        #[arg(short, long)]
        password: Option<String>,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        email: Option<String>,

        #[arg(long)]
        role: Option<Role>,
    },

    /// Delete an account
    Remove { id: RecordId },
}

/// Reference flags shared by `config add` and `config edit`.
#[derive(Args, Debug, Default)]
pub struct RefArgs {
    /// Domain ids (brands, modules)
    #[arg(long = "domain")]
    pub domains: Vec<RecordId>,

    /// Owning brand id (models)
    #[arg(long)]
    pub brand: Option<RecordId>,

    /// Model ids (baselines)
    #[arg(long = "model")]
    pub models: Vec<RecordId>,

    /// Baseline ids (models)
    #[arg(long = "baseline")]
    pub baselines: Vec<RecordId>,

    /// Start from every candidate parent
    #[arg(long)]
    pub all_parents: bool,
}

impl RefArgs {
    fn is_empty(&self) -> bool {
        self.domains.is_empty()
            && self.brand.is_none()
            && self.models.is_empty()
            && self.baselines.is_empty()
            && !self.all_parents
    }

    /// Build the node references, starting from the level defaults when
    /// `--all-parents` is given.
    pub fn into_refs(self, graph: &ConfigGraph, level: Level) -> NodeRefs {
        let mut refs = if self.all_parents {
            graph.default_refs(level)
        } else {
            NodeRefs::default()
        };
        refs.domain_ids.extend(self.domains);
        refs.model_ids.extend(self.models);
        refs.baseline_ids.extend(self.baselines);
        if self.brand.is_some() {
            refs.brand_id = self.brand;
        }
        refs
    }

    /// `None` when no reference flag was given.
    pub fn into_patch(self, graph: &ConfigGraph, level: Level) -> Option<NodeRefs> {
        (!self.is_empty()).then(|| self.into_refs(graph, level))
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// List nodes of a level, optionally under a parent
    List {
        level: Level,

        #[arg(long)]
        parent: Option<RecordId>,
    },

    /// Add a node
    Add {
        level: Level,

        #[arg(short, long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        #[command(flatten)]
        refs: RefArgs,
    },

    /// Change a node
    Edit {
        level: Level,

        id: RecordId,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[command(flatten)]
        refs: RefArgs,
    },

    /// Delete a node
    Remove {
        level: Level,

        id: RecordId,

        /// Delete even if other nodes still reference it
        #[arg(short, long)]
        force: bool,
    },
}

/// Domain/brand/model/baseline flags.
#[derive(Args, Debug, Default, Clone)]
pub struct SelectionArgs {
    #[arg(long)]
    pub domain: Option<RecordId>,

    #[arg(long)]
    pub brand: Option<RecordId>,

    #[arg(long)]
    pub model: Option<RecordId>,

    #[arg(long)]
    pub baseline: Option<RecordId>,
}

impl SelectionArgs {
    fn is_empty(&self) -> bool {
        self.domain.is_none() && self.brand.is_none() && self.model.is_none() && self.baseline.is_none()
    }

    pub fn into_selection(self) -> Selection {
        Selection {
            domain_id: self.domain,
            brand_id: self.brand,
            model_id: self.model,
            baseline_id: self.baseline,
        }
    }
}

/// Parse `module-id=work text`.
fn parse_entry(s: &str) -> Result<ContentEntry, String> {
    let (module, text) = s
        .split_once('=')
        .ok_or_else(|| format!("expected MODULE_ID=TEXT, got '{s}'"))?;
    let module = module.trim();
    if module.is_empty() {
        return Err("module id is empty".to_string());
    }
    Ok(ContentEntry::new(module, text.trim()))
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Create a report
    New {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Start date (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// End date (default: the start date)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Work content as MODULE_ID=TEXT (repeatable)
        #[arg(short, long = "module", value_parser = parse_entry)]
        modules: Vec<ContentEntry>,

        /// Submit instead of saving a draft
        #[arg(long)]
        submit: bool,
    },

    /// Change a report
    Edit {
        id: RecordId,

        #[command(flatten)]
        selection: SelectionArgs,

        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,

        /// Remove both dates
        #[arg(long, conflicts_with_all = ["date", "end"])]
        clear_dates: bool,

        /// Replace the work content (repeatable MODULE_ID=TEXT)
        #[arg(short, long = "module", value_parser = parse_entry)]
        modules: Vec<ContentEntry>,

        #[arg(long)]
        status: Option<ReportStatus>,
    },

    /// Submit a draft
    Submit { id: RecordId },

    /// Delete a report
    Remove {
        id: RecordId,

        /// Also delete the remote copy
        #[arg(long)]
        remote: bool,
    },

    /// Show one report
    Show { id: RecordId },

    /// Most recently updated reports
    Recent,

    /// Compose a report interactively from stdin with autosave
    Compose(ComposeArgs),
}

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Continue an existing report
    #[arg(long)]
    pub report: Option<RecordId>,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Report date (default: today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Submit when input ends
    #[arg(long)]
    pub submit: bool,
}

/// Export format of `query`.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One page as a table
    #[default]
    Table,
    /// Full result as a text document
    Text,
    /// Full result as CSV
    Csv,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Owner id (admins only; ignored for other users)
    #[arg(long)]
    pub user: Option<RecordId>,

    #[command(flatten)]
    pub selection: SelectionArgs,

    #[arg(long)]
    pub status: Option<ReportStatus>,

    /// Earliest start date
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Latest end date
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Page number for table output
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write text/CSV output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parse_synced_collection(s: &str) -> Result<Collection, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "users" | "user" => Ok(Collection::Users),
        "reports" | "report" => Ok(Collection::Reports),
        "config" => Ok(Collection::Config),
        other => Err(format!("unknown collection '{other}'")),
    }
}

#[derive(Subcommand, Debug)]
pub enum SyncCommand {
    /// Upload local records that are newer than the remote copies
    Push,

    /// Replace local data with the remote copies
    Pull,

    /// Show the remote copy of one record
    Inspect {
        #[arg(value_parser = parse_synced_collection)]
        collection: Collection,

        id: RecordId,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), WeeklyError> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        settings.database = database;
    }
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Init { force } => cmd_init(&settings, json_mode, force),
        Commands::Login { username, password } => {
            cmd_login(&mut open_repository(&settings)?, json_mode, &username, &password)
        }
        Commands::Logout => cmd_logout(&mut open_repository(&settings)?, json_mode),
        Commands::Whoami => cmd_whoami(&open_repository(&settings)?, json_mode),
        Commands::User(command) => cmd_user(&mut open_repository(&settings)?, json_mode, command),
        Commands::Config(command) => {
            cmd_config(&mut open_repository(&settings)?, json_mode, command)
        }
        Commands::Report(command) => {
            cmd_report(open_repository(&settings)?, &settings, json_mode, command).await
        }
        Commands::Query(args) => cmd_query(&open_repository(&settings)?, json_mode, args),
        Commands::Stats => cmd_stats(&open_repository(&settings)?, json_mode),
        Commands::Cleanup { days } => cmd_cleanup(&mut open_repository(&settings)?, json_mode, days),
        Commands::Sync(command) => {
            cmd_sync(&mut open_repository(&settings)?, &settings, json_mode, command).await
        }
    }
}

fn open_repository(settings: &Settings) -> Result<Repository, WeeklyError> {
    let repo = Repository::open(&settings.database)?;
    tracing::debug!(database = %settings.database.display(), "repository loaded");
    Ok(repo)
}
