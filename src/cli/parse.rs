//! CLI parse: clap types for Visitplan. No behavior; definitions only.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Visitplan CLI - Follow-up visit scheduling for outbreak contact monitoring
#[derive(Parser)]
#[command(name = "visitplan")]
#[command(about = "Generate and reconcile follow-up visits for monitored contacts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load outbreaks, locations, teams, contacts and follow-ups from a JSON dataset
    Import {
        /// Dataset file
        #[arg(long)]
        file: PathBuf,
    },
    /// Generate follow-ups for every eligible contact of an outbreak
    Generate {
        /// Outbreak id
        #[arg(long)]
        outbreak: String,
        /// First day to plan (YYYY-MM-DD); defaults to today
        #[arg(long)]
        start_date: Option<String>,
        /// Last day to plan (YYYY-MM-DD); defaults to the outbreak follow-up period
        #[arg(long)]
        end_date: Option<String>,
        /// Mark new visits as targeted
        #[arg(long)]
        targeted: Option<bool>,
        /// Replace existing future visits instead of topping them up
        #[arg(long)]
        overwrite_existing: Option<bool>,
        /// Reuse each contact's current team for every new visit
        #[arg(long)]
        keep_team_assignment: Option<bool>,
        /// Restrict to these contacts (comma separated)
        #[arg(long = "contact", value_delimiter = ',')]
        contacts: Vec<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Apply one patch to every follow-up matching a filter
    BulkModify {
        #[command(flatten)]
        filter: FilterArgs,
        /// New status (not_performed, seen_ok, seen_not_ok, missed, declined)
        #[arg(long)]
        set_status: Option<String>,
        /// New team id
        #[arg(long, conflicts_with = "clear_team")]
        set_team: Option<String>,
        /// Remove the team assignment
        #[arg(long)]
        clear_team: bool,
        /// New targeted flag
        #[arg(long)]
        set_targeted: Option<bool>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List follow-ups matching a filter
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

/// Follow-up selection shared by `bulk-modify` and `list`.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Outbreak id
    #[arg(long)]
    pub outbreak: String,
    /// Restrict to these contacts (comma separated)
    #[arg(long = "contact", value_delimiter = ',')]
    pub contacts: Vec<String>,
    /// First day (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub from: Option<String>,
    /// Last day (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub to: Option<String>,
    /// Only visits assigned to this team
    #[arg(long)]
    pub team: Option<String>,
    /// Only visits in this status
    #[arg(long)]
    pub status: Option<String>,
}
