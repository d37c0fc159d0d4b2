use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use leadsflow::config::{CliOverrides, Config};
use leadsflow::logging;
use leadsflow_common::{LeadFlag, StageOutcome, TaskKind, TaskPriority, TaskStatus};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "leadsflow")]
#[command(version, about = "LeadsFlow CRM client: leads, funnel and tasks from the terminal")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip confirmation prompts
    #[arg(long, global = true)]
    pub yes: bool,

    /// Data directory. Defaults to LEADSFLOW_HOME, then the platform data directory.
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Backend base URL. Overrides LEADSFLOW_API_URL and leadsflow.toml.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Account user scoping device-local data. Overrides LEADSFLOW_USER.
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            home: self.home.clone(),
            api_url: self.api_url.clone(),
            user: self.user.clone(),
            verbose: self.verbose,
            yes: self.yes,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory, leadsflow.toml and the local store
    Init,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Work with leads on the backend
    Leads {
        #[command(subcommand)]
        command: LeadsCommands,
    },
    /// Show the funnel board and summary
    Board,
    /// Move a lead to a funnel stage
    Move {
        /// Lead id
        lead: String,
        /// Target stage id
        stage: String,
    },
    /// Configure funnel stages (stored on this device)
    Stages {
        #[command(subcommand)]
        command: Option<StagesCommands>,
    },
    /// Manage tasks (stored on this device)
    Tasks {
        #[command(subcommand)]
        command: Option<TasksCommands>,
    },
    /// Show or change preferences
    Prefs {
        #[command(subcommand)]
        command: Option<PrefsCommands>,
    },
    /// Track completed onboarding tours
    Tour {
        #[command(subcommand)]
        command: TourCommands,
    },
    /// Read or change account settings stored on the backend
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Refresh periodically and print the funnel summary until Ctrl-C
    Watch {
        /// Seconds between refreshes (defaults to sync.refresh_interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },
}

/// Optional lead fields shared by `leads add` and `leads edit`.
#[derive(Args, Clone, Debug, Default)]
pub struct LeadFields {
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub interest: Option<String>,
    #[arg(long)]
    pub origin: Option<String>,
    /// Deal value
    #[arg(long)]
    pub value: Option<f64>,
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Subcommand, Clone)]
pub enum LeadsCommands {
    /// List leads, optionally only those in one stage
    List {
        #[arg(long)]
        stage: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one lead
    Show { id: String },
    /// Create a lead
    Add {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        fields: LeadFields,
    },
    /// Change fields of a lead
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: LeadFields,
    },
    /// Set a lead's status
    Status { id: String, status: String },
    /// Turn a flag on (or off with --off): favorite, ai
    Flag {
        id: String,
        flag: LeadFlag,
        #[arg(long)]
        off: bool,
    },
    /// Delete one or more leads
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Import leads from a JSON array file
    Import { file: PathBuf },
    /// Remove duplicate leads on the backend
    Dedupe {
        /// Only list the duplicate groups found locally
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum StagesCommands {
    /// List stages in board order
    List,
    /// Add a custom stage at the end
    Add {
        label: String,
        #[arg(long, default_value = "#64748b")]
        color: String,
    },
    Rename { id: String, label: String },
    Color { id: String, color: String },
    /// Mark a stage as open, won or lost
    Outcome { id: String, outcome: StageOutcome },
    Remove { id: String },
    /// Move a stage between 1-based positions
    Move { from: usize, to: usize },
    /// Restore the default stages
    Reset,
}

#[derive(Subcommand, Clone)]
pub enum TasksCommands {
    /// List tasks in agenda order
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        lead: Option<String>,
        #[arg(long)]
        kind: Option<TaskKind>,
    },
    Add {
        title: String,
        #[arg(long, default_value = "follow_up")]
        kind: TaskKind,
        #[arg(long, default_value = "medium")]
        priority: TaskPriority,
        /// Due date: YYYY-MM-DD or RFC 3339
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        lead: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Edit {
        /// Task id or unique id prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        kind: Option<TaskKind>,
        #[arg(long)]
        priority: Option<TaskPriority>,
        #[arg(long)]
        due: Option<String>,
        /// Remove the due date
        #[arg(long, conflicts_with = "due")]
        no_due: bool,
    },
    Done { id: String },
    Cancel { id: String },
    Reopen { id: String },
    Remove { id: String },
    /// Open tasks past their due date
    Overdue,
    /// Tasks due today (UTC)
    Today,
}

#[derive(Subcommand, Clone)]
pub enum PrefsCommands {
    Show,
    /// Keys: theme (light|dark|system), sidebar_open (true|false), language
    Set { key: String, value: String },
}

#[derive(Subcommand, Clone)]
pub enum TourCommands {
    /// Mark a tour as completed
    Done { name: String },
    /// Show whether a tour was completed
    Status { name: String },
}

#[derive(Subcommand, Clone)]
pub enum SettingsCommands {
    /// Print all settings or one key
    Get { key: Option<String> },
    /// Set a key. The value is parsed as JSON, falling back to a string.
    Set { key: String, value: String },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default leadsflow.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.overrides())?;
    let _log_guard = logging::init(
        cli.verbose,
        config.home.exists().then_some(config.log_dir.as_path()),
    );

    match &cli.command {
        Commands::Init => cmd::cmd_init(&config)?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
        Commands::Leads { command } => cmd::cmd_leads(&config, command.clone()).await?,
        Commands::Board => cmd::cmd_board(&config).await?,
        Commands::Move { lead, stage } => cmd::cmd_move(&config, lead, stage).await?,
        Commands::Stages { command } => cmd::cmd_stages(&config, command.clone())?,
        Commands::Tasks { command } => cmd::cmd_tasks(&config, command.clone())?,
        Commands::Prefs { command } => cmd::cmd_prefs(&config, command.clone())?,
        Commands::Tour { command } => cmd::cmd_tour(&config, command.clone())?,
        Commands::Settings { command } => cmd::cmd_settings(&config, command.clone()).await?,
        Commands::Watch { interval } => cmd::cmd_watch(&config, *interval).await?,
    }

    Ok(())
}
