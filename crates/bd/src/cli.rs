//! CLI argument definitions (clap derive).

use clap::{Args, Parser, Subcommand};

/// bd -- a local-first, git-synchronized bead (issue) tracker.
#[derive(Parser)]
#[command(name = "bd", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags accepted by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Path to the .beads directory (overrides discovery).
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Actor name recorded on writes.
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Emit JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a beads workspace in the current directory.
    Init(InitArgs),
    /// Create a new bead.
    Create(CreateArgs),
    /// Update fields on a bead.
    Update(UpdateArgs),
    /// Close a bead.
    Close(CloseArgs),
    /// Reopen a closed bead.
    Reopen(IdArg),
    /// Assign a bead to someone.
    Assign(AssignArgs),
    /// Show one bead.
    Show(IdArg),
    /// List beads.
    List(ListArgs),
    /// Search beads by text.
    Search(SearchArgs),
    /// List beads that are ready to work on.
    Ready(ListArgs),
    /// List beads not touched for N days.
    Stale(StaleArgs),
    /// Delete a bead and record a deletion marker.
    Delete(IdArg),
    /// Manage dependencies.
    Dep(DepArgs),
    /// Manage labels.
    Label(LabelArgs),
    /// Export the database to the JSONL journal.
    Export(ExportArgs),
    /// Import a JSONL journal into the database.
    Import(ImportArgs),
    /// Run a sync cycle, or inspect/set the sync mode.
    Sync(SyncArgs),
    /// List known issue types.
    Types,
    /// Define custom types and type schemas.
    #[command(name = "type")]
    TypeCmd(TypeArgs),
    /// Human-in-the-loop decision points.
    Decision(DecisionArgs),
    /// Workflow formulas stored as beads.
    Formula(FormulaArgs),
    /// Get or set configuration values.
    Config(ConfigArgs),
    /// Run or inspect the workspace daemon.
    Daemon(DaemonArgs),
}

// ---------------------------------------------------------------------------
// Shared argument shapes
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct IdArg {
    /// Bead ID (full, or a unique fragment).
    pub id: String,
}

#[derive(Args)]
pub struct InitArgs {
    /// Workspace ID prefix (defaults to the directory name).
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Bead title.
    pub title: String,

    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Issue type (task, bug, feature, chore, epic, or a custom type).
    #[arg(short = 't', long = "type", default_value = "task")]
    pub issue_type: String,

    /// Priority 0-4 (0 = highest).
    #[arg(short, long, default_value_t = 2)]
    pub priority: i32,

    /// Labels (repeatable).
    #[arg(short, long)]
    pub label: Vec<String>,

    #[arg(long)]
    pub assignee: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    #[arg(short = 't', long = "type")]
    pub issue_type: Option<String>,

    #[arg(short, long)]
    pub priority: Option<i32>,

    /// Status (open, in_progress, blocked, closed).
    #[arg(short, long)]
    pub status: Option<String>,

    #[arg(long)]
    pub assignee: Option<String>,

    /// External tracker reference URL.
    #[arg(long)]
    pub external_ref: Option<String>,
}

#[derive(Args)]
pub struct CloseArgs {
    pub id: String,

    #[arg(short, long, default_value = "")]
    pub reason: String,
}

#[derive(Args)]
pub struct AssignArgs {
    pub id: String,
    pub assignee: String,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(short, long)]
    pub status: Option<String>,

    #[arg(short = 't', long = "type")]
    pub issue_type: Option<String>,

    #[arg(short, long)]
    pub priority: Option<i32>,

    #[arg(long)]
    pub assignee: Option<String>,

    #[arg(short, long)]
    pub label: Option<String>,

    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct SearchArgs {
    pub query: String,

    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct StaleArgs {
    /// Age threshold in days.
    #[arg(long, default_value_t = 30)]
    pub days: i64,

    #[arg(short, long)]
    pub status: Option<String>,

    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct DepArgs {
    #[command(subcommand)]
    pub command: DepCommands,
}

#[derive(Subcommand)]
pub enum DepCommands {
    /// Add an edge: ISSUE depends on DEPENDS_ON.
    Add {
        issue: String,
        depends_on: String,
        /// Edge kind: blocks, parent-child, discovered-from, related.
        #[arg(short = 't', long = "type", default_value = "blocks")]
        dep_type: String,
    },
    /// Remove an edge.
    Remove { issue: String, depends_on: String },
    /// List edges for a bead.
    List { issue: String },
}

#[derive(Args)]
pub struct LabelArgs {
    #[command(subcommand)]
    pub command: LabelCommands,
}

#[derive(Subcommand)]
pub enum LabelCommands {
    /// Add a label to a bead.
    Add { id: String, label: String },
    /// Remove a label from a bead.
    Remove { id: String, label: String },
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output path (defaults to .beads/beads.jsonl).
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Input path (defaults to the workspace journal).
    #[arg(short, long)]
    pub input: Option<String>,

    /// Compute and report without touching the store.
    #[arg(long)]
    pub dry_run: bool,

    /// Leave existing IDs untouched.
    #[arg(long)]
    pub skip_update: bool,

    /// Fail on dependency references to unknown beads.
    #[arg(long)]
    pub strict: bool,

    /// Rewrite foreign-prefix IDs to the workspace prefix.
    #[arg(long)]
    pub rename_on_import: bool,

    /// Clear external refs that already belong to another bead.
    #[arg(long)]
    pub clear_duplicate_external_refs: bool,

    /// Orphan edge handling: strict, resurrect, skip, allow.
    #[arg(long, default_value = "skip")]
    pub orphan_handling: String,

    /// Accept foreign prefixes verbatim.
    #[arg(long)]
    pub skip_prefix_validation: bool,
}

#[derive(Args)]
pub struct SyncArgs {
    #[command(subcommand)]
    pub command: Option<SyncCommands>,
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Sync mode inspection and selection.
    Mode(SyncModeArgs),
}

#[derive(Args)]
pub struct SyncModeArgs {
    #[command(subcommand)]
    pub command: SyncModeCommands,
}

#[derive(Subcommand)]
pub enum SyncModeCommands {
    /// List available sync modes.
    List,
    /// Show the configured sync mode.
    Current,
    /// Set the sync mode.
    Set { mode: String },
}

#[derive(Args)]
pub struct TypeArgs {
    #[command(subcommand)]
    pub command: TypeCommands,
}

#[derive(Subcommand)]
pub enum TypeCommands {
    /// Register a custom issue type.
    Define { name: String },
    /// Show or set the schema for a type.
    Schema {
        name: String,
        /// Require a field to be non-empty (repeatable).
        #[arg(long = "require-field")]
        require_fields: Vec<String>,
        /// Require a label matching this pattern (repeatable, * wildcards).
        #[arg(long = "require-label")]
        require_labels: Vec<String>,
    },
}

#[derive(Args)]
pub struct DecisionArgs {
    #[command(subcommand)]
    pub command: DecisionCommands,
}

#[derive(Subcommand)]
pub enum DecisionCommands {
    /// Create a decision gate.
    Create {
        /// The question put to the human.
        #[arg(long)]
        prompt: String,
        /// Gate bead title (defaults to the prompt).
        #[arg(long)]
        title: Option<String>,
        /// Option as `id:short:label` (repeatable).
        #[arg(short, long = "option")]
        options: Vec<String>,
        /// Default option id.
        #[arg(long)]
        default: Option<String>,
        /// Timeout like `30m`, `2h`, or seconds.
        #[arg(long)]
        timeout: Option<String>,
        /// Urgency hint.
        #[arg(long)]
        urgency: Option<String>,
    },
    /// Respond to a pending decision.
    Respond {
        id: String,
        /// Selected option id or shorthand.
        selected: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        rationale: Option<String>,
        #[arg(long)]
        guidance: Option<String>,
    },
    /// List pending decisions.
    List,
    /// Show one decision.
    Get { id: String },
    /// Block until a decision is responded (or the timeout passes).
    Watch {
        id: String,
        /// Wait budget like `30s`, `5m` (default 300s).
        #[arg(long)]
        timeout: Option<String>,
    },
    /// Bump the reminder counter on a pending decision.
    Remind { id: String },
    /// Agent stop-check guard: exit 0 = allow yield, exit 1 = block.
    StopCheck,
}

#[derive(Args)]
pub struct FormulaArgs {
    #[command(subcommand)]
    pub command: FormulaCommands,
}

#[derive(Subcommand)]
pub enum FormulaCommands {
    /// List stored formulas.
    List,
    /// Show a stored formula.
    Show { name: String },
    /// Convert a formula file between TOML and JSON.
    Convert {
        path: String,
        /// Target encoding: toml or json.
        #[arg(long, default_value = "json")]
        to: String,
    },
    /// Import a formula file as a bead.
    Import { path: String },
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Get a config value.
    Get { key: String },
    /// Set a config value.
    Set { key: String, value: String },
    /// List all config values.
    List,
}

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommands,
}

#[derive(Subcommand)]
pub enum DaemonCommands {
    /// Run the daemon in the foreground.
    Run {
        /// TCP listener address (e.g. 127.0.0.1:4780); requires
        /// BEADS_DAEMON_TOKEN.
        #[arg(long)]
        tcp: Option<String>,
    },
    /// Query a running daemon's health.
    Status,
}
