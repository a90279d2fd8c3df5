use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "codebook", version, about = "Codebook tree, progress and gold-unit tooling")]
pub struct Cli {
    /// Emit compact JSON on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Engine configuration file (JSON EngineConfig).
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace). Overrides RUST_LOG.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Validate a node snapshot and print a summary.
    Check {
        /// Node rows (JSON array).
        nodes: String,
    },

    /// Print the nested order and the position write-backs.
    Sort { nodes: String },

    /// Print the assembled phases and variables.
    Phases { nodes: String },

    /// Unfold the questions of a phase for one unit.
    Unfold {
        nodes: String,
        /// Unit record (JSON).
        #[arg(long)]
        unit: String,
        /// Phase index (default: every phase).
        #[arg(long)]
        phase: Option<usize>,
    },

    /// Compute the progress state of a session.
    Progress {
        nodes: String,
        /// Unit completion per phase: {"unitsDone": {"<phaseId>": [bool, ...]}}.
        #[arg(long)]
        unit_progress: String,
        /// Survey answers (JSON array of annotations).
        #[arg(long)]
        annotations: Option<String>,
    },

    /// Evaluate submitted annotations against the conditionals of a gold unit.
    Evaluate {
        #[arg(long)]
        unit: String,
        #[arg(long)]
        annotations: String,
        /// Damage accumulated earlier in the session.
        #[arg(long, default_value_t = 0.0)]
        damage: f64,
        #[arg(long)]
        max_damage: Option<f64>,
    },

    /// Move a node under a new parent.
    Move {
        nodes: String,
        #[arg(long)]
        node: i64,
        /// New parent id; omit to make the node a root.
        #[arg(long)]
        parent: Option<i64>,
        /// Index among the new siblings; omit to append.
        #[arg(long)]
        slot: Option<usize>,
    },

    /// Delete a node.
    Delete {
        nodes: String,
        #[arg(long)]
        node: i64,
        #[arg(long)]
        recursive: bool,
    },
}
