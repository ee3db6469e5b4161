use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "planwarden",
    about = "Planwarden: policy scripts over plan archives, run in a restricted sandbox",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a plan archive against a policy script
    Validate {
        /// Path to the plan archive
        plan: String,

        /// Policy file (TOML) with script, libraries and modules
        #[arg(long)]
        policy: Option<String>,

        /// Policy script; overrides the policy file's script
        #[arg(long)]
        script: Option<String>,

        /// Standard library to open (repeatable); replaces the configured set
        #[arg(long = "lib")]
        libs: Vec<String>,

        /// Maximum number of script operations
        #[arg(long)]
        max_operations: Option<u64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what a plan archive contains
    Inspect {
        /// Path to the plan archive
        plan: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List standard libraries and preloadable modules
    Modules {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
