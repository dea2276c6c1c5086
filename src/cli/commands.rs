use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `context-engine` - plan a goal into agent steps and run them.
#[derive(Parser, Debug)]
#[command(name = "context-engine")]
#[command(version)]
#[command(about = "Plans a goal into agent steps and executes them with a full trace.", long_about = None)]
pub struct Cli {
    /// Log at debug level regardless of config
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan and execute a goal, then print the final output and trace summary
    Run {
        /// Natural-language goal
        goal: String,

        /// Write the full JSON trace to this file
        #[arg(long)]
        trace_out: Option<PathBuf>,

        /// Print the full JSON trace instead of the summary
        #[arg(long)]
        json: bool,
    },

    /// Generate and print a plan without executing it
    Plan {
        /// Natural-language goal
        goal: String,
    },

    /// List registered agents and their inputs
    Agents,
}
