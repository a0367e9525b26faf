use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "fnote")]
#[command(about = "Check and normalize footnote markup")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
    /// Editor settings file (defaults are used if omitted)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report numbering problems and elements that could not be placed
    Check {
        /// Markup file to check
        file: PathBuf,
    },
    /// Rewrite a document as canonical markup
    Normalize {
        /// Markup file to read
        file: PathBuf,

        /// Where to write the result (stdout if omitted)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Repair footnote ids so they run 1..N in list order
        #[arg(long)]
        renumber: bool,
    },
    /// Print the live editing view of a document
    Live {
        /// Markup file to render
        file: PathBuf,
    },
}
