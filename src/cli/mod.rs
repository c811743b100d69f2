//! CLI module for silver-anno.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// silver-anno - LLM silver-standard annotation of broadcast OCR text
///
/// Tags the names and roles found in chyron and credit frames with indexed
/// role/filler labels by prompting a hosted language model.
#[derive(Parser, Debug)]
#[command(name = "silver-anno")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Annotate a CSV of OCR rows and move it to the output directory
    Annotate {
        /// Input CSV file path
        #[arg(long = "input-file", visible_alias = "input_file")]
        input_file: String,

        /// Directory to write the annotated table to
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Keep the input file after writing the output
        #[arg(long)]
        keep_input: bool,

        /// Model provider (anthropic, openai)
        #[arg(long)]
        provider: Option<String>,

        /// Model identifier
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Check annotations in a CSV against the role/filler tag format
    Validate {
        /// Annotated CSV file path
        input: String,

        /// Column holding the annotations
        #[arg(long, default_value = "silver_standard_annotation")]
        column: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
