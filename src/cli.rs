// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "enginewire")]
#[command(about = "Decode captured container engine API responses")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a config file (default: discovered in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Demultiplex a captured raw-stream body
    Demux {
        /// File holding the captured body
        file: PathBuf,

        /// Content type of the response (defaults to the raw-stream type)
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Decode a captured JSON body
    Json {
        /// File holding the captured body
        file: PathBuf,

        /// Treat the body as a chunked sequence of JSON values
        #[arg(long)]
        chunked: bool,
    },

    /// Map a captured JSON object or array through a field table
    Map {
        /// Table name, e.g. container or container-inspect
        table: String,

        /// File holding the JSON document
        file: PathBuf,
    },
}
