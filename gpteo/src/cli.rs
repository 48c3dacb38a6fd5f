// gpteo/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use uuid::Uuid;

use gpteo_core::application::DEFAULT_PAGE_SIZE;

#[derive(Parser)]
#[command(name = "gpteo")]
#[command(about = "SEO and AI-discoverability scanner", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file, or a directory holding gpteo.yaml
    #[arg(long, global = true, env = "GPTEO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Owner the scans are recorded under
    #[arg(long, global = true, default_value = "local", env = "GPTEO_OWNER")]
    pub owner: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🔎 Scans a site and prints its scores
    Scan {
        /// Site being evaluated (scheme, www. and path are stripped)
        #[arg(long)]
        domain: String,

        /// Page to fetch; repeat for up to 10 pages
        #[arg(long = "url")]
        urls: Vec<String>,

        /// quick | standard | deep
        #[arg(long)]
        mode: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Also write the full result as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// 📋 Lists the active checks
    Checks,

    /// 🗂️  Lists recorded scans, newest first
    List {
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// 📄 Shows one scan with its pages and findings
    Show {
        scan_id: Uuid,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// 📊 Aggregate figures over the owner's scans
    Stats,

    /// 🗑️  Deletes a finished scan and everything it produced
    Delete { scan_id: Uuid },
}
