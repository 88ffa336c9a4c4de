//! Command-line interface definitions.
//!
//! Global options override the YAML configuration; each can also come from an
//! environment variable.
//!
//! ```sh
//! # Summarize a page now and keep it queued for reading
//! web_page_summaries submit https://example.com/article --ratio 0.3
//!
//! # Queue a page for later and summarize the backlog
//! web_page_summaries enqueue https://example.com/other
//! web_page_summaries process
//!
//! # Read everything aloud (to the console), deleting each summary once read
//! web_page_summaries read
//!
//! # Serve the queue over HTTP and read from it elsewhere
//! web_page_summaries serve --bind 0.0.0.0:8000
//! web_page_summaries --remote-url http://host:8000 read
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to config.yaml
    #[arg(short, long, env = "WEB_PAGE_SUMMARIES_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database holding the queue
    #[arg(short, long, env = "WEB_PAGE_SUMMARIES_DB")]
    pub database: Option<PathBuf>,

    /// Read from the queue served at this URL instead of the local database
    #[arg(long, env = "WEB_PAGE_SUMMARIES_REMOTE_URL")]
    pub remote_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Queue a page and summarize it immediately
    Submit {
        url: String,
        /// Fraction of the page's sentences to keep, between 0 and 1 exclusive
        #[arg(short, long)]
        ratio: Option<f64>,
    },
    /// Queue a page to be summarized by the next `process`
    Enqueue { url: String },
    /// Summarize every pending page
    Process,
    /// List queued pages
    List {
        /// Only pages whose summary is ready
        #[arg(long)]
        ready: bool,
    },
    /// Remove a page from the queue
    Delete { url: String },
    /// Read every ready summary, deleting each once it has been read
    Read {
        /// Do not ask before moving on to the next summary
        #[arg(short, long)]
        yes: bool,
    },
    /// Wait for spoken commands on standard input ("read summaries", "stop")
    Listen,
    /// Serve the queue over HTTP
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,
    },
}
