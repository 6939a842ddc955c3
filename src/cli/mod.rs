use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod handlers;

pub use handlers::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to config file. Created with defaults when missing.
    #[clap(long, global = true, env = "VIDLINK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve urls into playable embeds and print the results as json
    Resolve {
        #[clap(required = true, allow_hyphen_values = true)]
        urls: Vec<String>,

        /// Do not query oEmbed or page metadata when the embed is known from the url
        #[clap(long, default_value = "false")]
        no_metadata: bool,

        /// Print the enrichment report to stderr
        #[clap(long, default_value = "false")]
        report: bool,
    },

    /// Show which provider a url is classified as. No network access.
    Classify {
        url: String,

        /// Also print the rule order
        #[clap(short, long, default_value = "false")]
        verbose: bool,
    },

    /// Search YouTube videos (requires youtube_api_key)
    Search {
        query: String,

        /// Number of results, 1 to 50
        #[clap(short, long)]
        limit: Option<u32>,
    },

    /// Start vidlink as a service.
    Daemon {
        /// Address to listen on, overrides `listen` from config
        #[clap(long)]
        listen: Option<String>,
    },
}
