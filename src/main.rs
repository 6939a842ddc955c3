use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cache;
mod cli;
mod config;
mod metadata;
mod resolver;
mod rules;
mod scrape;
mod search;
#[cfg(test)]
mod tests;
mod web;

use cli::Command;
use config::Config;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    init_logging();

    let config = Config::load_with(args.config.as_deref()).context("failed to load config")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        match args.command {
            Command::Resolve {
                urls,
                no_metadata,
                report,
            } => cli::handle_resolve(&config, urls, no_metadata, report).await,
            Command::Classify { url, verbose } => cli::handle_classify(&config, url, verbose),
            Command::Search { query, limit } => cli::handle_search(&config, query, limit).await,
            Command::Daemon { listen } => cli::handle_daemon(config, listen).await,
        }
    })
}
