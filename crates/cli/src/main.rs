//! offcache operator tool.
//!
//! Inspects and purges the persistent cache stores the worker writes to.
//! Configuration is read the same way the worker reads it, so `--stale`
//! agrees with the worker about which store is current.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use offcache_core::{CacheDb, CacheStorage, Request, RouterConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "offcache")]
#[command(about = "Inspect and purge offline cache stores")]
#[command(version)]
struct Args {
    /// Cache database (default: OFFCACHE_DB_PATH or ./offcache.sqlite)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// List cache stores with their entry counts
    Stores,

    /// List the entries of one store
    Entries { store: String },

    /// Show one cached response
    Show {
        store: String,
        /// Absolute URL, or a path resolved against the configured origin
        url: String,
        #[arg(long, default_value = "GET")]
        method: String,
    },

    /// Delete a store, or every store but the current one
    Purge {
        store: Option<String>,
        #[arg(long)]
        stale: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = RouterConfig::load().context("loading configuration")?;
    if let Some(db) = args.db {
        config.db_path = db;
    }

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;

    let stdout = io::stdout();
    run(&db, &config, args.command, &mut stdout.lock()).await
}

async fn run(db: &CacheDb, config: &RouterConfig, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Stores => stores(db, config, out).await,
        Command::Entries { store } => entries(db, &store, out).await,
        Command::Show { store, url, method } => show(db, config, &store, &url, &method, out).await,
        Command::Purge { store, stale } => purge(db, config, store, stale, out).await,
    }
}

async fn stores(db: &CacheDb, config: &RouterConfig, out: &mut impl Write) -> Result<()> {
    let current = config.current_cache_name();
    for (name, count) in db.store_summaries().await? {
        let marker = if name == current { "*" } else { " " };
        writeln!(out, "{marker} {name}\t{count}")?;
    }
    Ok(())
}

async fn entries(db: &CacheDb, store: &str, out: &mut impl Write) -> Result<()> {
    if !db.keys().await?.iter().any(|k| k == store) {
        bail!("no cache store named {store}");
    }
    for entry in db.entry_meta(store).await? {
        writeln!(out, "{} {} {} {}B {}", entry.method, entry.url, entry.status, entry.body_len, entry.stored_at)?;
    }
    Ok(())
}

async fn show(
    db: &CacheDb, config: &RouterConfig, store: &str, url: &str, method: &str, out: &mut impl Write,
) -> Result<()> {
    let url = config.origin.join(url).with_context(|| format!("invalid url {url}"))?;
    let request = Request::get(url).with_method(method);

    let Some(response) = db.match_request(store, &request).await? else {
        bail!("no entry for {} in {store}", request.identity());
    };

    writeln!(out, "{} {}", response.status, response.status_text)?;
    for (name, value) in &response.headers {
        writeln!(out, "{name}: {value}")?;
    }
    writeln!(out)?;
    writeln!(out, "{} bytes", response.body.len())?;
    Ok(())
}

async fn purge(
    db: &CacheDb, config: &RouterConfig, store: Option<String>, stale: bool, out: &mut impl Write,
) -> Result<()> {
    let targets = match (store, stale) {
        (Some(_), true) => bail!("pass either a store name or --stale, not both"),
        (Some(store), false) => vec![store],
        (None, true) => {
            let current = config.current_cache_name();
            db.keys().await?.into_iter().filter(|name| *name != current).collect()
        }
        (None, false) => bail!("nothing to purge: pass a store name or --stale"),
    };

    for name in targets {
        if db.delete(&name).await? {
            tracing::info!(cache = %name, "purged cache store");
            writeln!(out, "deleted {name}")?;
        } else {
            writeln!(out, "no store named {name}")?;
        }
    }
    Ok(())
}
