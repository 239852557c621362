//! `metasyncd`: builds the metadata documents and publishes what changed.
//!
//! # Usage
//!
//! ```text
//! metasyncd publish                  # live run: upload, delete stale, purge
//! metasyncd -c meta.toml publish     # with a config file
//! metasyncd publish --dry-run        # write into the dump directory only
//! metasyncd plan                     # build and diff, print the change set
//! metasyncd manifest --list          # show the persisted manifest
//! ```

mod config;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metasync_builder::MetaBuilder;
use metasync_engine::{PublishOptions, Publisher};
use metasync_purge::{CacheInvalidator, CloudflarePurger};
use metasync_state::ManifestStore;
use metasync_store::{B2Credentials, B2Store, FileStore, MemoryStore, ObjectStore};
use metasync_sync::SyncMode;
use metasync_upstream::HttpFetcher;
use tracing::{error, info};

use config::{Backend, CliConfig};

#[derive(Parser)]
#[command(
    name = "metasyncd",
    version,
    about = "Incremental publisher for loader metadata"
)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// B2 application key id.
    #[arg(long, env = "B2_APP_KEY_ID", global = true, hide_env_values = true)]
    b2_key_id: Option<String>,

    /// B2 application key.
    #[arg(long, env = "B2_APP_KEY", global = true, hide_env_values = true)]
    b2_key: Option<String>,

    /// Cloudflare API token.
    #[arg(long, env = "CF_KEY", global = true, hide_env_values = true)]
    cf_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, diff, upload, delete stale files, purge and save the manifest.
    Publish {
        /// Write into the dump directory; no deletes, no purge.
        #[arg(long)]
        dry_run: bool,

        /// Upload every document, unchanged ones included.
        #[arg(long)]
        reupload_all: bool,

        /// Override the dump directory.
        #[arg(short, long)]
        dump_dir: Option<PathBuf>,
    },

    /// Build and diff only; print what a publish would change.
    Plan,

    /// Show the persisted manifest.
    Manifest {
        /// Print every entry.
        #[arg(short, long)]
        list: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    // CLI args and environment override config file values.
    if cli.b2_key_id.is_some() {
        config.storage.key_id = cli.b2_key_id;
    }
    if cli.b2_key.is_some() {
        config.storage.application_key = cli.b2_key;
    }
    if cli.cf_key.is_some() {
        config.cdn.api_token = cli.cf_key;
    }

    match cli.command {
        Commands::Publish {
            dry_run,
            reupload_all,
            dump_dir,
        } => {
            if dry_run || config.publish.dry_run {
                config.force_dry_run();
            }
            if reupload_all {
                config.publish.reupload_all = true;
            }
            if let Some(dir) = dump_dir {
                config.storage.dump_dir = dir;
            }
            telemetry::init(&config.log.level);
            cmd_publish(config).await
        }
        Commands::Plan => {
            telemetry::init(&config.log.level);
            cmd_plan(config).await
        }
        Commands::Manifest { list } => {
            telemetry::init(&config.log.level);
            cmd_manifest(config, list).await
        }
    }
}

async fn open_store(config: &CliConfig) -> Result<Arc<dyn ObjectStore>> {
    let storage = &config.storage;
    let store: Arc<dyn ObjectStore> = match storage.backend {
        Backend::B2 => {
            let credentials = B2Credentials {
                key_id: storage.key_id.clone().unwrap_or_default(),
                application_key: storage.application_key.clone().unwrap_or_default(),
            };
            let store = B2Store::connect(&credentials, &storage.bucket, &config.upstream.user_agent)
                .await
                .with_context(|| format!("cannot connect to bucket {}", storage.bucket))?;
            Arc::new(store)
        }
        Backend::File => {
            info!(dir = %storage.dump_dir.display(), "writing into dump directory");
            Arc::new(
                FileStore::new(&storage.dump_dir)
                    .with_context(|| format!("cannot open {}", storage.dump_dir.display()))?,
            )
        }
        Backend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

fn publisher(config: &CliConfig, store: Arc<dyn ObjectStore>) -> Result<Publisher> {
    let fetcher = HttpFetcher::new(&config.upstream.user_agent)?;
    let mut builder = MetaBuilder::new(Arc::new(fetcher), config.upstream_config());
    if let Some(dir) = &config.publish.static_dir {
        builder = builder.with_static_dir(dir);
    }

    let options = PublishOptions {
        manifest_path: config.publish.manifest_path.clone(),
        upload_concurrency: config.publish.upload_concurrency,
        mode: if config.publish.dry_run {
            SyncMode::DryRun
        } else {
            SyncMode::Live
        },
        reupload_all: config.publish.reupload_all,
    };
    Ok(Publisher::new(Arc::new(builder), store, options))
}

fn invalidator(config: &CliConfig) -> Result<CacheInvalidator> {
    let token = config.cdn.api_token.clone().unwrap_or_default();
    let purger = match &config.cdn.purge_endpoint {
        Some(endpoint) => CloudflarePurger::with_endpoint(endpoint, token)?,
        None => CloudflarePurger::new(&config.cdn.zone_id, token)?,
    };
    Ok(CacheInvalidator::new(
        Arc::new(purger),
        &config.publish.base_url,
        config.purge_limits(),
    )?)
}

// -----------------------------------------------------------------------
// metasyncd publish
// -----------------------------------------------------------------------

async fn cmd_publish(config: CliConfig) -> Result<()> {
    let live = !config.publish.dry_run;
    config.validate(live)?;
    info!(
        backend = ?config.storage.backend,
        base_url = %config.publish.base_url,
        dry_run = config.publish.dry_run,
        reupload_all = config.publish.reupload_all,
        "starting publish"
    );

    let store = open_store(&config).await?;
    let mut publisher = publisher(&config, store)?;
    if live {
        publisher = publisher.with_invalidator(invalidator(&config)?);
    }

    let summary = publisher.publish().await.map_err(|e| {
        error!(error = %e, "publish failed");
        e
    })?;

    println!("{}", summary.changed_files_group());
    info!(
        changed = summary.changed.len(),
        stale = summary.stale.len(),
        unchanged = summary.stats.unchanged,
        "done"
    );
    Ok(())
}

// -----------------------------------------------------------------------
// metasyncd plan
// -----------------------------------------------------------------------

async fn cmd_plan(config: CliConfig) -> Result<()> {
    config.validate(false)?;
    let store = open_store(&config).await?;
    let plan = publisher(&config, store)?.plan().await?;

    let changed = plan.changed();
    println!("Previous manifest: {} entries", plan.previous_entries);
    println!("Unchanged: {}", plan.outcome.stats.unchanged);
    println!("::group::Would upload ({})", changed.len());
    for path in &changed {
        println!("{path}");
    }
    println!("::endgroup::");
    println!("::group::Would delete ({})", plan.stale().len());
    for path in plan.stale() {
        println!("{path}");
    }
    println!("::endgroup::");
    Ok(())
}

// -----------------------------------------------------------------------
// metasyncd manifest
// -----------------------------------------------------------------------

async fn cmd_manifest(config: CliConfig, list: bool) -> Result<()> {
    config.validate(false)?;
    let store = open_store(&config).await?;
    let manifest = ManifestStore::new(store, config.publish.manifest_path.clone())
        .load()
        .await
        .context("cannot load manifest")?;

    println!(
        "Manifest {}: {} entries",
        config.publish.manifest_path,
        manifest.len()
    );
    if list {
        let mut entries: Vec<_> = manifest.iter().collect();
        entries.sort();
        for (path, hash) in entries {
            println!("  {path} {hash}");
        }
    }
    Ok(())
}
