//! # Rulehub CLI
//!
//! The `rulehub` binary aggregates rule documents from the configured
//! sources and presents the merged catalog.
//!
//! ## Usage
//!
//! ```bash
//! rulehub --config ./config/rulehub.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rulehub init` | Create the SQLite cache database and schema |
//! | `rulehub sources` | List configured sources and their status |
//! | `rulehub list` | Aggregate, filter, and page through the catalog |
//! | `rulehub show <slug>` | Print one document's metadata and body |
//! | `rulehub facets` | Print the distinct filterable values |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the cache database
//! rulehub init
//!
//! # Everything tagged for one service, second page
//! rulehub list --service aws --page 2
//!
//! # Combine dimensions (AND) and repeat a flag for OR within one
//! rulehub list --framework react --framework vue --type style
//!
//! # Full document by slug
//! rulehub show awesome-strict-mode
//! ```
//!
//! Set `GITHUB_TOKEN` to authenticate listing calls against the GitHub
//! API; set `RUST_LOG` to control log verbosity (default `warn`).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

use rulehub::aggregate::Aggregator;
use rulehub::cache::{CacheStore, MemoryCacheStore, SqliteCacheStore};
use rulehub::config::{self, Config};
use rulehub::connector_github::GithubFetcher;
use rulehub::models::{RuleDoc, SourceDescriptor};
use rulehub::query::{self, Facet, FilterOptions};
use rulehub::{db, migrate, registry, sources};

/// Rulehub — aggregate rule documents from local and GitHub sources
/// into one filterable catalog.
#[derive(Parser)]
#[command(
    name = "rulehub",
    about = "Aggregate rule documents from local and GitHub sources into one filterable catalog",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). See
    /// `config/rulehub.example.toml` for a full example.
    #[arg(long, global = true, default_value = "./config/rulehub.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the cache database schema.
    ///
    /// Idempotent — running it multiple times is safe. Commands work
    /// without it, but every run then fetches remote sources fresh.
    Init,

    /// List configured sources and their status.
    Sources,

    /// Aggregate the catalog and print one page of it.
    List {
        /// Restrict to these services (repeatable; OR within the flag).
        #[arg(long = "service")]
        services: Vec<String>,

        /// Restrict to these frameworks (repeatable).
        #[arg(long = "framework")]
        frameworks: Vec<String>,

        /// Restrict to these rule types (repeatable).
        #[arg(long = "type")]
        types: Vec<String>,

        /// Page number, clamped into the valid range.
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Rules per page; defaults to `listing.page_size` from config.
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Print one document's metadata and body.
    Show {
        /// Document slug. On a slug collision the last-listed document
        /// wins.
        slug: String,
    },

    /// Print the distinct values available for filtering.
    Facets,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.cache.path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Cache database initialized.");
        }
        Commands::Sources => {
            let remote_sources = registry::load_sources(&cfg.remote.sources);
            sources::list_sources(&cfg, &remote_sources)?;
        }
        Commands::List {
            services,
            frameworks,
            types,
            page,
            page_size,
        } => {
            let docs = build_aggregator(&cfg).await?.aggregate().await?;
            let opts = FilterOptions {
                services,
                frameworks,
                types,
            };
            let filtered = query::filter_rules(docs, &opts);
            let page_size = page_size.unwrap_or(cfg.listing.page_size);
            print_listing(&filtered, page_size, page);
        }
        Commands::Show { slug } => {
            match build_aggregator(&cfg).await?.get_by_slug(&slug).await? {
                Some(doc) => print_document(&doc),
                None => anyhow::bail!("no rule with slug '{}'", slug),
            }
        }
        Commands::Facets => {
            let docs = build_aggregator(&cfg).await?.aggregate().await?;
            print_facet("services", &query::unique_values(&docs, Facet::Service));
            print_facet("frameworks", &query::unique_values(&docs, Facet::Framework));
            print_facet("types", &query::unique_values(&docs, Facet::Type));
            print_facet("tags", &query::unique_values(&docs, Facet::Tags));
        }
    }

    Ok(())
}

/// Wire the aggregator up from config: source registry, HTTP client
/// with the configured timeout, and the SQLite cache store. A cache
/// database that cannot be opened degrades to an in-process store for
/// this run — remote sources are then fetched fresh.
async fn build_aggregator(cfg: &Config) -> Result<Aggregator> {
    let mut descriptors = vec![SourceDescriptor::Local {
        root: cfg.local.root.clone(),
        include_globs: cfg.local.include_globs.clone(),
    }];
    descriptors.extend(
        registry::load_sources(&cfg.remote.sources)
            .into_iter()
            .map(SourceDescriptor::Github),
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.remote.timeout_secs))
        .build()?;
    let token = std::env::var("GITHUB_TOKEN").ok();
    let fetcher = GithubFetcher::new(client, token);

    let cache: Arc<dyn CacheStore> = match db::connect(&cfg.cache.path).await {
        Ok(pool) => Arc::new(SqliteCacheStore::new(pool)),
        Err(err) => {
            warn!(error = %err, "cache database unavailable; fetching without a shared cache");
            Arc::new(MemoryCacheStore::new())
        }
    };

    Ok(Aggregator::new(
        descriptors,
        fetcher,
        cache,
        Duration::from_secs(cfg.cache.ttl_secs),
    ))
}

fn print_listing(docs: &[RuleDoc], page_size: usize, page: usize) {
    let slice = query::paginate(docs, page_size, page);
    let page_count = docs.len().div_ceil(page_size.max(1)).max(1);
    let page = page.clamp(1, page_count);

    println!(
        "{:<36} {:>5} {:<12} {:<12} {:<10} DESCRIPTION",
        "SLUG", "RANK", "SERVICE", "FRAMEWORK", "TYPE"
    );
    for doc in slice {
        let rank = doc
            .metadata
            .rank
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        let description = doc
            .metadata
            .description
            .as_deref()
            .or_else(|| doc.title())
            .unwrap_or("");
        println!(
            "{:<36} {:>5} {:<12} {:<12} {:<10} {}",
            doc.slug,
            rank,
            doc.metadata.service.as_deref().unwrap_or("-"),
            doc.metadata.framework.as_deref().unwrap_or("-"),
            doc.metadata.rule_type.as_deref().unwrap_or("-"),
            truncate(description, 48)
        );
    }
    println!("page {}/{} ({} rules)", page, page_count, docs.len());
}

fn print_document(doc: &RuleDoc) {
    println!("slug:      {}", doc.slug);
    println!("source:    {}", doc.source_id);
    println!("origin:    {}", doc.origin);
    if let Some(description) = &doc.metadata.description {
        println!("about:     {}", description);
    }
    if let Some(globs) = &doc.metadata.globs {
        println!("globs:     {}", globs);
    }
    if let Some(service) = &doc.metadata.service {
        println!("service:   {}", service);
    }
    if let Some(framework) = &doc.metadata.framework {
        println!("framework: {}", framework);
    }
    if let Some(rule_type) = &doc.metadata.rule_type {
        println!("type:      {}", rule_type);
    }
    if let Some(author) = &doc.metadata.author {
        println!("author:    {}", author);
    }
    if !doc.metadata.tags.is_empty() {
        println!("tags:      {}", doc.metadata.tags.join(", "));
    }
    println!();
    println!("{}", doc.body);
}

fn print_facet(name: &str, values: &[String]) {
    println!("{}: {}", name, values.join(", "));
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
