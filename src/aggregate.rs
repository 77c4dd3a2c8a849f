//! Aggregation of rule documents across all configured sources.
//!
//! The local store is fetched synchronously first (cheap, always fresh),
//! then one task per remote source fans out concurrently and fans back
//! in with settle-all semantics: every task either contributes documents
//! or a logged failure, and one unreachable source never empties the
//! result as long as another source succeeded. Remote fetches go through
//! the cache-aside layer keyed per source; the local store does not.
//!
//! After merging, documents are ordered by `rank` descending — missing
//! rank sorts last, ties keep insertion order — so the output is
//! deterministic across runs. Slug collisions are detected and logged as
//! a data-quality warning; both documents are retained, and slug lookups
//! resolve to the last-listed one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{error, warn};

use crate::cache::{self, CacheStore};
use crate::connector_github::GithubFetcher;
use crate::connector_local;
use crate::error::{AggregateError, FetchError};
use crate::models::{RemoteSource, RuleDoc, SourceDescriptor};

/// Runs the full aggregation against an injected fetcher and cache
/// store, so runs are reproducible in tests with fakes.
pub struct Aggregator {
    sources: Vec<SourceDescriptor>,
    fetcher: GithubFetcher,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl Aggregator {
    pub fn new(
        sources: Vec<SourceDescriptor>,
        fetcher: GithubFetcher,
        cache: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            sources,
            fetcher,
            cache,
            ttl,
        }
    }

    /// Fetch, merge, and order documents from every configured source.
    ///
    /// Fails only when no source could contribute at all; individual
    /// source failures are logged and absorbed.
    pub async fn aggregate(&self) -> Result<Vec<RuleDoc>, AggregateError> {
        let mut docs = self.collect().await?;
        sort_documents(&mut docs);
        Ok(docs)
    }

    /// Aggregate and resolve a single document by slug. When slugs
    /// collide, the last-listed document wins — resolved against the
    /// merged collection in insertion order, before rank ordering
    /// rearranges it.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<RuleDoc>, AggregateError> {
        let docs = self.collect().await?;
        Ok(docs.into_iter().rev().find(|doc| doc.slug == slug))
    }

    /// Fetch and merge documents from every source, in source listing
    /// order (local first, then remotes as configured).
    async fn collect(&self) -> Result<Vec<RuleDoc>, AggregateError> {
        let mut locals = Vec::new();
        let mut remotes: Vec<&RemoteSource> = Vec::new();
        for source in &self.sources {
            match source {
                SourceDescriptor::Local {
                    root,
                    include_globs,
                } => locals.push((root, include_globs)),
                SourceDescriptor::Github(remote) => remotes.push(remote),
            }
        }

        let local_usable = locals.iter().any(|(root, _)| root.exists());
        if !local_usable && remotes.is_empty() {
            return Err(AggregateError::NoSources);
        }

        let mut docs = Vec::new();
        for (root, include_globs) in locals {
            docs.extend(connector_local::fetch_local(root, include_globs));
        }

        for (source_id, result) in self.fetch_remotes(&remotes).await {
            match result {
                Ok(remote_docs) => docs.extend(remote_docs),
                Err(err) => {
                    error!(source = %source_id, error = %err, "remote source failed; continuing without it");
                }
            }
        }

        detect_slug_collisions(&docs);
        Ok(docs)
    }

    /// One task per remote source, joined with per-task result capture.
    /// Results come back in source order regardless of completion order.
    async fn fetch_remotes(
        &self,
        remotes: &[&RemoteSource],
    ) -> Vec<(String, Result<Vec<RuleDoc>, FetchError>)> {
        let mut join_set = JoinSet::new();

        for (idx, source) in remotes.iter().enumerate() {
            let source = (*source).clone();
            let fetcher = self.fetcher.clone();
            let cache = Arc::clone(&self.cache);
            let ttl = self.ttl;

            join_set.spawn(async move {
                let key = source.cache_key();
                let result = cache::get_or_fetch(cache.as_ref(), &key, ttl, || async {
                    fetcher.fetch(&source).await
                })
                .await;
                (idx, source.id.clone(), result)
            });
        }

        let mut settled: Vec<Option<(String, Result<Vec<RuleDoc>, FetchError>)>> =
            (0..remotes.len()).map(|_| None).collect();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, source_id, result)) => settled[idx] = Some((source_id, result)),
                Err(err) => error!(error = %err, "remote fetch task panicked"),
            }
        }

        settled.into_iter().flatten().collect()
    }
}

/// Stable sort: `rank` descending, documents without a rank last, ties
/// in insertion order.
pub fn sort_documents(docs: &mut [RuleDoc]) {
    docs.sort_by(|a, b| {
        let ra = a.metadata.rank.unwrap_or(f64::NEG_INFINITY);
        let rb = b.metadata.rank.unwrap_or(f64::NEG_INFINITY);
        rb.total_cmp(&ra)
    });
}

/// Log every duplicate slug with both origins. Duplicates stay in the
/// collection; silently dropping one would shadow a document.
pub fn detect_slug_collisions(docs: &[RuleDoc]) {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for doc in docs {
        if let Some(previous) = seen.insert(doc.slug.as_str(), doc.source_id.as_str()) {
            warn!(
                slug = %doc.slug,
                first = %previous,
                second = %doc.source_id,
                "slug collision: later document wins slug lookups"
            );
        }
    }
}
