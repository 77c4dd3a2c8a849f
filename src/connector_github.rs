//! GitHub remote fetcher.
//!
//! Retrieves rule documents from a directory inside a GitHub repository
//! using the contents API: one listing call per source, then one raw
//! download per matching file.
//!
//! # Source configuration
//!
//! Sources come from the JSON registry (see [`crate::registry`]); each
//! carries `{owner, repo, path, branch}` plus the provenance tags applied
//! to every document it yields.
//!
//! # Authentication
//!
//! If `GITHUB_TOKEN` is set it is sent as `Authorization: token …` on
//! listing requests, which raises the unauthenticated rate limit.
//!
//! # Failure semantics
//!
//! A failed listing aborts the whole source (the listing is a
//! precondition for any useful partial result). A failed download of one
//! file is isolated: logged, skipped, and the remaining files still
//! fetch. There is no retry here — a failed source is simply absent from
//! the run and gets another chance on the next aggregation.
//!
//! # Pagination
//!
//! Only a single listing page is requested. A source directory larger
//! than one contents-API page is a known capacity limit.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::frontmatter;
use crate::models::{RemoteSource, RuleDoc, RuleMetadata};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const RULE_EXTENSION: &str = ".md";

/// One entry of a contents-API directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub download_url: Option<String>,
}

impl ListingEntry {
    fn is_rule_file(&self) -> bool {
        self.kind == "file" && self.name.ends_with(RULE_EXTENSION)
    }
}

/// Fetches rule documents from GitHub-hosted sources.
///
/// Holds the injected HTTP client (the caller configures the request
/// timeout there) and an optional credential. The API base is
/// overridable so tests can point the fetcher at a local endpoint.
#[derive(Debug, Clone)]
pub struct GithubFetcher {
    client: reqwest::Client,
    token: Option<String>,
    api_base: String,
}

impl GithubFetcher {
    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        Self {
            client,
            token,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point the fetcher at a different contents-API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Fetch every rule document from `source`.
    ///
    /// Returns an error only when the listing call itself fails;
    /// per-file failures are logged and skipped.
    pub async fn fetch(&self, source: &RemoteSource) -> Result<Vec<RuleDoc>, FetchError> {
        debug!(source = %source.id, "fetching rules from {}", source.name);

        let entries = self.list_directory(source).await?;
        let mut docs = Vec::new();

        for entry in entries.iter().filter(|e| e.is_rule_file()) {
            match self.fetch_file(source, entry).await {
                Ok(doc) => docs.push(doc),
                Err(err) => {
                    warn!(source = %source.id, file = %entry.name, error = %err, "skipping rule file");
                }
            }
        }

        Ok(docs)
    }

    async fn list_directory(&self, source: &RemoteSource) -> Result<Vec<ListingEntry>, FetchError> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_base, source.owner, source.repo, source.path, source.branch
        );

        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .header(reqwest::header::USER_AGENT, "rulehub");
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|err| FetchError::ListingRequest {
                source_id: source.id.clone(),
                source: err,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ListingStatus {
                source_id: source.id.clone(),
                status,
            });
        }

        response
            .json::<Vec<ListingEntry>>()
            .await
            .map_err(|err| FetchError::ListingBody {
                source_id: source.id.clone(),
                source: err,
            })
    }

    async fn fetch_file(
        &self,
        source: &RemoteSource,
        entry: &ListingEntry,
    ) -> Result<RuleDoc, FetchError> {
        let url = entry
            .download_url
            .as_deref()
            .ok_or_else(|| FetchError::MissingDownloadUrl {
                path: entry.path.clone(),
            })?;

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, "rulehub")
            .send()
            .await
            .map_err(|err| FetchError::FileRequest {
                path: entry.path.clone(),
                source: err,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::FileStatus {
                path: entry.path.clone(),
                status,
            });
        }

        let raw = response.text().await.map_err(|err| FetchError::FileRequest {
            path: entry.path.clone(),
            source: err,
        })?;

        let parsed = frontmatter::parse(&raw);
        if parsed.degraded {
            warn!(source = %source.id, file = %entry.name, "rule file has a malformed metadata block");
        }

        let stem = entry
            .name
            .strip_suffix(RULE_EXTENSION)
            .unwrap_or(entry.name.as_str());

        Ok(RuleDoc {
            slug: format!("{}-{}", source.id, stem),
            metadata: apply_provenance(parsed.metadata, source),
            body: parsed.body,
            source_id: source.id.clone(),
            origin: entry.path.clone(),
        })
    }
}

/// Overlay the source's provenance tags onto parsed metadata.
///
/// Provenance is authoritative: `service`, `framework`, `rule_type`,
/// `author`, and `tags` always come from the source descriptor.
/// `description`, `globs`, `rank`, and the extension map stay with
/// whatever the document declared.
fn apply_provenance(mut metadata: RuleMetadata, source: &RemoteSource) -> RuleMetadata {
    metadata.service = Some(source.service.clone());
    metadata.framework = Some(source.framework.clone());
    metadata.rule_type = Some(source.rule_type.clone());
    metadata.author = Some(source.owner.clone());
    metadata.tags = source.tags.clone();
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> RemoteSource {
        RemoteSource {
            id: "r1".to_string(),
            name: "Repo One".to_string(),
            kind: "github".to_string(),
            owner: "acme".to_string(),
            repo: "rules".to_string(),
            path: "cursor".to_string(),
            branch: "main".to_string(),
            service: "aws".to_string(),
            framework: "cdk".to_string(),
            rule_type: "infra".to_string(),
            tags: vec!["iac".to_string()],
        }
    }

    #[test]
    fn test_provenance_overrides_document_tags() {
        let parsed = frontmatter::parse(
            "---\ndescription: keep me\n__meta__service: x\n__meta__tags: [own]\n---\nbody",
        );
        let meta = apply_provenance(parsed.metadata, &source());

        // Source configuration wins over the document's own claim.
        assert_eq!(meta.service.as_deref(), Some("aws"));
        assert_eq!(meta.framework.as_deref(), Some("cdk"));
        assert_eq!(meta.rule_type.as_deref(), Some("infra"));
        assert_eq!(meta.author.as_deref(), Some("acme"));
        assert_eq!(meta.tags, vec!["iac"]);
        // Document-owned fields survive.
        assert_eq!(meta.description.as_deref(), Some("keep me"));
    }

    #[test]
    fn test_document_rank_survives_overlay() {
        let parsed = frontmatter::parse("---\n__meta__rate: 9\n---\nbody");
        let meta = apply_provenance(parsed.metadata, &source());
        assert_eq!(meta.rank, Some(9.0));
    }

    #[test]
    fn test_listing_filter() {
        let entries: Vec<ListingEntry> = serde_json::from_str(
            r#"[
              {"name": "a.md", "type": "file", "path": "cursor/a.md",
               "download_url": "https://raw.example/a.md"},
              {"name": "sub", "type": "dir", "path": "cursor/sub", "download_url": null},
              {"name": "readme.txt", "type": "file", "path": "cursor/readme.txt",
               "download_url": "https://raw.example/readme.txt"}
            ]"#,
        )
        .unwrap();

        let files: Vec<&ListingEntry> = entries.iter().filter(|e| e.is_rule_file()).collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.md");
    }

    #[tokio::test]
    async fn test_unreachable_listing_is_a_listing_error() {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();
        // Port 1 is never listening locally; the connection is refused.
        let fetcher = GithubFetcher::new(client, None).with_api_base("http://127.0.0.1:1");

        let err = fetcher.fetch(&source()).await.unwrap_err();
        assert!(matches!(err, FetchError::ListingRequest { .. }));
    }
}
