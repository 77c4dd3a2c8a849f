//! Core data models for the rule catalog.
//!
//! A [`RuleDoc`] is the canonical unit flowing through the pipeline:
//! fetched from a source, normalized, cached (serialized as JSON), merged
//! and served. Documents are immutable once constructed — a re-fetch
//! produces new values, never an in-place mutation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Normalized metadata attached to a rule document.
///
/// Recognized fields are modeled as named optional members; anything else
/// found in a document's metadata block is preserved verbatim in
/// [`extra`](RuleMetadata::extra) for forward compatibility. Provenance
/// fields (`service`, `framework`, `rule_type`, `author`, `tags`) are
/// overwritten by the owning remote source's configuration — see
/// [`RemoteSource`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleMetadata {
    /// Human-readable summary, always taken from the document itself.
    #[serde(default)]
    pub description: Option<String>,
    /// Glob pattern describing which files the rule applies to.
    #[serde(default)]
    pub globs: Option<String>,
    /// Service classification (e.g. `"aws"`, `"vercel"`).
    #[serde(default)]
    pub service: Option<String>,
    /// Framework classification (e.g. `"nextjs"`, `"rails"`).
    #[serde(default)]
    pub framework: Option<String>,
    /// Rule type classification (e.g. `"style"`, `"security"`).
    #[serde(default)]
    pub rule_type: Option<String>,
    /// Document author; for remote documents this is the repo owner.
    #[serde(default)]
    pub author: Option<String>,
    /// Free-form classification tags, order preserved.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ordering weight. Higher ranks list first; documents without a
    /// rank sort after every ranked document.
    #[serde(default)]
    pub rank: Option<f64>,
    /// Unrecognized metadata keys, kept as-is.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A normalized rule document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDoc {
    /// Unique identity within one aggregation run. Local documents use
    /// the filename stem; remote documents use `"{source_id}-{stem}"`.
    pub slug: String,
    pub metadata: RuleMetadata,
    /// Document content with the metadata block removed.
    pub body: String,
    /// Id of the source that produced this document (`"manual"` for the
    /// local store, otherwise a remote source id).
    pub source_id: String,
    /// Source-relative locator, retained for export and download naming.
    pub origin: String,
}

impl RuleDoc {
    /// First ATX `# ` heading of the body, if any. Used as a display
    /// title when the metadata carries no description.
    pub fn title(&self) -> Option<&str> {
        self.body
            .lines()
            .map(str::trim_start)
            .find_map(|line| line.strip_prefix("# "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// A configured remote GitHub source.
///
/// Deserialized from the source registry (`sources.json`). The
/// `__meta__*` fields are the provenance tags applied to every document
/// the source yields, overriding anything the document declares itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSource {
    pub id: String,
    /// Display name used in logs and the `sources` listing.
    pub name: String,
    /// Source kind; only `"github"` is supported.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub owner: String,
    pub repo: String,
    /// Repo-relative directory to list.
    pub path: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(rename = "__meta__service")]
    pub service: String,
    #[serde(rename = "__meta__framework")]
    pub framework: String,
    #[serde(rename = "__meta__type")]
    pub rule_type: String,
    #[serde(rename = "__meta__tags", default)]
    pub tags: Vec<String>,
}

fn default_kind() -> String {
    "github".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

impl RemoteSource {
    /// Cache key for this source's fetched document sequence. Two runs
    /// against the same `{owner, repo, path, branch}` share one entry.
    pub fn cache_key(&self) -> String {
        format!(
            "github-rules:{}:{}:{}:{}",
            self.owner, self.repo, self.path, self.branch
        )
    }
}

/// A configured content source, local or remote.
#[derive(Debug, Clone)]
pub enum SourceDescriptor {
    /// The local document store: a directory of rule files.
    Local {
        root: PathBuf,
        include_globs: Vec<String>,
    },
    /// A remote GitHub repository directory.
    Github(RemoteSource),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> RuleDoc {
        RuleDoc {
            slug: "t".to_string(),
            metadata: RuleMetadata::default(),
            body: body.to_string(),
            source_id: "manual".to_string(),
            origin: "t.md".to_string(),
        }
    }

    #[test]
    fn test_title_from_first_heading() {
        let d = doc("intro text\n\n# Actual Title\n\n# Second");
        assert_eq!(d.title(), Some("Actual Title"));
    }

    #[test]
    fn test_title_absent() {
        assert_eq!(doc("no headings here").title(), None);
        assert_eq!(doc("## only h2").title(), None);
    }

    #[test]
    fn test_cache_key_composite() {
        let source = RemoteSource {
            id: "r1".to_string(),
            name: "R1".to_string(),
            kind: "github".to_string(),
            owner: "acme".to_string(),
            repo: "rules".to_string(),
            path: "cursor".to_string(),
            branch: "main".to_string(),
            service: String::new(),
            framework: String::new(),
            rule_type: String::new(),
            tags: vec![],
        };
        assert_eq!(source.cache_key(), "github-rules:acme:rules:cursor:main");
    }

    #[test]
    fn test_ruledoc_json_round_trip() {
        let mut meta = RuleMetadata {
            description: Some("desc".to_string()),
            rank: Some(4.0),
            tags: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        meta.extra
            .insert("custom".to_string(), serde_json::json!(true));
        let d = RuleDoc {
            slug: "r1-foo".to_string(),
            metadata: meta,
            body: "# Foo".to_string(),
            source_id: "r1".to_string(),
            origin: "cursor/foo.md".to_string(),
        };
        let json = serde_json::to_string(&d).unwrap();
        let back: RuleDoc = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
