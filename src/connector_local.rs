use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

use crate::frontmatter;
use crate::models::RuleDoc;

/// Source id attached to every document from the local store.
pub const LOCAL_SOURCE_ID: &str = "manual";

/// Enumerate and parse rule files directly under `root` (non-recursive).
///
/// A file that cannot be read is logged and skipped; it never aborts the
/// enumeration. An unreadable or missing root yields an empty list with
/// a warning — the aggregator decides whether that is fatal.
pub fn fetch_local(root: &Path, include_globs: &[String]) -> Vec<RuleDoc> {
    let include_set = match build_globset(include_globs) {
        Ok(set) => set,
        Err(err) => {
            warn!(error = %err, "invalid local include globs; skipping local store");
            return Vec::new();
        }
    };

    let mut docs = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(root = %root.display(), error = %err, "failed to enumerate local store entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if !include_set.is_match(&name) {
            continue;
        }

        let raw = match std::fs::read_to_string(entry.path()) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(file = %name, error = %err, "failed to read rule file; skipping");
                continue;
            }
        };

        let parsed = frontmatter::parse(&raw);
        if parsed.degraded {
            warn!(file = %name, "rule file has a malformed metadata block");
        }

        let slug = name
            .strip_suffix(".md")
            .unwrap_or(name.as_str())
            .to_string();

        docs.push(RuleDoc {
            slug,
            metadata: parsed.metadata,
            body: parsed.body,
            source_id: LOCAL_SOURCE_ID.to_string(),
            origin: name,
        });
    }

    // Enumeration order is platform-dependent; sort for determinism.
    docs.sort_by(|a, b| a.slug.cmp(&b.slug));
    docs
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn md_globs() -> Vec<String> {
        vec!["*.md".to_string()]
    }

    #[test]
    fn test_reads_and_parses_rule_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("alpha.md"),
            "---\ndescription: first\n---\n# Alpha\n",
        )
        .unwrap();
        std::fs::write(tmp.path().join("beta.md"), "# Beta with no metadata").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let docs = fetch_local(tmp.path(), &md_globs());
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].slug, "alpha");
        assert_eq!(docs[0].metadata.description.as_deref(), Some("first"));
        assert_eq!(docs[0].source_id, "manual");
        assert_eq!(docs[1].slug, "beta");
        assert_eq!(docs[1].body, "# Beta with no metadata");
    }

    #[test]
    fn test_non_recursive() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("top.md"), "top").unwrap();
        let nested = tmp.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("deep.md"), "deep").unwrap();

        let docs = fetch_local(tmp.path(), &md_globs());
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].slug, "top");
    }

    #[test]
    fn test_missing_root_yields_empty() {
        let docs = fetch_local(Path::new("/nonexistent/rules"), &md_globs());
        assert!(docs.is_empty());
    }

    #[test]
    fn test_origin_is_filename() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("foo.md"), "body").unwrap();
        let docs = fetch_local(tmp.path(), &md_globs());
        assert_eq!(docs[0].origin, "foo.md");
    }
}
