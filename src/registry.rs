//! Remote source registry.
//!
//! Loads the list of configured remote sources from a JSON file:
//!
//! ```json
//! {
//!   "sources": [
//!     {
//!       "id": "awesome",
//!       "name": "Awesome Cursor Rules",
//!       "type": "github",
//!       "owner": "acme",
//!       "repo": "rules",
//!       "path": "rules",
//!       "branch": "main",
//!       "__meta__service": "general",
//!       "__meta__framework": "none",
//!       "__meta__type": "style",
//!       "__meta__tags": ["community"]
//!     }
//!   ]
//! }
//! ```
//!
//! Loading fails soft: a missing or malformed registry yields an empty
//! source list (aggregation still runs against the local store) and an
//! `error!` event. Unsupported source kinds are skipped with a warning.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, warn};

use crate::error::RegistryError;
use crate::models::RemoteSource;

#[derive(Debug, Deserialize)]
struct SourceFile {
    #[serde(default)]
    sources: Vec<RemoteSource>,
}

/// Load remote source descriptors, degrading to an empty list on any
/// registry-level failure.
pub fn load_sources(path: &Path) -> Vec<RemoteSource> {
    match try_load(path) {
        Ok(sources) => sources,
        Err(err) => {
            error!(error = %err, "failed to load source registry; continuing with no remote sources");
            Vec::new()
        }
    }
}

fn try_load(path: &Path) -> Result<Vec<RemoteSource>, RegistryError> {
    let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let file: SourceFile =
        serde_json::from_str(&content).map_err(|source| RegistryError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut sources = Vec::with_capacity(file.sources.len());
    for source in file.sources {
        if source.kind != "github" {
            warn!(id = %source.id, kind = %source.kind, "skipping source with unsupported kind");
            continue;
        }
        sources.push(source);
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_valid_registry() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
              "sources": [
                {{
                  "id": "r1",
                  "name": "Repo One",
                  "type": "github",
                  "owner": "acme",
                  "repo": "rules",
                  "path": "cursor",
                  "branch": "main",
                  "__meta__service": "aws",
                  "__meta__framework": "cdk",
                  "__meta__type": "infra",
                  "__meta__tags": ["iac"]
                }}
              ]
            }}"#
        )
        .unwrap();

        let sources = load_sources(file.path());
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, "r1");
        assert_eq!(sources[0].service, "aws");
        assert_eq!(sources[0].tags, vec!["iac"]);
    }

    #[test]
    fn test_missing_registry_degrades_to_empty() {
        let sources = load_sources(Path::new("/nonexistent/sources.json"));
        assert!(sources.is_empty());
    }

    #[test]
    fn test_malformed_registry_degrades_to_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(load_sources(file.path()).is_empty());
    }

    #[test]
    fn test_unsupported_kind_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
              "sources": [
                {{
                  "id": "g1",
                  "name": "Gitlab",
                  "type": "gitlab",
                  "owner": "o",
                  "repo": "r",
                  "path": "p",
                  "__meta__service": "s",
                  "__meta__framework": "f",
                  "__meta__type": "t"
                }}
              ]
            }}"#
        )
        .unwrap();
        assert!(load_sources(file.path()).is_empty());
    }
}
