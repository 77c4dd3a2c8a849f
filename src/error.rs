//! Error types for fetching and aggregation.
//!
//! Most failures in this crate are absorbed where they occur and surface
//! only as log events plus a smaller result set; the types here exist so
//! those sites can log something structured and so callers can tell a
//! listing failure (whole source lost) from a per-file failure (one
//! document skipped).

use std::path::PathBuf;

/// A remote fetch failure.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The directory listing call returned a non-success status. The
    /// listing is a precondition for any partial result, so this aborts
    /// the whole source.
    #[error("{source_id}: listing returned HTTP {status}")]
    ListingStatus {
        source_id: String,
        status: reqwest::StatusCode,
    },

    /// The listing call failed at the network level (includes timeouts).
    #[error("{source_id}: listing request failed: {source}")]
    ListingRequest {
        source_id: String,
        #[source]
        source: reqwest::Error,
    },

    /// The listing response body could not be decoded.
    #[error("{source_id}: malformed listing response: {source}")]
    ListingBody {
        source_id: String,
        #[source]
        source: reqwest::Error,
    },

    /// One file's content request returned a non-success status.
    /// Isolated: the file is skipped, the rest of the source proceeds.
    #[error("{path}: content returned HTTP {status}")]
    FileStatus {
        path: String,
        status: reqwest::StatusCode,
    },

    /// One file's content request failed at the network level. Isolated.
    #[error("{path}: content request failed: {source}")]
    FileRequest {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// A listed file carried no download locator. Isolated.
    #[error("{path}: listing entry has no download URL")]
    MissingDownloadUrl { path: String },
}

/// Source registry load failure. Recoverable: aggregation proceeds with
/// zero remote sources.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read source registry {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse source registry {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level aggregation failure.
///
/// Raised only when no source could possibly contribute: the local
/// store is unavailable *and* no remote sources are configured. Every
/// other failure mode degrades to a partial result.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("no usable sources: local store unavailable and no remote sources configured")]
    NoSources,
}
