//! # Rulehub
//!
//! Aggregates rule documents — markdown files with an optional YAML
//! metadata block — from a local directory and any number of remote
//! GitHub repositories into one merged, deterministically ordered,
//! filterable catalog.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌─────────────┐
//! │ Local store  │──▶│                  │   │             │
//! └──────────────┘   │    Aggregator    │──▶│ Query engine│
//! ┌──────────────┐   │ settle-all merge │   │ filter/page │
//! │ GitHub × N   │──▶│  + rank ordering │   └─────────────┘
//! └──────┬───────┘   └──────────────────┘
//!        │
//!   ┌────▼─────┐
//!   │ Cache    │  get-or-fetch per source, TTL-bounded
//!   │ (SQLite) │
//!   └──────────┘
//! ```
//!
//! Remote fetches are wrapped in a cache-aside layer so repeated runs
//! inside the TTL never touch the network; a failed source contributes
//! nothing to that run and is logged, never fatal. A partial result is
//! always preferable to no result.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`registry`] | Remote source registry (JSON, fail-soft) |
//! | [`models`] | Core data types |
//! | [`frontmatter`] | Metadata block parsing |
//! | [`connector_local`] | Local store fetcher |
//! | [`connector_github`] | GitHub contents-API fetcher |
//! | [`cache`] | Cache-aside coordinator and store backends |
//! | [`aggregate`] | Concurrent fan-out, merge, ordering |
//! | [`query`] | Filtering, pagination, facets |
//! | [`db`] | SQLite connection for the cache store |
//! | [`migrate`] | Cache schema migration |

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod connector_github;
pub mod connector_local;
pub mod db;
pub mod error;
pub mod frontmatter;
pub mod migrate;
pub mod models;
pub mod query;
pub mod registry;
pub mod sources;
