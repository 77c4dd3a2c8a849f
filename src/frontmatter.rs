//! Metadata-block parser for rule documents.
//!
//! A rule document may begin with a YAML frontmatter block bracketed by
//! `---` delimiter lines:
//!
//! ```text
//! ---
//! description: Prefer composition over inheritance
//! globs: "**/*.ts"
//! ---
//! # Rule body starts here
//! ```
//!
//! Parsing never fails. A document without an opening delimiter is all
//! body; a malformed or unterminated block degrades to empty metadata
//! plus the full raw input as body, with a `warn!` event so the
//! degradation is observable.
//!
//! Keys with the reserved `__meta__` provenance prefix are mapped onto
//! the named [`RuleMetadata`] fields and never leak into the open
//! extension map; recognized ones are later overridden by source
//! configuration for remote documents (see [`crate::connector_github`]).

use std::collections::BTreeMap;

use tracing::warn;

use crate::models::RuleMetadata;

/// Reserved prefix for provenance keys inside a metadata block.
pub const META_PREFIX: &str = "__meta__";

/// Result of splitting a raw document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub metadata: RuleMetadata,
    pub body: String,
    /// True when a metadata block was present but unusable.
    pub degraded: bool,
}

/// Split `raw` into metadata and body.
pub fn parse(raw: &str) -> ParsedDocument {
    let Some(rest) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        // No opening delimiter: the whole input is body.
        return ParsedDocument {
            metadata: RuleMetadata::default(),
            body: raw.to_string(),
            degraded: false,
        };
    };

    let Some((block, body)) = split_at_closing_delimiter(rest) else {
        warn!("metadata block is not terminated; keeping raw input as body");
        return ParsedDocument {
            metadata: RuleMetadata::default(),
            body: raw.to_string(),
            degraded: true,
        };
    };

    match parse_block(block) {
        Ok(metadata) => ParsedDocument {
            metadata,
            body: body.to_string(),
            degraded: false,
        },
        Err(err) => {
            warn!(error = %err, "malformed metadata block; keeping raw input as body");
            ParsedDocument {
                metadata: RuleMetadata::default(),
                body: raw.to_string(),
                degraded: true,
            }
        }
    }
}

/// Find the closing `---` line in the text following the opening
/// delimiter. Returns the block text and the body after the delimiter
/// line, or `None` when the block is unterminated.
fn split_at_closing_delimiter(rest: &str) -> Option<(&str, &str)> {
    let mut offset = 0usize;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            let body_start = offset + line.len();
            return Some((&rest[..offset], &rest[body_start..]));
        }
        offset += line.len();
    }
    None
}

fn parse_block(block: &str) -> Result<RuleMetadata, serde_yaml::Error> {
    if block.trim().is_empty() {
        return Ok(RuleMetadata::default());
    }

    let mapping: serde_yaml::Mapping = serde_yaml::from_str(block)?;
    let mut meta = RuleMetadata::default();
    let mut extra = BTreeMap::new();

    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            // Non-string keys have no place in the canonical schema.
            continue;
        };
        match key {
            "description" => meta.description = string_value(&value),
            "globs" => meta.globs = string_value(&value),
            "__meta__service" => meta.service = string_value(&value),
            "__meta__framework" => meta.framework = string_value(&value),
            "__meta__type" => meta.rule_type = string_value(&value),
            "__meta__author" => meta.author = string_value(&value),
            "__meta__tags" => meta.tags = string_seq(&value),
            "__meta__rate" => meta.rank = number_value(&value),
            reserved if reserved.starts_with(META_PREFIX) => {
                // Unknown provenance keys are dropped rather than shown
                // to consumers as raw metadata.
            }
            other => {
                if let Ok(json) = serde_json::to_value(&value) {
                    extra.insert(other.to_string(), json);
                }
            }
        }
    }

    meta.extra = extra;
    Ok(meta)
}

fn string_value(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number_value(value: &serde_yaml::Value) -> Option<f64> {
    match value {
        serde_yaml::Value::Number(n) => n.as_f64(),
        serde_yaml::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_seq(value: &serde_yaml::Value) -> Vec<String> {
    match value {
        serde_yaml::Value::Sequence(seq) => seq.iter().filter_map(string_value).collect(),
        // A bare scalar is accepted as a one-element list.
        other => string_value(other).map(|s| vec![s]).unwrap_or_default(),
    }
}
