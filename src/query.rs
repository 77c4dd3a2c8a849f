//! Filtering and pagination over an aggregated collection.
//!
//! Filtering is a logical AND across three independent dimensions
//! (service, framework, type) with OR within each dimension's set; an
//! empty set imposes no restriction.

use crate::models::RuleDoc;

/// Constraint sets for [`filter_rules`]. Empty sets match everything.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub services: Vec<String>,
    pub frameworks: Vec<String>,
    pub types: Vec<String>,
}

impl FilterOptions {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.frameworks.is_empty() && self.types.is_empty()
    }
}

/// A metadata dimension facet values can be extracted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Service,
    Framework,
    Type,
    Tags,
}

pub fn filter_rules(mut docs: Vec<RuleDoc>, opts: &FilterOptions) -> Vec<RuleDoc> {
    if opts.is_empty() {
        return docs;
    }
    docs.retain(|doc| {
        matches_dimension(&opts.services, doc.metadata.service.as_deref())
            && matches_dimension(&opts.frameworks, doc.metadata.framework.as_deref())
            && matches_dimension(&opts.types, doc.metadata.rule_type.as_deref())
    });
    docs
}

fn matches_dimension(constraint: &[String], value: Option<&str>) -> bool {
    constraint.is_empty() || value.is_some_and(|v| constraint.iter().any(|c| c == v))
}

/// Page slice of `docs`, clamping `page` into `[1, page_count]`.
pub fn paginate(docs: &[RuleDoc], page_size: usize, page: usize) -> &[RuleDoc] {
    if docs.is_empty() || page_size == 0 {
        return &[];
    }
    let page_count = docs.len().div_ceil(page_size);
    let page = page.clamp(1, page_count);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(docs.len());
    &docs[start..end]
}

/// Sorted distinct values present for one metadata dimension.
pub fn unique_values(docs: &[RuleDoc], facet: Facet) -> Vec<String> {
    let mut values: Vec<String> = docs
        .iter()
        .flat_map(|doc| match facet {
            Facet::Service => doc.metadata.service.clone().into_iter().collect::<Vec<_>>(),
            Facet::Framework => doc.metadata.framework.clone().into_iter().collect(),
            Facet::Type => doc.metadata.rule_type.clone().into_iter().collect(),
            Facet::Tags => doc.metadata.tags.clone(),
        })
        .filter(|v| !v.is_empty())
        .collect();
    values.sort();
    values.dedup();
    values
}
