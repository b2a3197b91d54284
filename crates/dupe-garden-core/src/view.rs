use crate::model::DuplicateRecord;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Similarity,
    Type,
    Service,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "similarity" => Ok(SortKey::Similarity),
            "type" => Ok(SortKey::Type),
            "service" => Ok(SortKey::Service),
            other => Err(format!(
                "unknown sort key '{}' (expected name, similarity, type or service)",
                other
            )),
        }
    }
}

/// Search text plus sort order applied on top of the result cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub search_text: String,
    pub sort_key: SortKey,
}

impl ViewQuery {
    pub fn new(search_text: impl Into<String>, sort_key: SortKey) -> Self {
        Self {
            search_text: search_text.into(),
            sort_key,
        }
    }
}

/// Filter and sort `records` for display. Pure: the same input always gives
/// the same ordered output, and `records` is never touched.
pub fn derive<'a>(records: &'a [DuplicateRecord], query: &ViewQuery) -> Vec<&'a DuplicateRecord> {
    let needle = query.search_text.to_lowercase();
    let mut view: Vec<&DuplicateRecord> = records
        .iter()
        .filter(|r| needle.is_empty() || matches_search(r, &needle))
        .collect();

    // sort_by is stable, so equal keys keep arrival order
    view.sort_by(|a, b| compare(a, b, query.sort_key));
    view
}

/// `needle` must already be lowercased.
fn matches_search(record: &DuplicateRecord, needle: &str) -> bool {
    record
        .payload
        .name
        .as_deref()
        .is_some_and(|name| name.to_lowercase().contains(needle))
        || record.duplicate_id.to_lowercase().contains(needle)
        || record.kind.as_str().to_lowercase().contains(needle)
}

fn compare(a: &DuplicateRecord, b: &DuplicateRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => {
            let (an, bn) = (a.display_name(), b.display_name());
            an.to_lowercase()
                .cmp(&bn.to_lowercase())
                .then_with(|| an.cmp(bn))
        }
        SortKey::Similarity => b.similarity().total_cmp(&a.similarity()),
        SortKey::Type => a.kind.as_str().cmp(b.kind.as_str()),
        SortKey::Service => a.service.as_str().cmp(b.service.as_str()),
    }
}
