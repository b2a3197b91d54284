use crate::model::DuplicateRecord;
use ahash::{AHashMap, AHashSet};
use tracing::warn;

/// The last-fetched duplicate records for the session's scan scope.
///
/// Records keep the backend's arrival order; `index` maps id to position.
#[derive(Debug, Default, Clone)]
pub struct ResultCache {
    records: Vec<DuplicateRecord>,
    index: AHashMap<String, usize>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole cache. Repeated ids keep their first occurrence.
    pub fn replace(&mut self, incoming: Vec<DuplicateRecord>) {
        let mut records = Vec::with_capacity(incoming.len());
        let mut index = AHashMap::with_capacity(incoming.len());

        for record in incoming {
            if index.contains_key(&record.id) {
                warn!("Dropping repeated duplicate id '{}' from scan result", record.id);
                continue;
            }
            index.insert(record.id.clone(), records.len());
            records.push(record);
        }

        self.records = records;
        self.index = index;
    }

    /// Remove the given ids, returning the ids that were actually present.
    pub fn remove_ids<'a, I>(&mut self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let doomed: AHashSet<&String> = ids
            .into_iter()
            .filter(|id| self.index.contains_key(*id))
            .collect();
        if doomed.is_empty() {
            return Vec::new();
        }

        let removed: Vec<String> = self
            .records
            .iter()
            .filter(|r| doomed.contains(&r.id))
            .map(|r| r.id.clone())
            .collect();
        self.records.retain(|r| !doomed.contains(&r.id));
        self.reindex();
        removed
    }

    fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.id.clone(), pos))
            .collect();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&DuplicateRecord> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    pub fn records(&self) -> &[DuplicateRecord] {
        &self.records
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
