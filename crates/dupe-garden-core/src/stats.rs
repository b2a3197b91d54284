use crate::model::DuplicateRecord;
use std::collections::BTreeMap;

/// Lower edges of the similarity buckets; the last value is the exclusive upper bound.
pub const SIMILARITY_EDGES: [f64; 6] = [0.0, 0.5, 0.75, 0.85, 0.95, 1.01];
pub const SIMILARITY_LABELS: [&str; 5] = ["0-50%", "50-75%", "75-85%", "85-95%", "95-100%"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityHistogram {
    pub counts: [usize; 5],
}

impl SimilarityHistogram {
    pub fn add(&mut self, score: f64) {
        if let Some(bucket) = bucket_for(score) {
            self.counts[bucket] += 1;
        }
    }

    /// `(label, count)` pairs in bucket order.
    pub fn buckets(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        SIMILARITY_LABELS.iter().copied().zip(self.counts.iter().copied())
    }

    pub fn count(&self, label: &str) -> usize {
        self.buckets()
            .find(|(l, _)| *l == label)
            .map(|(_, c)| c)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

fn bucket_for(score: f64) -> Option<usize> {
    SIMILARITY_EDGES
        .windows(2)
        .position(|edge| score >= edge[0] && score < edge[1])
}

/// Aggregate figures over a record set, for charts and summaries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicateStats {
    pub total: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub by_service: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub similarity: SimilarityHistogram,
    /// Mean score in `[0, 1]`, missing scores counted as 0.
    pub mean_similarity: f64,
}

impl DuplicateStats {
    pub fn compute<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a DuplicateRecord>,
    {
        let mut stats = DuplicateStats::default();
        let mut score_sum = 0.0;

        for record in records {
            stats.total += 1;
            *stats.by_kind.entry(record.kind.as_str().to_string()).or_default() += 1;
            *stats
                .by_service
                .entry(record.service.as_str().to_string())
                .or_default() += 1;
            *stats
                .by_status
                .entry(record.status.as_str().to_string())
                .or_default() += 1;

            let score = record.similarity();
            stats.similarity.add(score);
            score_sum += score;
        }

        if stats.total > 0 {
            stats.mean_similarity = score_sum / stats.total as f64;
        }
        stats
    }

    /// Share of each kind as a percentage of all records.
    pub fn kind_percentages(&self) -> Vec<(String, f64)> {
        if self.total == 0 {
            return Vec::new();
        }
        self.by_kind
            .iter()
            .map(|(kind, &count)| (kind.clone(), count as f64 * 100.0 / self.total as f64))
            .collect()
    }
}
