use std::collections::{BTreeMap, HashSet};

use crate::models::ImageRecord;

/// Ordered, URL-keyed set of image records built up across acquisition passes.
///
/// The first sighting of a URL fixes its alt text, provenance and pass index;
/// later sightings are ignored.
#[derive(Debug, Default)]
pub struct ImageAccumulator {
    records: Vec<ImageRecord>,
    seen: HashSet<String>,
}

impl ImageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the record was new.
    pub fn insert(&mut self, record: ImageRecord) -> bool {
        if self.seen.contains(&record.url) {
            return false;
        }
        self.seen.insert(record.url.clone());
        self.records.push(record);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn stats_by_provenance(&self) -> BTreeMap<String, usize> {
        let mut stats = BTreeMap::new();
        for record in &self.records {
            *stats.entry(record.provenance.clone()).or_insert(0) += 1;
        }
        stats
    }

    pub fn stats_by_pass(&self) -> BTreeMap<i64, usize> {
        let mut stats = BTreeMap::new();
        for record in &self.records {
            *stats.entry(record.pass_index).or_insert(0) += 1;
        }
        stats
    }

    pub fn into_records(self) -> Vec<ImageRecord> {
        self.records
    }
}
