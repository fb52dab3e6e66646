//! Samples captured from listing endpoints during one crawl

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A representative record fetched from a listing endpoint
pub type Sample = Map<String, Value>;

/// Dataset name -> most recent sample, used to guess placeholder values
#[derive(Debug, Clone, Default)]
pub struct SampleCache {
    samples: IndexMap<String, Sample>,
}

impl SampleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample recorded for a dataset, if any
    pub fn get(&self, dataset_name: &str) -> Option<&Sample> {
        self.samples.get(dataset_name)
    }

    /// Record a sample, replacing any earlier one for the dataset
    pub fn insert(&mut self, dataset_name: impl Into<String>, sample: Sample) {
        self.samples.insert(dataset_name.into(), sample);
    }

    pub fn contains(&self, dataset_name: &str) -> bool {
        self.samples.contains_key(dataset_name)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(value: Value) -> Sample {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_insert_replaces_previous_sample() {
        let mut cache = SampleCache::new();
        assert!(cache.get("users").is_none());

        cache.insert("users", sample(json!({"id": 1})));
        cache.insert("users", sample(json!({"id": 2})));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("users").unwrap()["id"], 2);
    }
}
