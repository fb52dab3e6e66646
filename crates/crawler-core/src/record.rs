//! Dataset records produced by a crawl

use chrono::{DateTime, Utc};
use openapi_parser::{EndpointDescriptor, Field};
use serde::{Deserialize, Serialize};

/// Where a record's fields came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Declared response schema or inlined example
    Declared,
    /// Response of a concrete or forced URL
    SampledDirect,
    /// Response of a URL whose placeholders were guessed
    SampledGuessed,
}

/// One crawled dataset, handed to the catalog emitter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub dataset_name: String,
    /// `<source name>.<dataset name>`
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    pub documentation_url: String,
    pub fields: Vec<Field>,
    pub provenance: Provenance,
    pub crawled_at: DateTime<Utc>,
}

impl DatasetRecord {
    pub fn new(
        source_name: &str,
        endpoint: &EndpointDescriptor,
        documentation_url: String,
        fields: Vec<Field>,
        provenance: Provenance,
    ) -> Self {
        let dataset_name = endpoint.dataset_name();
        Self {
            qualified_name: format!("{}.{}", source_name, dataset_name),
            dataset_name,
            operation_id: endpoint.operation.operation_id.clone(),
            description: endpoint.operation.description.clone(),
            tags: endpoint.operation.tags.clone(),
            deprecated: endpoint.operation.deprecated,
            documentation_url,
            fields,
            provenance,
            crawled_at: Utc::now(),
        }
    }
}
