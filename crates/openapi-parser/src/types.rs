//! Type definitions for loaded API specifications

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP methods a path item may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    /// Map a path-item key (`get`, `post`, ...) to a method
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "patch" => Some(HttpMethod::Patch),
            "delete" => Some(HttpMethod::Delete),
            "head" => Some(HttpMethod::Head),
            "options" => Some(HttpMethod::Options),
            "trace" => Some(HttpMethod::Trace),
            _ => None,
        }
    }
}

/// Coarse type assigned to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Null,
    Unknown,
}

impl FieldType {
    /// Map a JSON Schema `type` keyword to a field type
    pub fn from_schema_type(name: &str) -> Self {
        match name {
            "string" => FieldType::String,
            "integer" => FieldType::Integer,
            "number" => FieldType::Number,
            "boolean" => FieldType::Boolean,
            "object" => FieldType::Object,
            "array" => FieldType::Array,
            "null" => FieldType::Null,
            _ => FieldType::Unknown,
        }
    }

    /// Infer the type of a sampled JSON value
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null => FieldType::Null,
            Value::Bool(_) => FieldType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => FieldType::Integer,
            Value::Number(_) => FieldType::Number,
            Value::String(_) => FieldType::String,
            Value::Array(_) => FieldType::Array,
            Value::Object(_) => FieldType::Object,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Null => "null",
            FieldType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A single field of an inferred dataset schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name; nested declared fields use dotted paths (`address.street`)
    pub name: String,
    /// Inferred type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field may be null or absent
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable,
        }
    }
}

/// Response schema declared inline by the spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredSchema {
    /// Concrete field list extracted from the schema
    Fields(Vec<Field>),
    /// The schema places no constraints on the value; fields must be sampled
    Unconstrained,
}

impl DeclaredSchema {
    /// Declared fields, empty when the schema is unconstrained
    pub fn fields(&self) -> &[Field] {
        match self {
            DeclaredSchema::Fields(fields) => fields,
            DeclaredSchema::Unconstrained => &[],
        }
    }
}

/// Normalized operation metadata
#[derive(Debug, Clone)]
pub struct Operation {
    /// operationId, if the spec declares one
    pub operation_id: Option<String>,
    /// Description, falling back to the summary
    pub description: String,
    /// Tags, de-duplicated in declaration order
    pub tags: Vec<String>,
    /// Whether the operation is deprecated
    pub deprecated: bool,
    /// Schema of the success response, if declared
    pub declared_schema: Option<DeclaredSchema>,
    /// Literal example of the success response, if declared
    pub declared_sample: Option<Value>,
}

/// A method entry of a path item that could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    /// Method key (or the path itself when the whole item is unusable)
    pub key: String,
    /// Why the entry was rejected
    pub reason: String,
}

/// All operations declared under one path template
#[derive(Debug, Clone, Default)]
pub struct PathItem {
    /// Interpretable operations keyed by method
    pub operations: IndexMap<HttpMethod, Operation>,
    /// Entries skipped while loading
    pub rejected: Vec<RejectedEntry>,
}

impl PathItem {
    pub fn get(&self) -> Option<&Operation> {
        self.operations.get(&HttpMethod::Get)
    }
}

/// Normalized specification document
#[derive(Debug, Clone)]
pub struct Specification {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// Path prefix shared by every endpoint (may be empty)
    pub base_path: String,
    /// Path templates in document order
    pub paths: IndexMap<String, PathItem>,
}

// --- Raw structure for parsing ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOperation {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub responses: IndexMap<String, Value>,
}
