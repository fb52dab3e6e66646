//! Field-level schema inference from declared schemas and sampled payloads

use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{DeclaredSchema, Field, FieldType};

/// Maximum nesting followed when flattening declared properties
const MAX_DEPTH: usize = 10;

/// Keys whose members are merged into the enclosing schema
const COMPOSITION_KEYS: [&str; 3] = ["allOf", "oneOf", "anyOf"];

/// Result of inferring fields from a sampled value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleInference {
    /// Top-level fields of the representative element
    pub fields: Vec<Field>,
    /// The representative element itself, used to seed later guesses
    pub sample: Option<Map<String, Value>>,
    /// Why no fields could be inferred, if so
    pub warning: Option<String>,
}

impl SampleInference {
    fn warn(reason: &str) -> Self {
        Self {
            fields: Vec::new(),
            sample: None,
            warning: Some(reason.to_string()),
        }
    }
}

/// Infers dataset fields from schemas and samples
pub struct SchemaInferencer;

impl SchemaInferencer {
    /// Flatten a declared (already `$ref`-resolved) response schema.
    ///
    /// Returns [`DeclaredSchema::Unconstrained`] when the schema does not
    /// describe any property, so callers fall back to sampling.
    pub fn from_declared(schema: &Value) -> DeclaredSchema {
        if Self::is_any_value(schema) {
            return DeclaredSchema::Unconstrained;
        }

        let record = Self::record_schema(schema);
        let mut fields = Vec::new();
        Self::collect_properties(record, "", &mut fields, 0);

        if fields.is_empty() {
            DeclaredSchema::Unconstrained
        } else {
            DeclaredSchema::Fields(fields)
        }
    }

    /// Infer top-level fields from a sampled payload.
    ///
    /// Arrays are represented by their first element. An object with a
    /// single array-valued key is treated as a list envelope.
    pub fn from_sample(value: &Value, dataset_name: &str) -> SampleInference {
        let element = match value {
            Value::Array(items) => match items.first() {
                Some(first) => first,
                None => {
                    debug!("Empty sample for dataset {}", dataset_name);
                    return SampleInference::warn("Empty data");
                }
            },
            Value::Object(map) => match Self::envelope_items(map) {
                Some(items) => match items.first() {
                    Some(first) => first,
                    None => {
                        debug!("Empty enveloped sample for dataset {}", dataset_name);
                        return SampleInference::warn("Empty data");
                    }
                },
                None => value,
            },
            _ => return SampleInference::warn("Unsupported sample shape"),
        };

        let Value::Object(record) = element else {
            debug!("Representative element of {} is not an object", dataset_name);
            return SampleInference::warn("Unsupported sample shape");
        };

        let fields = record
            .iter()
            .map(|(name, value)| Field::new(name.clone(), FieldType::of_value(value), value.is_null()))
            .collect();

        SampleInference {
            fields,
            sample: Some(record.clone()),
            warning: None,
        }
    }

    /// `{}`, non-objects and the explicit `AnyValue` marker accept anything
    fn is_any_value(schema: &Value) -> bool {
        match schema.as_object() {
            Some(obj) => obj.is_empty() || obj.contains_key("AnyValue"),
            None => true,
        }
    }

    /// Descend through array schemas to the schema of one record
    fn record_schema(schema: &Value) -> &Value {
        let mut current = schema;
        for _ in 0..MAX_DEPTH {
            match current.get("items") {
                Some(items) if Self::is_array_schema(current) => current = items,
                _ => break,
            }
        }
        current
    }

    fn is_array_schema(schema: &Value) -> bool {
        match schema.get("type") {
            Some(Value::String(t)) => t == "array",
            Some(Value::Array(types)) => types.iter().any(|t| t == "array"),
            _ => schema.get("items").is_some() && schema.get("properties").is_none(),
        }
    }

    fn collect_properties(schema: &Value, prefix: &str, out: &mut Vec<Field>, depth: usize) {
        if depth > MAX_DEPTH {
            return;
        }

        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, prop) in properties {
                let full_name = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", prefix, name)
                };

                if out.iter().any(|f| f.name == full_name) {
                    continue;
                }

                let nullable = Self::declared_nullable(prop) || !required.contains(&name.as_str());
                out.push(Field::new(full_name.clone(), Self::declared_type(prop), nullable));

                let nested = Self::record_schema(prop);
                if Self::has_structure(nested) {
                    Self::collect_properties(nested, &full_name, out, depth + 1);
                }
            }
        }

        for key in COMPOSITION_KEYS {
            if let Some(members) = schema.get(key).and_then(Value::as_array) {
                for member in members {
                    Self::collect_properties(member, prefix, out, depth + 1);
                }
            }
        }
    }

    fn has_structure(schema: &Value) -> bool {
        schema.get("properties").is_some() || COMPOSITION_KEYS.iter().any(|k| schema.get(k).is_some())
    }

    fn declared_type(prop: &Value) -> FieldType {
        match prop.get("type") {
            Some(Value::String(t)) => FieldType::from_schema_type(t),
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null")
                .map(FieldType::from_schema_type)
                .unwrap_or(FieldType::Null),
            _ if prop.get("properties").is_some() => FieldType::Object,
            _ if prop.get("items").is_some() => FieldType::Array,
            _ if Self::has_structure(prop) => FieldType::Object,
            _ => FieldType::Unknown,
        }
    }

    fn declared_nullable(prop: &Value) -> bool {
        let flagged = |key: &str| prop.get(key).and_then(Value::as_bool).unwrap_or(false);
        let null_in_type = prop
            .get("type")
            .and_then(Value::as_array)
            .map(|types| types.iter().any(|t| t == "null"))
            .unwrap_or(false);

        flagged("nullable") || flagged("x-nullable") || null_in_type
    }

    /// Items of a `{"key": [...]}` envelope, if `map` is one
    fn envelope_items(map: &Map<String, Value>) -> Option<&Vec<Value>> {
        if map.len() != 1 {
            return None;
        }
        match map.values().next() {
            Some(Value::Array(items)) if items.first().map_or(true, Value::is_object) => Some(items),
            _ => None,
        }
    }
}
