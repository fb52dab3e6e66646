//! Spec document parser

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{SpecError, SpecResult};
use crate::resolver::RefResolver;
use crate::schema::SchemaInferencer;
use crate::types::*;

/// Path-item keys that are not methods
const PATH_ITEM_FIELDS: [&str; 5] = ["parameters", "summary", "description", "servers", "$ref"];

/// Swagger 2.0 / OpenAPI 3.x parser
pub struct OpenApiParser;

impl OpenApiParser {
    /// Parse a spec from a string (auto-detects JSON/YAML)
    pub fn parse(content: &str) -> SpecResult<Specification> {
        if content.trim_start().starts_with('{') {
            Self::parse_json(content)
        } else {
            Self::parse_yaml(content)
        }
    }

    /// Parse a spec from JSON
    pub fn parse_json(content: &str) -> SpecResult<Specification> {
        let document: Value = serde_json::from_str(content)?;
        Self::from_document(&document)
    }

    /// Parse a spec from YAML
    pub fn parse_yaml(content: &str) -> SpecResult<Specification> {
        let document: Value = serde_yaml::from_str(content)?;
        Self::from_document(&document)
    }

    /// Normalize an already-decoded spec document
    pub fn from_document(document: &Value) -> SpecResult<Specification> {
        if !document.is_object() {
            return Err(SpecError::InvalidFormat(
                "document root is not a mapping".to_string(),
            ));
        }

        let version = Self::check_version(document)?;

        let info = document.get("info");
        let title = info
            .and_then(|i| i.get("title"))
            .and_then(scalar_string)
            .unwrap_or_default();
        let api_version = info
            .and_then(|i| i.get("version"))
            .and_then(scalar_string)
            .unwrap_or_default();

        debug!("Parsing {} spec: {}", version, title);

        let raw_paths = document
            .get("paths")
            .ok_or_else(|| SpecError::MissingField("paths".to_string()))?
            .as_object()
            .ok_or_else(|| SpecError::InvalidFormat("`paths` is not a mapping".to_string()))?;

        let resolver = RefResolver::new(document);
        let paths: IndexMap<String, PathItem> = raw_paths
            .iter()
            .map(|(path, item)| (path.clone(), Self::convert_path_item(path, item, &resolver)))
            .collect();

        debug!("Loaded {} paths", paths.len());

        Ok(Specification {
            title,
            version: api_version,
            base_path: Self::base_path(document),
            paths,
        })
    }

    /// Accept Swagger 2.x and OpenAPI 3.x documents
    fn check_version(document: &Value) -> SpecResult<String> {
        if let Some(version) = document.get("openapi").and_then(scalar_string) {
            if version.starts_with("3.") {
                return Ok(format!("OpenAPI {}", version));
            }
            return Err(SpecError::UnsupportedVersion(format!("openapi {}", version)));
        }

        if let Some(version) = document.get("swagger").and_then(scalar_string) {
            if version.starts_with('2') {
                return Ok(format!("Swagger {}", version));
            }
            return Err(SpecError::UnsupportedVersion(format!("swagger {}", version)));
        }

        Err(SpecError::MissingField("openapi or swagger".to_string()))
    }

    /// Swagger `basePath`, else the path of the first OpenAPI server URL
    fn base_path(document: &Value) -> String {
        let raw = match document.get("basePath").and_then(Value::as_str) {
            Some(base) => base.to_string(),
            None => document
                .get("servers")
                .and_then(Value::as_array)
                .and_then(|servers| servers.first())
                .and_then(|server| server.get("url"))
                .and_then(Value::as_str)
                .filter(|server_url| !server_url.contains('{'))
                .map(|server_url| {
                    if server_url.starts_with('/') {
                        server_url.to_string()
                    } else {
                        url::Url::parse(server_url)
                            .map(|u| u.path().to_string())
                            .unwrap_or_default()
                    }
                })
                .unwrap_or_default(),
        };

        let trimmed = raw.trim_end_matches('/');
        if trimmed.is_empty() || trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        }
    }

    fn convert_path_item(path: &str, item: &Value, resolver: &RefResolver) -> PathItem {
        let mut entry = PathItem::default();

        let item = if item.get("$ref").is_some() {
            resolver.resolve(item)
        } else {
            item.clone()
        };

        let Some(fields) = item.as_object() else {
            entry.rejected.push(RejectedEntry {
                key: path.to_string(),
                reason: "Path item is not an object".to_string(),
            });
            return entry;
        };

        for (key, value) in fields {
            match HttpMethod::from_key(key) {
                Some(method) => match Self::convert_operation(value, resolver) {
                    Ok(operation) => {
                        entry.operations.insert(method, operation);
                    }
                    Err(detail) => entry.rejected.push(RejectedEntry {
                        key: key.clone(),
                        reason: format!("Malformed operation metadata: {}", detail),
                    }),
                },
                None if PATH_ITEM_FIELDS.contains(&key.as_str()) || key.starts_with("x-") => {}
                None => entry.rejected.push(RejectedEntry {
                    key: key.clone(),
                    reason: "Unknown method".to_string(),
                }),
            }
        }

        entry
    }

    fn convert_operation(value: &Value, resolver: &RefResolver) -> Result<Operation, String> {
        let raw: RawOperation = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;

        let description = raw
            .description
            .filter(|d| !d.is_empty())
            .or(raw.summary)
            .unwrap_or_default();

        let mut tags: Vec<String> = Vec::with_capacity(raw.tags.len());
        for tag in raw.tags {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        let response = Self::success_response(&raw.responses).map(|r| resolver.resolve(r));
        let (declared_schema, declared_sample) = match &response {
            Some(response) => (
                Self::response_schema(response).map(SchemaInferencer::from_declared),
                Self::response_example(response),
            ),
            None => (None, None),
        };

        Ok(Operation {
            operation_id: raw.operation_id,
            description,
            tags,
            deprecated: raw.deprecated,
            declared_schema,
            declared_sample,
        })
    }

    /// `200`, else the first other 2xx response in document order
    fn success_response(responses: &IndexMap<String, Value>) -> Option<&Value> {
        responses.get("200").or_else(|| {
            responses
                .iter()
                .find(|(status, _)| status.starts_with('2'))
                .map(|(_, response)| response)
        })
    }

    /// OpenAPI 3 `content.<json>.schema`, else Swagger 2 `schema`
    fn response_schema(response: &Value) -> Option<&Value> {
        match Self::json_media(response) {
            Some(media) => media.get("schema"),
            None => response.get("schema"),
        }
    }

    fn response_example(response: &Value) -> Option<Value> {
        if let Some(media) = Self::json_media(response) {
            return media
                .get("example")
                .or_else(|| {
                    media
                        .get("examples")
                        .and_then(Value::as_object)
                        .and_then(|examples| examples.values().next())
                        .and_then(|example| example.get("value"))
                })
                .or_else(|| media.get("schema").and_then(|s| s.get("example")))
                .cloned();
        }

        response
            .get("examples")
            .and_then(Value::as_object)
            .and_then(Self::pick_json)
            .or_else(|| response.get("schema").and_then(|s| s.get("example")))
            .cloned()
    }

    fn json_media(response: &Value) -> Option<&Value> {
        response
            .get("content")
            .and_then(Value::as_object)
            .and_then(Self::pick_json)
    }

    /// Prefer a JSON media type, else the first one declared
    fn pick_json(media: &Map<String, Value>) -> Option<&Value> {
        media
            .iter()
            .find(|(content_type, _)| content_type.contains("json"))
            .or_else(|| media.iter().next())
            .map(|(_, value)| value)
    }
}

/// Render a string or number scalar (YAML often leaves versions unquoted)
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
