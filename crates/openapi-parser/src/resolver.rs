//! Local `$ref` resolution for spec documents

use serde_json::Value;

/// Resolves local `#/...` references against the document they came from
pub struct RefResolver<'a> {
    /// The whole spec document
    document: &'a Value,
    /// Maximum number of nested references followed along one branch
    max_depth: usize,
}

impl<'a> RefResolver<'a> {
    /// Create a resolver over a parsed spec document
    pub fn new(document: &'a Value) -> Self {
        Self {
            document,
            max_depth: 10,
        }
    }

    /// Return a copy of `value` with every resolvable reference inlined.
    ///
    /// A reference that points back into one of its own ancestors is left as
    /// a bare `$ref` object so cyclic schemas terminate.
    pub fn resolve(&self, value: &Value) -> Value {
        let mut chain = Vec::new();
        self.resolve_inner(value, &mut chain)
    }

    fn resolve_inner(&self, value: &Value, chain: &mut Vec<String>) -> Value {
        match value {
            Value::Object(obj) => {
                if let Some(ref_str) = obj.get("$ref").and_then(Value::as_str) {
                    if chain.len() >= self.max_depth || chain.iter().any(|r| r == ref_str) {
                        return value.clone();
                    }
                    return match self.lookup(ref_str) {
                        Some(target) => {
                            chain.push(ref_str.to_string());
                            let resolved = self.resolve_inner(target, chain);
                            chain.pop();
                            resolved
                        }
                        None => value.clone(),
                    };
                }

                let mut result = serde_json::Map::new();
                for (key, item) in obj {
                    let resolved = match key.as_str() {
                        // Literal payloads are data, not schema
                        "example" | "examples" => item.clone(),
                        _ => self.resolve_inner(item, chain),
                    };
                    result.insert(key.clone(), resolved);
                }
                Value::Object(result)
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve_inner(item, chain))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    /// Look up a local reference such as `#/components/schemas/User`
    fn lookup(&self, ref_str: &str) -> Option<&'a Value> {
        let pointer = ref_str.strip_prefix('#')?;
        self.document.pointer(pointer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_components_ref() {
        let document = json!({
            "components": {
                "schemas": {
                    "User": {
                        "type": "object",
                        "properties": {"name": {"type": "string"}}
                    }
                }
            }
        });

        let resolver = RefResolver::new(&document);
        let resolved = resolver.resolve(&json!({"$ref": "#/components/schemas/User"}));

        assert_eq!(resolved["type"], "object");
        assert_eq!(resolved["properties"]["name"]["type"], "string");
    }

    #[test]
    fn test_resolve_swagger_definitions_nested() {
        let document = json!({
            "definitions": {
                "Address": {"type": "object", "properties": {"street": {"type": "string"}}},
                "User": {
                    "type": "object",
                    "properties": {"address": {"$ref": "#/definitions/Address"}}
                }
            }
        });

        let resolver = RefResolver::new(&document);
        let resolved = resolver.resolve(&json!({
            "type": "array",
            "items": {"$ref": "#/definitions/User"}
        }));

        assert_eq!(
            resolved["items"]["properties"]["address"]["properties"]["street"]["type"],
            "string"
        );
    }

    #[test]
    fn test_cyclic_ref_terminates() {
        let document = json!({
            "definitions": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "integer"},
                        "parent": {"$ref": "#/definitions/Node"}
                    }
                }
            }
        });

        let resolver = RefResolver::new(&document);
        let resolved = resolver.resolve(&json!({"$ref": "#/definitions/Node"}));

        assert_eq!(resolved["properties"]["value"]["type"], "integer");
        assert_eq!(
            resolved["properties"]["parent"]["$ref"],
            "#/definitions/Node"
        );
    }

    #[test]
    fn test_unknown_ref_left_in_place() {
        let document = json!({});
        let resolver = RefResolver::new(&document);
        let schema = json!({"$ref": "other.yaml#/User"});
        assert_eq!(resolver.resolve(&schema), schema);
    }

    #[test]
    fn test_examples_not_resolved() {
        let document = json!({"definitions": {"X": {"type": "string"}}});
        let resolver = RefResolver::new(&document);
        let value = json!({"example": {"$ref": "#/definitions/X"}});
        assert_eq!(resolver.resolve(&value), value);
    }
}
