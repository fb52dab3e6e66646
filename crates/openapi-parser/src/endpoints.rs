//! GET endpoint enumeration and path-template helpers

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::types::{Operation, Specification};

/// `{name}` placeholders inside a path template
fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}/]+)\}").expect("placeholder pattern is valid"))
}

/// Derive a dataset name from a path: `/a/b/` -> `a.b`, `/` -> `root`
pub fn dataset_name(path: &str) -> String {
    let name = path.trim_matches('/').replace('/', ".");
    if name.is_empty() {
        "root".to_string()
    } else {
        name
    }
}

/// A placeholder found in a path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Name between the braces
    pub name: String,
    /// Index of the path segment (leading `/` ignored) holding the placeholder
    pub segment: usize,
}

/// All placeholders of a template, in order of appearance
pub fn placeholders(template: &str) -> Vec<Placeholder> {
    template
        .trim_start_matches('/')
        .split('/')
        .enumerate()
        .flat_map(|(segment, part)| {
            placeholder_regex().captures_iter(part).map(move |caps| Placeholder {
                name: caps[1].to_string(),
                segment,
            })
        })
        .collect()
}

/// Replace the placeholders of a template, in order, with `values`.
///
/// Each value is percent-encoded as a single path segment. Placeholders
/// beyond the end of `values` are left untouched.
pub fn substitute(template: &str, values: &[String]) -> String {
    let mut index = 0;
    placeholder_regex()
        .replace_all(template, |caps: &regex::Captures| {
            let replacement = match values.get(index) {
                Some(value) => urlencoding::encode(value).into_owned(),
                None => caps[0].to_string(),
            };
            index += 1;
            replacement
        })
        .into_owned()
}

/// A GET endpoint selected for crawling
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    /// Path template, possibly containing `{name}` placeholders
    pub path: String,
    /// GET operation metadata
    pub operation: Operation,
}

impl EndpointDescriptor {
    /// Dataset name derived from the path template
    pub fn dataset_name(&self) -> String {
        dataset_name(&self.path)
    }

    /// Whether the template can be requested without substitution
    pub fn is_concrete(&self) -> bool {
        !self.path.contains('{')
    }
}

/// A spec entry skipped during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationWarning {
    /// Path template
    pub key: String,
    pub reason: String,
}

/// Ordered GET endpoints plus the entries that had to be skipped
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    pub endpoints: Vec<EndpointDescriptor>,
    pub warnings: Vec<EnumerationWarning>,
}

/// Walks a specification and selects GET endpoints
pub struct EndpointEnumerator;

impl EndpointEnumerator {
    /// Enumerate GET endpoints in document order.
    ///
    /// Paths listed in `ignore` are dropped before anything else, without a
    /// warning. Never fails: unusable entries become warnings.
    pub fn enumerate(spec: &Specification, ignore: &[String]) -> Enumeration {
        let mut enumeration = Enumeration::default();

        for (path, item) in &spec.paths {
            if ignore.iter().any(|ignored| ignored == path) {
                debug!("Ignoring endpoint {}", path);
                continue;
            }

            for rejected in &item.rejected {
                let reason = if rejected.key == *path {
                    rejected.reason.clone()
                } else {
                    format!("{}: {}", rejected.key, rejected.reason)
                };
                warn!("Skipping entry of {}: {}", path, reason);
                enumeration.warnings.push(EnumerationWarning {
                    key: path.clone(),
                    reason,
                });
            }

            match item.get() {
                Some(operation) => enumeration.endpoints.push(EndpointDescriptor {
                    path: path.clone(),
                    operation: operation.clone(),
                }),
                None if item.operations.is_empty() && item.rejected.is_empty() => {
                    warn!("No method declared for {}", path);
                    enumeration.warnings.push(EnumerationWarning {
                        key: path.clone(),
                        reason: "No method declared".to_string(),
                    });
                }
                None => debug!("No GET operation for {}", path),
            }
        }

        debug!(
            "Enumerated {} GET endpoints ({} warnings)",
            enumeration.endpoints.len(),
            enumeration.warnings.len()
        );

        enumeration
    }
}
