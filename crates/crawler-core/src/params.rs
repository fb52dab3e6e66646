//! Placeholder resolution for parameterized path templates
//!
//! A template is resolved, in order of preference, by being concrete already,
//! by an operator-supplied forced example, or by guessing a value from a
//! sample captured on an ancestor listing endpoint.

use openapi_parser::{dataset_name, placeholders, substitute, Placeholder};
use serde_json::Value;
use tracing::debug;

use crate::cache::{Sample, SampleCache};
use crate::config::ForcedExample;
use crate::error::{CrawlError, Result};

/// How a template became a concrete path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The template had no placeholders
    Concrete(String),
    /// Values came from a forced example
    Forced(String),
    /// Values were guessed from cached samples
    Guessed(String),
}

impl Resolution {
    /// The concrete path
    pub fn path(&self) -> &str {
        match self {
            Resolution::Concrete(path) | Resolution::Forced(path) | Resolution::Guessed(path) => path,
        }
    }

    pub fn is_guessed(&self) -> bool {
        matches!(self, Resolution::Guessed(_))
    }
}

/// Turns path templates into concrete paths
pub struct ParameterResolver;

impl ParameterResolver {
    /// Resolve a template against a forced example or the sample cache.
    ///
    /// Fails with [`CrawlError::UnresolvableParameter`] naming the first
    /// placeholder that could not be filled.
    pub fn resolve(
        template: &str,
        forced: Option<&ForcedExample>,
        cache: &SampleCache,
    ) -> Result<Resolution> {
        if !template.contains('{') {
            return Ok(Resolution::Concrete(template.to_string()));
        }

        if let Some(example) = forced {
            return Self::resolve_forced(template, example).map(Resolution::Forced);
        }

        Self::guess(template, cache).map(Resolution::Guessed)
    }

    /// Whether resolving `template` depends on the sample cache
    pub fn needs_guessing(template: &str, forced: Option<&ForcedExample>) -> bool {
        template.contains('{') && forced.is_none()
    }

    /// Substitute a forced example into a template
    pub fn resolve_forced(template: &str, example: &ForcedExample) -> Result<String> {
        let slots = placeholders(template);

        let values = match example {
            ForcedExample::Positional(values) => {
                if values.len() > slots.len() {
                    debug!(
                        "Forced example for {} has {} values for {} placeholders, ignoring extras",
                        template,
                        values.len(),
                        slots.len()
                    );
                }
                slots
                    .iter()
                    .enumerate()
                    .map(|(index, slot)| {
                        values
                            .get(index)
                            .and_then(scalar_text)
                            .ok_or_else(|| unresolvable(template, slot))
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            ForcedExample::Named(values) => slots
                .iter()
                .map(|slot| {
                    values
                        .get(&slot.name)
                        .and_then(scalar_text)
                        .ok_or_else(|| unresolvable(template, slot))
                })
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(substitute(template, &values))
    }

    fn guess(template: &str, cache: &SampleCache) -> Result<String> {
        let values = placeholders(template)
            .iter()
            .map(|slot| {
                Self::guess_one(template, slot, cache).ok_or_else(|| unresolvable(template, slot))
            })
            .collect::<Result<Vec<_>>>()?;

        let path = substitute(template, &values);
        debug!("Guessed {} for {}", path, template);
        Ok(path)
    }

    /// Try ancestor datasets, longest first, until one yields a value
    fn guess_one(template: &str, slot: &Placeholder, cache: &SampleCache) -> Option<String> {
        ancestor_datasets(template, slot.segment).into_iter().find_map(|dataset| {
            let sample = cache.get(&dataset)?;
            let (key, value) = select_key(&slot.name, sample)?;
            debug!("Using {}.{} = {} for {{{}}}", dataset, key, value, slot.name);
            Some(value)
        })
    }
}

/// Dataset names of the prefixes preceding `segment`, longest first
fn ancestor_datasets(template: &str, segment: usize) -> Vec<String> {
    if segment == 0 {
        return vec![dataset_name("/")];
    }

    let segments: Vec<&str> = template.trim_start_matches('/').split('/').collect();
    (1..=segment.min(segments.len()))
        .rev()
        .map(|len| dataset_name(&segments[..len].join("/")))
        .collect()
}

/// Pick the sample key whose value fills `placeholder`.
///
/// First match wins: exact name, normalized name, longest normalized
/// suffix of the placeholder, `id`, then the first scalar key.
fn select_key<'a>(placeholder: &str, sample: &'a Sample) -> Option<(&'a str, String)> {
    let scalars: Vec<(&str, String)> = sample
        .iter()
        .filter_map(|(key, value)| scalar_text(value).map(|text| (key.as_str(), text)))
        .collect();

    let wanted = normalize(placeholder);

    let exact = scalars.iter().find(|(key, _)| *key == placeholder);
    let normalized = || scalars.iter().find(|(key, _)| normalize(key) == wanted);
    let suffix = || {
        let mut best: Option<&(&str, String)> = None;
        for candidate in &scalars {
            let key = normalize(candidate.0);
            if key.is_empty() || !wanted.ends_with(&key) {
                continue;
            }
            if best.map_or(true, |b| normalize(b.0).len() < key.len()) {
                best = Some(candidate);
            }
        }
        best
    };
    let id = || scalars.iter().find(|(key, _)| *key == "id");

    exact
        .or_else(normalized)
        .or_else(suffix)
        .or_else(id)
        .or_else(|| scalars.first())
        .cloned()
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Text of a string, number or boolean; `None` for anything else
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn unresolvable(template: &str, slot: &Placeholder) -> CrawlError {
    CrawlError::UnresolvableParameter {
        path: template.to_string(),
        placeholder: slot.name.clone(),
    }
}
