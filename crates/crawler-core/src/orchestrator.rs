//! Crawl orchestration
//!
//! Endpoints are planned up front, then settled in enumeration order.
//! Endpoints that need a guessed placeholder value act as barriers: they run
//! only once every earlier endpoint has completed, because the guess reads
//! samples those endpoints may have produced. Runs of other endpoints are
//! fetched concurrently, bounded by `max_concurrent_fetches`.

use futures::future;
use futures::stream::{self, StreamExt};
use openapi_parser::{
    clean_url, Credentials, DeclaredSchema, EndpointDescriptor, EndpointEnumerator, Field,
    SchemaInferencer, SpecLoader, Specification,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{Sample, SampleCache};
use crate::config::CrawlConfig;
use crate::error::{CrawlError, Result};
use crate::fetcher::{Fetcher, ReqwestFetcher, ResponseClass};
use crate::params::{ParameterResolver, Resolution};
use crate::record::{DatasetRecord, Provenance};
use crate::report::CrawlReport;

/// Warning attached to endpoints that produced no fields
pub const NO_FIELDS: &str = "No Fields";

/// Terminal state of one endpoint
#[derive(Debug, Clone)]
pub enum EndpointState {
    Emitted(DatasetRecord),
    /// Inlined example without any field
    SkippedNoFields,
    /// A placeholder could not be filled
    SkippedUnresolvable,
    /// The API answered with a recoverable error status
    SkippedBadResponse(ResponseClass),
}

#[derive(Debug, Clone)]
pub struct EndpointOutcome {
    /// Path template
    pub path: String,
    pub state: EndpointState,
}

/// Result of a crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    /// Settled endpoints, in enumeration order
    pub endpoints: Vec<EndpointOutcome>,
    pub report: CrawlReport,
    /// Listing samples collected during the run
    pub samples: SampleCache,
    /// Whether the run stopped before settling every endpoint
    pub cancelled: bool,
}

impl CrawlOutcome {
    /// Emitted records, in enumeration order
    pub fn records(&self) -> impl Iterator<Item = &DatasetRecord> {
        self.endpoints.iter().filter_map(|outcome| match &outcome.state {
            EndpointState::Emitted(record) => Some(record),
            _ => None,
        })
    }

    /// State of the endpoint with the given path template
    pub fn state_of(&self, path: &str) -> Option<&EndpointState> {
        self.endpoints
            .iter()
            .find(|outcome| outcome.path == path)
            .map(|outcome| &outcome.state)
    }
}

/// What an endpoint needs before it can be settled
enum Plan {
    Ready(Step),
    /// Resolution must wait for the samples of every earlier endpoint
    Guess,
}

/// Work for one endpoint whose path needs no further resolution
enum Step {
    Declared(Vec<Field>),
    DeclaredSample(Value),
    Fetch {
        path: String,
        provenance: Provenance,
        seeds_cache: bool,
    },
    Unresolvable(String),
}

/// Contribution of one endpoint, applied to the crawl state in order
struct Settled {
    state: EndpointState,
    warnings: Vec<String>,
    sample: Option<Sample>,
}

impl Settled {
    fn skipped(state: EndpointState, warning: Option<&str>) -> Self {
        Self {
            state,
            warnings: warning.map(str::to_string).into_iter().collect(),
            sample: None,
        }
    }
}

/// Drives one crawl over a loaded specification
pub struct Crawler<F> {
    config: CrawlConfig,
    fetcher: F,
    credentials: Credentials,
    cancel: CancellationToken,
}

impl<F: Fetcher> Crawler<F> {
    pub fn new(config: CrawlConfig, fetcher: F, credentials: Credentials) -> Self {
        Self {
            config,
            fetcher,
            credentials,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop scheduling endpoint work once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Crawl every GET endpoint of `spec`.
    ///
    /// Per-endpoint failures become warnings. Only an unexpected status
    /// code or a transport failure aborts the crawl.
    pub async fn crawl(&self, spec: &Specification) -> Result<CrawlOutcome> {
        let enumeration = EndpointEnumerator::enumerate(spec, &self.config.ignore_endpoints);

        let mut outcome = CrawlOutcome::default();
        for warning in &enumeration.warnings {
            outcome.report.report_warning(&warning.key, &warning.reason);
        }

        let planned = enumeration
            .endpoints
            .iter()
            .map(|endpoint| -> Result<_> { Ok((endpoint, self.plan(endpoint)?)) })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Crawling {} endpoints of {} {}",
            planned.len(),
            spec.title,
            spec.version
        );

        let mut rest = planned.as_slice();
        while let Some((endpoint, plan)) = rest.first() {
            if self.cancel.is_cancelled() {
                break;
            }

            if let Plan::Guess = plan {
                let step = Self::step_for(ParameterResolver::resolve(
                    &endpoint.path,
                    None,
                    &outcome.samples,
                ))?;
                let settled = self.settle(spec, endpoint, &step).await?;
                Self::apply(endpoint, settled, &mut outcome);
                rest = &rest[1..];
                continue;
            }

            let batch_len = rest
                .iter()
                .position(|(_, plan)| matches!(plan, Plan::Guess))
                .unwrap_or(rest.len());
            let (batch, tail) = rest.split_at(batch_len);
            self.run_batch(spec, batch, &mut outcome).await?;
            rest = tail;
        }

        outcome.cancelled = outcome.endpoints.len() < planned.len();
        if outcome.cancelled {
            info!(
                "Crawl cancelled after {} of {} endpoints",
                outcome.endpoints.len(),
                planned.len()
            );
        }

        info!(
            "Crawl finished: {} records, {} warnings",
            outcome.records().count(),
            outcome.report.len()
        );
        Ok(outcome)
    }

    fn plan(&self, endpoint: &EndpointDescriptor) -> Result<Plan> {
        let operation = &endpoint.operation;

        if let Some(DeclaredSchema::Fields(fields)) = &operation.declared_schema {
            if !fields.is_empty() {
                return Ok(Plan::Ready(Step::Declared(fields.clone())));
            }
        }
        // An empty or null example says nothing, so sample the endpoint instead
        if let Some(sample) = operation.declared_sample.as_ref().filter(|s| !is_blank(s)) {
            return Ok(Plan::Ready(Step::DeclaredSample(sample.clone())));
        }

        let forced = self.config.forced_examples.get(&endpoint.path);
        if ParameterResolver::needs_guessing(&endpoint.path, forced) {
            return Ok(Plan::Guess);
        }

        // Concrete or forced: the cache is never consulted
        let resolution = ParameterResolver::resolve(&endpoint.path, forced, &SampleCache::new());
        Ok(Plan::Ready(Self::step_for(resolution)?))
    }

    fn step_for(resolution: Result<Resolution>) -> Result<Step> {
        match resolution {
            Ok(Resolution::Concrete(path)) => Ok(Step::Fetch {
                path,
                provenance: Provenance::SampledDirect,
                seeds_cache: true,
            }),
            Ok(Resolution::Forced(path)) => Ok(Step::Fetch {
                path,
                provenance: Provenance::SampledDirect,
                seeds_cache: false,
            }),
            Ok(Resolution::Guessed(path)) => Ok(Step::Fetch {
                path,
                provenance: Provenance::SampledGuessed,
                seeds_cache: false,
            }),
            Err(e) if !e.is_fatal() => Ok(Step::Unresolvable(e.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Settle a run of endpoints that do not depend on each other
    async fn run_batch(
        &self,
        spec: &Specification,
        batch: &[(&EndpointDescriptor, Plan)],
        outcome: &mut CrawlOutcome,
    ) -> Result<()> {
        let cancel = &self.cancel;
        let mut settled = stream::iter(batch.iter().filter_map(|(endpoint, plan)| match plan {
            Plan::Ready(step) => Some((*endpoint, step)),
            Plan::Guess => None,
        }))
        .take_while(|_| future::ready(!cancel.is_cancelled()))
        .map(|(endpoint, step)| async move { (endpoint, self.settle(spec, endpoint, step).await) })
        .buffered(self.config.max_concurrent_fetches.max(1));

        while let Some((endpoint, result)) = settled.next().await {
            Self::apply(endpoint, result?, outcome);
        }
        Ok(())
    }

    async fn settle(
        &self,
        spec: &Specification,
        endpoint: &EndpointDescriptor,
        step: &Step,
    ) -> Result<Settled> {
        match step {
            Step::Declared(fields) => {
                debug!("Using declared schema of {}", endpoint.path);
                Ok(Settled {
                    state: EndpointState::Emitted(self.record(
                        spec,
                        endpoint,
                        fields.clone(),
                        Provenance::Declared,
                    )),
                    warnings: Vec::new(),
                    sample: None,
                })
            }
            Step::DeclaredSample(value) => {
                debug!("Using declared example of {}", endpoint.path);
                let inference = SchemaInferencer::from_sample(value, &endpoint.dataset_name());
                let mut warnings: Vec<String> = inference.warning.into_iter().collect();

                if inference.fields.is_empty() {
                    warnings.push(NO_FIELDS.to_string());
                    return Ok(Settled {
                        state: EndpointState::SkippedNoFields,
                        warnings,
                        sample: None,
                    });
                }

                Ok(Settled {
                    state: EndpointState::Emitted(self.record(
                        spec,
                        endpoint,
                        inference.fields,
                        Provenance::Declared,
                    )),
                    warnings,
                    sample: None,
                })
            }
            Step::Unresolvable(reason) => Ok(Settled::skipped(
                EndpointState::SkippedUnresolvable,
                Some(reason.as_str()),
            )),
            Step::Fetch {
                path,
                provenance,
                seeds_cache,
            } => {
                self.fetch(spec, endpoint, path, *provenance, *seeds_cache)
                    .await
            }
        }
    }

    async fn fetch(
        &self,
        spec: &Specification,
        endpoint: &EndpointDescriptor,
        path: &str,
        provenance: Provenance,
        seeds_cache: bool,
    ) -> Result<Settled> {
        let url = self.url_for(spec, path);
        let response = self.fetcher.fetch(&url, &self.credentials).await?;

        match ResponseClass::classify(response.status) {
            ResponseClass::Success => {}
            ResponseClass::Unexpected(status) => {
                return Err(CrawlError::UnexpectedResponse {
                    status,
                    key: endpoint.path.clone(),
                })
            }
            class => {
                return Ok(Settled::skipped(
                    EndpointState::SkippedBadResponse(class),
                    class.reason(),
                ))
            }
        }

        let dataset = endpoint.dataset_name();
        let value = serde_json::from_str(&response.body).unwrap_or_else(|e| {
            debug!("Response of {} is not JSON: {}", url, e);
            Value::Null
        });

        let inference = SchemaInferencer::from_sample(&value, &dataset);
        let mut warnings: Vec<String> = inference.warning.into_iter().collect();
        if inference.fields.is_empty() {
            warnings.push(NO_FIELDS.to_string());
        }

        Ok(Settled {
            state: EndpointState::Emitted(self.record(spec, endpoint, inference.fields, provenance)),
            warnings,
            sample: if seeds_cache { inference.sample } else { None },
        })
    }

    fn apply(endpoint: &EndpointDescriptor, settled: Settled, outcome: &mut CrawlOutcome) {
        for warning in &settled.warnings {
            outcome.report.report_warning(&endpoint.path, warning);
        }

        if let Some(sample) = settled.sample {
            debug!("Caching sample of {}", endpoint.dataset_name());
            outcome.samples.insert(endpoint.dataset_name(), sample);
        }

        match &settled.state {
            EndpointState::Emitted(record) => info!(
                "Emitted {} with {} fields ({:?})",
                record.qualified_name,
                record.fields.len(),
                record.provenance
            ),
            other => debug!("Skipped {}: {:?}", endpoint.path, other),
        }

        outcome.endpoints.push(EndpointOutcome {
            path: endpoint.path.clone(),
            state: settled.state,
        });
    }

    fn record(
        &self,
        spec: &Specification,
        endpoint: &EndpointDescriptor,
        fields: Vec<Field>,
        provenance: Provenance,
    ) -> DatasetRecord {
        let documentation_url = self.url_for(spec, &endpoint.path);
        DatasetRecord::new(&self.config.name, endpoint, documentation_url, fields, provenance)
    }

    fn url_for(&self, spec: &Specification, path: &str) -> String {
        clean_url(&format!("{}{}{}", self.config.url, spec.base_path, path))
    }
}

/// Validate `config`, authenticate, load the spec and crawl it
pub async fn run(config: CrawlConfig, cancel: CancellationToken) -> Result<CrawlOutcome> {
    config.validate()?;

    let fetcher = ReqwestFetcher::new(config.timeout())?;
    let credentials = config.credentials(fetcher.client()).await?;

    let source = config.spec_source();
    let spec = SpecLoader::with_client(fetcher.client().clone())
        .load(&source, &credentials)
        .await?;
    info!("Loaded {} ({} paths) from {}", spec.title, spec.paths.len(), source);

    Crawler::new(config, fetcher, credentials)
        .with_cancellation(cancel)
        .crawl(&spec)
        .await
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
