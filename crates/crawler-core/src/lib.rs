//! # crawler-core
//!
//! Crawl engine for openapi-crawler.
//!
//! Given a crawl configuration, loads the API's spec, resolves parameterized
//! GET endpoints from forced examples or samples of listing endpoints,
//! fetches a representative response per endpoint and infers its fields.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod params;
pub mod record;
pub mod report;

pub use cache::{Sample, SampleCache};
pub use config::{CrawlConfig, ForcedExample};
pub use error::{CrawlError, Result};
pub use fetcher::{FetchResponse, Fetcher, ReqwestFetcher, ResponseClass, TIMEOUT_STATUS};
pub use orchestrator::{run, CrawlOutcome, Crawler, EndpointOutcome, EndpointState, NO_FIELDS};
pub use params::{ParameterResolver, Resolution};
pub use record::{DatasetRecord, Provenance};
pub use report::{CrawlReport, CrawlWarning};

pub use openapi_parser;
