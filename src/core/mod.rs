//! Core evaluation pipeline: probes, classification, batching, aggregation.

pub mod aggregate;
pub mod batch;
pub mod classify;
pub mod evaluator;
pub mod http;
pub mod logging;
pub mod models;
pub mod probes;

pub use aggregate::{AggregateReport, BucketKind, LimitTier, aggregate};
pub use batch::{DEFAULT_CONCURRENCY, check_keys};
pub use classify::{classify_auth_failure, classify_failure};
pub use evaluator::Evaluator;
pub use http::RetryPolicy;
pub use models::{
    BillingInfo, CapabilityFlags, CapabilityTier, KeyOutcome, KeyStatus, PlanKind,
};
pub use probes::VendorClient;
