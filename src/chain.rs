//! Ordered adapter chains.
//!
//! A platform lists its data sources from most to least trusted. The runner
//! tries them one at a time; the first result passing the platform's
//! usability check wins and the remaining adapters are never called.
//! Errors and unusable payloads are soft failures: they are logged and the
//! next adapter runs.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::descriptor::ContentDescriptor;
use crate::AnalyzeError;

/// One upstream data source.
#[async_trait]
pub trait Adapter<T>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, descriptor: &ContentDescriptor) -> Result<T, AnalyzeError>;
}

#[derive(Debug)]
pub enum FailureReason {
    Error(AnalyzeError),
    /// The call succeeded but the payload failed the usability check.
    Unusable,
}

#[derive(Debug)]
pub struct AdapterFailure {
    pub adapter: &'static str,
    pub reason: FailureReason,
}

impl AdapterFailure {
    /// Human-readable cause, suitable for a result `message`.
    pub fn describe(&self) -> String {
        match &self.reason {
            FailureReason::Error(e) => e.to_string(),
            FailureReason::Unusable => format!("{} returned no usable data", self.adapter),
        }
    }
}

/// Cause reported by the last adapter tried, if any ran.
pub fn last_failure(failures: &[AdapterFailure]) -> Option<String> {
    failures.last().map(AdapterFailure::describe)
}

#[derive(Debug)]
pub enum ChainOutcome<T> {
    Found { value: T, source: &'static str },
    Exhausted { failures: Vec<AdapterFailure> },
}

impl<T> ChainOutcome<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            ChainOutcome::Found { value, .. } => Some(value),
            ChainOutcome::Exhausted { .. } => None,
        }
    }
}

pub struct AdapterChain<T> {
    platform: &'static str,
    adapters: Vec<Box<dyn Adapter<T>>>,
    usable: fn(&T) -> bool,
}

impl<T: Send + 'static> AdapterChain<T> {
    pub fn new(platform: &'static str, usable: fn(&T) -> bool) -> Self {
        Self {
            platform,
            adapters: Vec::new(),
            usable,
        }
    }

    pub fn with(mut self, adapter: impl Adapter<T> + 'static) -> Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub async fn run(&self, descriptor: &ContentDescriptor) -> ChainOutcome<T> {
        let mut failures = Vec::new();

        if !descriptor.is_known() {
            warn!(platform = self.platform, "Unidentified content, skipping adapters");
            return ChainOutcome::Exhausted { failures };
        }

        for adapter in &self.adapters {
            debug!(platform = self.platform, adapter = adapter.name(), "Trying adapter");
            match adapter.fetch(descriptor).await {
                Ok(value) if (self.usable)(&value) => {
                    info!(platform = self.platform, adapter = adapter.name(), "Adapter succeeded");
                    return ChainOutcome::Found {
                        value,
                        source: adapter.name(),
                    };
                }
                Ok(_) => {
                    warn!(
                        platform = self.platform,
                        adapter = adapter.name(),
                        "Adapter returned an unusable payload"
                    );
                    failures.push(AdapterFailure {
                        adapter: adapter.name(),
                        reason: FailureReason::Unusable,
                    });
                }
                Err(e) => {
                    warn!(platform = self.platform, adapter = adapter.name(), "Adapter failed");
                    e.log();
                    failures.push(AdapterFailure {
                        adapter: adapter.name(),
                        reason: FailureReason::Error(e),
                    });
                }
            }
        }

        warn!(
            platform = self.platform,
            attempts = failures.len(),
            "Adapter chain exhausted"
        );
        ChainOutcome::Exhausted { failures }
    }
}
