//! Batch image resolution use case.

use futures_util::future::join_all;
use tracing::{debug, info};

use crate::application::dto::{ImageOrigin, ResolveOutcome};
use crate::application::services::FetchCoordinator;
use crate::domain::entities::Locator;

/// Resolves a list of locators concurrently, optionally several rounds.
pub struct ResolveBatchUseCase {
    coordinator: FetchCoordinator,
}

impl ResolveBatchUseCase {
    /// Creates new use case.
    #[must_use]
    pub const fn new(coordinator: FetchCoordinator) -> Self {
        Self { coordinator }
    }

    /// Resolves every locator `rounds` times. Rounds run one after another;
    /// locators within a round run concurrently.
    pub async fn execute(&self, locators: &[String], rounds: usize) -> Vec<ResolveOutcome> {
        let mut outcomes = Vec::new();
        if locators.is_empty() {
            return outcomes;
        }

        for round in 1..=rounds.max(1) {
            debug!(round, count = locators.len(), "Resolving batch");
            let batch = locators.iter().map(|locator| self.resolve_one(locator, round));
            outcomes.extend(join_all(batch).await);
        }

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        info!(total = outcomes.len(), failed, "Batch resolved");
        outcomes
    }

    async fn resolve_one(&self, locator: &str, round: usize) -> ResolveOutcome {
        let origin = Locator::parse(locator).ok().map(|parsed| {
            if self.coordinator.cache().peek(parsed.key()).is_some() {
                ImageOrigin::MemoryCache
            } else {
                ImageOrigin::Fetched
            }
        });

        let result = self.coordinator.resolve_async(Some(locator), None).await;

        ResolveOutcome {
            locator: locator.to_string(),
            round,
            origin,
            result,
        }
    }
}
