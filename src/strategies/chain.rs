//! Priority-ordered chain of interchangeable strategies.
//!
//! Used inside capabilities that have several techniques for one operation
//! (several fetch paths, several frame-capture routes) and want call sites
//! to stay environment-agnostic: register what might work, let the chain
//! pick what does.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

/// Failure of a whole chain run.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The chain is empty or every strategy reported unavailable.
    #[error("no strategy available")]
    NoneAvailable,

    /// Every available strategy failed; carries the last failure and the
    /// name of the strategy that produced it.
    #[error("all strategies failed; last attempt '{strategy}': {source}")]
    Exhausted {
        strategy: String,
        #[source]
        source: anyhow::Error,
    },
}

/// One interchangeable technique.
///
/// `priority` is static per strategy; `is_available` gates environment
/// checks (binary present, privileged host attached) so unavailable
/// techniques are skipped without being tried.
#[async_trait]
pub trait Strategy<I: Sync, O>: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> i32;

    fn is_available(&self) -> bool {
        true
    }

    /// Attempt the operation. Heterogeneous failure reasons are fine; the
    /// chain only cares whether it succeeded.
    async fn attempt(&self, input: &I) -> anyhow::Result<O>;
}

/// Strategies sorted descending by priority, tried in order.
///
/// New strategies can be registered at runtime (a privileged technique
/// appearing after bootstrap); the chain re-sorts on insertion.
pub struct StrategyChain<I, O> {
    strategies: RwLock<Vec<Arc<dyn Strategy<I, O>>>>,
}

impl<I, O> Default for StrategyChain<I, O> {
    fn default() -> Self {
        Self {
            strategies: RwLock::new(Vec::new()),
        }
    }
}

impl<I: Sync, O: Send> StrategyChain<I, O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a strategy and re-sort the chain, highest priority first. The
    /// sort is stable, so equal priorities keep their insertion order.
    pub fn register(&self, strategy: Arc<dyn Strategy<I, O>>) {
        let mut strategies = self.strategies.write();
        strategies.push(strategy);
        strategies.sort_by_key(|s| std::cmp::Reverse(s.priority()));
    }

    pub fn len(&self) -> usize {
        self.strategies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.read().is_empty()
    }

    /// Registered strategy names in try order, for diagnostics.
    pub fn names(&self) -> Vec<String> {
        self.strategies
            .read()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Try strategies in priority order. The first success wins and later
    /// strategies are never attempted.
    pub async fn execute(&self, input: &I) -> Result<O, StrategyError> {
        let strategies: Vec<Arc<dyn Strategy<I, O>>> = self.strategies.read().clone();

        let mut last_failure: Option<(String, anyhow::Error)> = None;
        for strategy in strategies {
            if !strategy.is_available() {
                log::debug!("[strategy] '{}' unavailable, skipping", strategy.name());
                continue;
            }
            match strategy.attempt(input).await {
                Ok(output) => return Ok(output),
                Err(err) => {
                    log::debug!("[strategy] '{}' failed: {err:#}", strategy.name());
                    last_failure = Some((strategy.name().to_string(), err));
                }
            }
        }

        match last_failure {
            Some((strategy, source)) => Err(StrategyError::Exhausted { strategy, source }),
            None => Err(StrategyError::NoneAvailable),
        }
    }
}
