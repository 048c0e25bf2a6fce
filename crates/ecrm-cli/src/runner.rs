//! One collection and expiration pass over every governed repository.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ecrm_core::{ClusterApi, Config, Confirm, FunctionApi, RegistryApi, RepositorySummary};
use ecrm_registry::{
    DeleteMode, DeletionExecutor, DeletionOutcome, ExpirationEngine, RepositorySelector,
};
use ecrm_usage::UsageCollector;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::report::ReportSink;

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Only process this repository.
    pub repository: Option<String>,
    /// Report only, or delete.
    pub mode: DeleteMode,
}

/// What a run found and did.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Summaries sorted by repository name.
    pub summaries: Vec<RepositorySummary>,
    /// Executor outcomes in the same order.
    pub outcomes: Vec<DeletionOutcome>,
}

impl RunReport {
    /// Total expired images across repositories.
    pub fn expired_images(&self) -> u64 {
        self.summaries.iter().map(|s| s.expired_images).sum()
    }

    /// Images the registry reported as deleted.
    pub fn deleted_images(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                DeletionOutcome::Deleted { deleted, .. } => *deleted,
                _ => 0,
            })
            .sum()
    }
}

/// Wires the collector, selector, engine and executor together.
pub struct Runner {
    registry: Arc<dyn RegistryApi>,
    clusters: Arc<dyn ClusterApi>,
    functions: Arc<dyn FunctionApi>,
    confirm: Arc<dyn Confirm>,
    now: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Creates a runner over the given platforms.
    pub fn new(
        registry: Arc<dyn RegistryApi>,
        clusters: Arc<dyn ClusterApi>,
        functions: Arc<dyn FunctionApi>,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        Self {
            registry,
            clusters,
            functions,
            confirm,
            now: None,
        }
    }

    /// Evaluates ages against `now` instead of the wall clock.
    #[cfg(test)]
    pub const fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Runs one pass.
    ///
    /// Usage is collected before any repository is listed, so a failed
    /// scan never reaches deletion. Repositories are executed in name
    /// order and the run stops at the first error.
    pub async fn run(
        &self,
        config: &Config,
        options: &RunOptions,
        sink: &mut dyn ReportSink,
    ) -> Result<RunReport> {
        let run_id = Uuid::now_v7();
        let span = info_span!("run", run_id = %run_id, mode = ?options.mode);
        self.run_inner(config, options, sink).instrument(span).await
    }

    async fn run_inner(
        &self,
        config: &Config,
        options: &RunOptions,
        sink: &mut dyn ReportSink,
    ) -> Result<RunReport> {
        let held = UsageCollector::new(self.clusters.clone(), self.functions.clone())
            .collect(config)
            .await
            .context("Failed to collect images in use")?;
        info!(held = held.len(), "Collected images in use");

        let selected = RepositorySelector::new(self.registry.clone())
            .select(&config.repositories, options.repository.as_deref())
            .await?;

        let mut engine = ExpirationEngine::new(self.registry.clone());
        if let Some(now) = self.now {
            engine = engine.with_now(now);
        }

        let mut plans = Vec::with_capacity(selected.len());
        for repository in &selected {
            plans.push(
                engine
                    .evaluate(&repository.name, repository.policy, &held)
                    .await?,
            );
        }
        plans.sort_by(|a, b| a.repository().cmp(b.repository()));

        let summaries: Vec<RepositorySummary> = plans.iter().map(|p| p.summary.clone()).collect();
        sink.summaries(&summaries)?;

        let executor = DeletionExecutor::new(self.registry.clone(), self.confirm.clone(), options.mode);
        let mut outcomes = Vec::with_capacity(plans.len());
        for plan in &plans {
            outcomes.push(executor.execute(plan).await?);
        }

        Ok(RunReport {
            summaries,
            outcomes,
        })
    }
}
