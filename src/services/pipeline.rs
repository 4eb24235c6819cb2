// src/services/pipeline.rs
use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Seoul;
use log::info;
use std::fmt;

use crate::models::{Candidate, FetchedProduct};
use crate::services::fetcher::Fetcher;
use crate::services::guard::{check_batch, GuardVeto};
use crate::services::reconcile::{reconcile, ReconcileReport};
use crate::services::store::CatalogStore;
use crate::services::term::to_candidate;
use crate::BoxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Fetched,
    Selected,
    Reconciled,
    Committed,
    Rejected,
}

#[derive(Debug)]
pub enum RunOutcome {
    Committed {
        report: ReconcileReport,
        catalog_size: usize,
    },
    /// Terminal for this run; the prior catalog file was not touched.
    Rejected(GuardVeto),
}

impl RunOutcome {
    pub fn stage(&self) -> RunStage {
        match self {
            RunOutcome::Committed { .. } => RunStage::Committed,
            RunOutcome::Rejected(_) => RunStage::Rejected,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, RunOutcome::Committed { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RunOutcome::Committed { report, catalog_size } => write!(
                f,
                "committed {} products ({} new, {} changed, {} unchanged, {} carried forward, {} dropped)",
                catalog_size,
                report.created,
                report.changed,
                report.unchanged,
                report.carried_forward,
                report.dropped
            ),
            RunOutcome::Rejected(veto) => write!(f, "rejected: {}", veto),
        }
    }
}

/// Rate dates follow the provider's market calendar.
pub fn seoul_today() -> NaiveDate {
    Utc::now().with_timezone(&Seoul).date_naive()
}

pub fn select_batch(fetched: Vec<FetchedProduct>) -> Vec<Candidate> {
    fetched.into_iter().filter_map(to_candidate).collect()
}

/// Runs one fetched batch through selection, reconciliation and the integrity
/// guard, and commits the result to `store` unless the guard vetoes it.
pub fn run_batch(
    store: &CatalogStore,
    fetched: Vec<FetchedProduct>,
    today: NaiveDate,
    min_batch_size: usize,
) -> Result<RunOutcome, BoxError> {
    info!("{:?}: {} products", RunStage::Fetched, fetched.len());

    let batch = select_batch(fetched);
    let batch_size = batch.len();
    info!("{:?}: {} candidates", RunStage::Selected, batch_size);

    let prior = store.load()?;
    let reconciled = reconcile(prior, batch, today);
    info!("{:?}: {:?}", RunStage::Reconciled, reconciled.report);

    if let Err(veto) = check_batch(batch_size, min_batch_size) {
        let outcome = RunOutcome::Rejected(veto);
        info!("{:?}: {}", outcome.stage(), outcome);
        return Ok(outcome);
    }

    store.save(&reconciled.catalog)?;
    let outcome = RunOutcome::Committed {
        report: reconciled.report,
        catalog_size: reconciled.catalog.len(),
    };
    info!("{:?}: {}", outcome.stage(), outcome);
    Ok(outcome)
}

/// Fetches every managed category and runs the batch against the catalog.
pub async fn refresh(fetcher: &Fetcher, store: &CatalogStore, min_batch_size: usize) -> Result<RunOutcome, BoxError> {
    let fetched = fetcher.fetch_all().await;
    run_batch(store, fetched, seoul_today(), min_batch_size)
}
