//! # Pipeline Module
//!
//! Esecutore concorrente: distribuisce i `WorkItem` su un pool limitato di
//! worker e raccoglie esattamente un `FileOutcome` per item.
//!
//! ## Gestione concorrenza:
//! - Al massimo `concurrency` trasformazioni in volo; le altre partono solo
//!   quando una di quelle in corso termina
//! - Ogni trasformazione gira su un thread bloccante (`spawn_blocking`): la
//!   codifica è CPU-bound e non ha punti di sospensione
//! - Gli esiti arrivano in ordine di completamento e vengono applicati uno
//!   alla volta al `RunSummary`, posseduto solo da questo punto di aggregazione
//! - Un item che fallisce (anche con panic) non tocca gli altri
//! - Nessun retry
//! - `on_start` viene sempre chiamato, anche con zero item

use crate::outcome::{FileOutcome, WorkItem};
use crate::progress::{Reporter, RunSummary};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, error};

/// Bounded concurrent executor
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    concurrency: usize,
}

impl Pipeline {
    /// Pipeline running at most `concurrency` transforms at a time (at least one)
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `transform` over every item and fold the outcomes
    pub async fn run<F>(
        &self,
        items: Vec<WorkItem>,
        transform: F,
        dry_run: bool,
        reporter: &dyn Reporter,
    ) -> RunSummary
    where
        F: Fn(&WorkItem) -> FileOutcome + Send + Sync + 'static,
    {
        let mut summary = RunSummary::new();
        let total = items.len();
        reporter.on_start(total, dry_run);
        if total == 0 {
            return summary;
        }

        debug!("Running {} items on {} workers", total, self.concurrency);

        let transform = Arc::new(transform);
        let mut outcomes = stream::iter(items)
            .map(|item| {
                let transform = Arc::clone(&transform);
                async move {
                    let source = item.source().to_path_buf();
                    match tokio::task::spawn_blocking(move || transform(&item)).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            error!("Worker for {} aborted: {}", source.display(), e);
                            FileOutcome::failed(&source, format!("worker aborted: {}", e))
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency);

        let mut completed = 0;
        while let Some(outcome) = outcomes.next().await {
            completed += 1;
            summary.record(&outcome);
            reporter.on_outcome(completed, total, &outcome);
        }

        summary
    }
}
