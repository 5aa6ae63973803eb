//! Bounded concurrent execution of simulation batches.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::client::{PageContext, SimulationClient};
use crate::codec::Deck;
use crate::outcome::SimRecord;
use crate::scenario::Scenario;

pub const DEFAULT_CONCURRENCY: usize = 10;

/// Receives completion counts while a batch runs.
pub trait ProgressObserver: Send + Sync {
    fn batch_started(&self, _label: &str, _total: usize) {}
    fn completed(&self, done: usize, total: usize);
}

/// Default observer: progress goes to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn batch_started(&self, label: &str, total: usize) {
        log::info!("{label}: {total} simulations queued");
    }

    fn completed(&self, done: usize, total: usize) {
        log::debug!("simulations {done}/{total}");
    }
}

/// Cross product `attacks × defenses`, attack-major.
#[must_use]
pub fn cross_pairs(attacks: &[Deck], defenses: &[Deck]) -> Vec<(Deck, Deck)> {
    attacks
        .iter()
        .flat_map(|attack| {
            defenses
                .iter()
                .map(move |defense| (attack.clone(), defense.clone()))
        })
        .collect()
}

pub struct Runner<C> {
    client: Arc<SimulationClient<C>>,
    concurrency: usize,
    progress: Arc<dyn ProgressObserver>,
}

impl<C: PageContext + 'static> Runner<C> {
    pub fn new(client: SimulationClient<C>) -> Self {
        Self {
            client: Arc::new(client),
            concurrency: DEFAULT_CONCURRENCY,
            progress: Arc::new(LogProgress),
        }
    }

    /// Cap on in-flight simulations; 0 is treated as 1.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[must_use]
    pub fn client(&self) -> &SimulationClient<C> {
        &self.client
    }

    /// Simulate every attack against every defense.
    pub async fn run_all(
        &self,
        attacks: &[Deck],
        defenses: &[Deck],
        scenario: &Scenario,
        label: &str,
    ) -> Vec<SimRecord> {
        self.run_pairs(cross_pairs(attacks, defenses), scenario, label)
            .await
    }

    /// Simulate explicit `(attack, defense)` pairs.
    ///
    /// Returns one record per pair, in input order, whatever order the
    /// simulations finish in. Failed pairs come back with `raw: None`.
    pub async fn run_pairs(
        &self,
        pairs: Vec<(Deck, Deck)>,
        scenario: &Scenario,
        label: &str,
    ) -> Vec<SimRecord> {
        let total = pairs.len();
        self.progress.batch_started(label, total);

        let gate = Arc::new(Semaphore::new(self.concurrency));
        let scenario = Arc::new(scenario.clone());
        let done = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();

        for (index, (attack, defense)) in pairs.iter().cloned().enumerate() {
            let gate = Arc::clone(&gate);
            let client = Arc::clone(&self.client);
            let scenario = Arc::clone(&scenario);
            let done = Arc::clone(&done);
            let progress = Arc::clone(&self.progress);

            tasks.spawn(async move {
                let raw = match gate.acquire_owned().await {
                    Ok(_permit) => client.simulate(&attack, &defense, &scenario).await,
                    Err(_) => None,
                };
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                progress.completed(finished, total);
                (index, raw)
            });
        }

        let mut slots: Vec<Option<String>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, raw)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = raw;
                    }
                }
                Err(e) => log::error!("simulation task aborted: {e}"),
            }
        }

        pairs
            .into_iter()
            .zip(slots)
            .map(|((attack, defense), raw)| SimRecord {
                attack,
                defense,
                raw,
            })
            .collect()
    }
}
