use std::sync::Arc;

use crate::config::Config;
use crate::ledger::SpoolLedger;
use crate::observability::Metrics;
use crate::store::FjallStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ledger: Arc<SpoolLedger<FjallStore>>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// The ledger records into the same counters the metrics endpoint reads
    pub fn new(config: Config, store: FjallStore) -> Self {
        let metrics = Arc::new(Metrics::new());
        Self {
            config: Arc::new(config),
            ledger: Arc::new(SpoolLedger::with_metrics(store, metrics.clone())),
            metrics,
        }
    }

    pub fn store(&self) -> &FjallStore {
        self.ledger.repository()
    }
}
