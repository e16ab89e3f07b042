//! Cross-collection statistics over applications, jobs and students.
//!
//! Every aggregation follows the same shape: resolve the jobs in scope, resolve the
//! applications that point at them, resolve the students behind those applications, then
//! join and accumulate. References that cannot be resolved are data-quality gaps: they are
//! logged and the row is skipped, never surfaced as an error.

mod cycle;
mod groups;
mod scope;

pub use cycle::{BranchStatistics, CycleStatistics};
pub use groups::{group_key, Dimension, GroupStats};
pub use scope::{JobScope, JoinedApplication, ScopedDataset};

use std::collections::BTreeMap;
use std::sync::Arc;

use super::compensation::round2;
use super::domain::{PlacementCycle, Student};
use super::error::PlacementError;
use super::identifiers::DocumentId;
use super::records::{fetch, fetch_all};
use crate::store::{DocumentStore, Filter, StoreError};

/// `part / total * 100`, rounded to two decimals; zero when `total` is zero.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(part as f64 / total as f64 * 100.0)
    }
}

pub struct StatisticsAggregator<S> {
    store: Arc<S>,
}

impl<S> StatisticsAggregator<S>
where
    S: DocumentStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn resolve(&self, scope: &JobScope) -> Result<ScopedDataset, StoreError> {
        ScopedDataset::load(self.store.as_ref(), scope)
    }

    pub fn aggregate(
        &self,
        scope: &JobScope,
        dimension: Dimension,
    ) -> Result<BTreeMap<String, GroupStats>, StoreError> {
        let dataset = self.resolve(scope)?;
        Ok(group(&dataset, dimension))
    }

    pub fn cycle_statistics(&self, cycle_id: &str) -> Result<CycleStatistics, PlacementError> {
        let cycle_id = DocumentId::parse(cycle_id)?;
        if fetch::<PlacementCycle, _>(self.store.as_ref(), &cycle_id)?.is_none() {
            return Err(PlacementError::not_found("cycle", &cycle_id));
        }

        let dataset = self.resolve(&JobScope::cycle(cycle_id))?;
        Ok(CycleStatistics::from_dataset(&dataset))
    }
}

/// Enrolled students per branch across the whole population, not just applicants.
pub fn branch_population<S>(store: &S) -> Result<BTreeMap<String, usize>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let mut population = BTreeMap::new();
    for student in fetch_all::<Student, _>(store, &Filter::all())? {
        *population.entry(group_key(&student.branch)).or_insert(0) += 1;
    }
    Ok(population)
}

/// Groups the joined rows of a dataset along one dimension.
pub fn group(dataset: &ScopedDataset, dimension: Dimension) -> BTreeMap<String, GroupStats> {
    let mut groups: BTreeMap<String, GroupStats> = BTreeMap::new();
    for row in dataset.joined() {
        if let Some(key) = dimension.key_for(&row) {
            groups.entry(key).or_default().record(&row);
        }
    }
    groups
}
