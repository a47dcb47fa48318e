use std::sync::Arc;

use anyhow::Result;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::crm::ItemStore;
use crate::mapping::mappings;
use crate::model::work_item::{EmployeeId, WorkItemKind};

/// Picks the least-loaded eligible employee for a category.
///
/// Loads are read fresh on every call, so two concurrent requests in the same
/// category can both pick the same employee.
pub struct AssignmentPolicy {
    store: Arc<dyn ItemStore>,
    max_concurrent_lookups: usize,
}

impl AssignmentPolicy {
    pub fn new(store: Arc<dyn ItemStore>, max_concurrent_lookups: usize) -> Self {
        Self {
            store,
            max_concurrent_lookups: max_concurrent_lookups.max(1),
        }
    }

    pub async fn assign(&self, kind: WorkItemKind, category: &str) -> Result<Option<EmployeeId>> {
        let eligible = mappings(kind).responsible.eligible_for(category);
        if eligible.is_empty() {
            return Ok(None);
        }

        let store = &self.store;
        let loads: Vec<(EmployeeId, u64)> = stream::iter(eligible.iter().copied())
            .map(|employee| async move {
                let count = store.count_assigned(kind, employee).await?;
                debug!(%kind, employee, count, "employee load");
                Ok::<_, anyhow::Error>((employee, count))
            })
            .buffered(self.max_concurrent_lookups)
            .try_collect()
            .await?;

        let chosen = least_loaded(&loads);
        info!(%kind, category, assignee = ?chosen, "assignment decided");
        Ok(chosen)
    }
}

/// First employee with the strictly smallest load, in list order.
pub fn least_loaded(loads: &[(EmployeeId, u64)]) -> Option<EmployeeId> {
    let mut best: Option<(EmployeeId, u64)> = None;
    for &(employee, count) in loads {
        match best {
            Some((_, least)) if count >= least => {}
            _ => best = Some((employee, count)),
        }
    }
    best.map(|(employee, _)| employee)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_smallest_load() {
        assert_eq!(least_loaded(&[(1, 4), (55, 2), (201, 3)]), Some(55));
    }

    #[test]
    fn ties_go_to_first_in_list() {
        assert_eq!(least_loaded(&[(1, 2), (55, 2)]), Some(1));
        assert_eq!(least_loaded(&[(201, 0), (1, 0), (55, 0)]), Some(201));
    }

    #[test]
    fn empty_list_assigns_nobody() {
        assert_eq!(least_loaded(&[]), None);
    }

    #[test]
    fn stable_across_repeated_calls() {
        let loads = [(1, 7), (201, 3), (205, 3), (229, 9)];
        let first = least_loaded(&loads);
        for _ in 0..10 {
            assert_eq!(least_loaded(&loads), first);
        }
        assert_eq!(first, Some(201));
    }
}
