//! Active task discovery

use super::types::DiscoveredTask;
use crate::error::TeardownError;
use crate::site::TaskService;
use hosting_teardown_common::ResourceUnit;
use tracing::{debug, warn};

/// Ask the task service about each unit in order; the first unit whose
/// query surfaces an active task wins.
///
/// The surfaced task is taken as reported. When it is bound to a different
/// unit than the one queried a warning is logged and it is still returned.
pub async fn scan<T: TaskService>(
    tasks: &T,
    units: &[ResourceUnit],
) -> Result<Option<DiscoveredTask>, TeardownError> {
    for unit in units {
        let found = tasks
            .find_active_task(unit.task_link())
            .await
            .map_err(|e| TeardownError::unavailable("FindActiveTask", e))?;

        let Some(task) = found else {
            debug!(unit_id = %unit.id, "No active task");
            continue;
        };

        if !task.active {
            debug!(unit_id = %unit.id, task_id = %task.id, "Ignoring inactive task");
            continue;
        }

        if task.resource_unit_id != unit.task_link() {
            warn!(
                task_id = %task.id,
                queried_unit = %unit.id,
                task_unit = %task.resource_unit_id,
                "Active task is bound to a different resource unit than the one queried"
            );
        }

        return Ok(Some(DiscoveredTask {
            task,
            unit_id: unit.id.clone(),
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::InMemorySite;
    use hosting_teardown_common::ProvisioningTask;

    fn units() -> Vec<ResourceUnit> {
        vec![ResourceUnit::new("RU1", "HV1"), ResourceUnit::new("RU2", "HV1")]
    }

    #[tokio::test]
    async fn test_first_unit_with_task_wins() {
        let site = InMemorySite::new();
        site.add_task(ProvisioningTask::active("T2", "RU2"));

        let found = scan(&site, &units()).await.unwrap().unwrap();
        assert_eq!(found.task.id, "T2");
        assert_eq!(found.unit_id, "RU2");
    }

    #[tokio::test]
    async fn test_no_task() {
        let site = InMemorySite::new();
        assert!(scan(&site, &units()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_foreign_task_is_kept_with_queried_unit() {
        let site = InMemorySite::new();
        site.add_task(ProvisioningTask::active("T9", "RU9"))
            .surface_any_active_task(true);

        let found = scan(&site, &units()).await.unwrap().unwrap();
        assert_eq!(found.task.id, "T9");
        assert_eq!(found.unit_id, "RU1");
    }

    #[tokio::test]
    async fn test_query_failure_is_unavailable() {
        let site = InMemorySite::new();
        site.set_unavailable(true);

        let err = scan(&site, &units()).await.unwrap_err();
        assert!(matches!(err, TeardownError::Unavailable { operation: "FindActiveTask", .. }));
    }

    #[tokio::test]
    async fn test_link_id_is_used_for_queries() {
        let site = InMemorySite::new();
        site.add_task(ProvisioningTask::active("T1", "link-1"));
        let mut unit = ResourceUnit::new("RU1", "HV1");
        unit.link_id = Some("link-1".to_string());

        let found = scan(&site, &[unit]).await.unwrap().unwrap();
        assert_eq!(found.unit_id, "RU1");
    }
}
