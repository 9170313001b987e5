use crate::notifications::NotificationCenter;
use crate::store::MarketStore;
use crate::types::{
    Amount, NotificationKind, Task, TaskCategory, TaskResponse, TaskStatus, TaskView,
};
use chrono::Utc;
use gigboard_types::{MarketError, ResponseId, Result, TaskId, UserId};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Applied when a freelancer responds without a message of their own.
pub const DEFAULT_RESPONSE_MESSAGE: &str = "I'm ready to take on this task";

/// Cap on the popular-tasks listing.
pub const POPULAR_TASKS_LIMIT: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub category: Option<TaskCategory>,
    pub search: Option<String>,
}

/// Parameters for posting a task. Fields arrive straight from the JSON
/// body; presence and content are validated in `create_task` so that the
/// registry owns the whole validation story.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Amount>,
    pub category: Option<TaskCategory>,
    pub safe_deal: Option<bool>,
}

/// Holds task postings and their freelancer responses.
pub struct TaskRegistry {
    store: Arc<dyn MarketStore>,
    notifications: Arc<NotificationCenter>,
}

impl TaskRegistry {
    pub fn new(store: Arc<dyn MarketStore>, notifications: Arc<NotificationCenter>) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Active tasks, optionally narrowed by category and a case-insensitive
    /// substring match on title or description. Insertion order is kept; no
    /// sort is applied.
    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskView>> {
        let needle = filter
            .search
            .as_deref()
            .map(str::to_lowercase)
            .filter(|s| !s.is_empty());

        let mut views = Vec::new();
        for task in self.store.list_tasks().await? {
            if task.status != TaskStatus::Active {
                continue;
            }
            if let Some(category) = filter.category {
                if task.category != category {
                    continue;
                }
            }
            if let Some(needle) = &needle {
                if !task.title.to_lowercase().contains(needle)
                    && !task.description.to_lowercase().contains(needle)
                {
                    continue;
                }
            }
            views.push(self.enrich(task).await?);
        }
        Ok(views)
    }

    /// Bounded subset of the active tasks for the popular view.
    pub async fn popular_tasks(&self, limit: usize) -> Result<Vec<TaskView>> {
        let mut views = self.list_tasks(&TaskFilter::default()).await?;
        views.truncate(limit);
        Ok(views)
    }

    pub async fn create_task(&self, client_id: &UserId, params: NewTask) -> Result<TaskView> {
        let title = required_text(params.title, "title")?;
        let description = required_text(params.description, "description")?;
        let price = params
            .price
            .ok_or_else(|| MarketError::Validation("price is required".to_string()))?;
        if price.is_zero() {
            return Err(MarketError::Validation("price must be positive".to_string()));
        }
        let category = params
            .category
            .ok_or_else(|| MarketError::Validation("category is required".to_string()))?;

        let client = self
            .store
            .get_user(client_id)
            .await?
            .ok_or_else(|| MarketError::NotFound("user".to_string()))?;

        let task = Task {
            id: TaskId::generate(),
            title,
            description,
            price,
            category,
            client_id: client_id.clone(),
            status: TaskStatus::Active,
            safe_deal: params.safe_deal.unwrap_or(true),
            responses: Vec::new(),
            created_at: Utc::now(),
            views: 0,
        };
        self.store.put_task(task.clone()).await?;

        info!(
            task_id = %task.id,
            client_id = %client_id,
            price = %task.price,
            category = ?task.category,
            safe_deal = task.safe_deal,
            "📋 Task created"
        );

        Ok(TaskView {
            task,
            client,
            responses_count: 0,
        })
    }

    /// Appends a freelancer response and notifies the task's client.
    pub async fn respond_to_task(
        &self,
        task_id: &TaskId,
        freelancer_id: &UserId,
        message: Option<String>,
        proposed_price: Option<Amount>,
    ) -> Result<TaskResponse> {
        let mut task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| MarketError::NotFound("task".to_string()))?;
        let freelancer = self
            .store
            .get_user(freelancer_id)
            .await?
            .ok_or_else(|| MarketError::NotFound("user".to_string()))?;

        let response = TaskResponse {
            id: ResponseId::generate(),
            freelancer_id: freelancer_id.clone(),
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_RESPONSE_MESSAGE.to_string()),
            proposed_price: proposed_price.unwrap_or(task.price),
            created_at: Utc::now(),
        };

        task.responses.push(response.clone());
        let client_id = task.client_id.clone();
        let task_title = task.title.clone();
        self.store.put_task(task).await?;

        self.notifications
            .notify(
                client_id,
                NotificationKind::NewResponse,
                "New response",
                format!(
                    "{} responded to your task \"{}\"",
                    freelancer.first_name, task_title
                ),
                serde_json::json!({ "taskId": task_id, "freelancerId": freelancer_id }),
            )
            .await?;

        info!(
            task_id = %task_id,
            freelancer_id = %freelancer_id,
            proposed_price = %response.proposed_price,
            "📨 Response submitted"
        );
        Ok(response)
    }

    async fn enrich(&self, task: Task) -> Result<TaskView> {
        let client = self
            .store
            .get_user(&task.client_id)
            .await?
            .ok_or_else(|| MarketError::NotFound("user".to_string()))?;
        let responses_count = task.responses.len();
        Ok(TaskView {
            task,
            client,
            responses_count,
        })
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(MarketError::Validation(format!("{field} is required"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::User;

    struct Fixture {
        store: Arc<MemoryStore>,
        registry: TaskRegistry,
        notifications: Arc<NotificationCenter>,
    }

    async fn fixture() -> Fixture {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let notifications = Arc::new(NotificationCenter::new(store.clone()));
        let registry = TaskRegistry::new(store.clone(), notifications.clone());
        for id in ["client", "freelancer"] {
            store
                .put_user(User::new(UserId::new(id), id.to_string(), "Test".into(), None))
                .await
                .unwrap();
        }
        Fixture {
            store,
            registry,
            notifications,
        }
    }

    fn new_task(title: &str, category: TaskCategory) -> NewTask {
        NewTask {
            title: Some(title.to_string()),
            description: Some("Need a logo for a coffee shop".to_string()),
            price: Some(Amount::from_whole(5000)),
            category: Some(category),
            safe_deal: None,
        }
    }

    #[tokio::test]
    async fn created_task_is_active_with_no_responses() {
        let f = fixture().await;
        let view = f
            .registry
            .create_task(&UserId::new("client"), new_task("Logo", TaskCategory::Design))
            .await
            .unwrap();
        assert_eq!(view.task.status, TaskStatus::Active);
        assert_eq!(view.responses_count, 0);
        assert_eq!(view.task.price, Amount::from_whole(5000));
        assert!(view.task.safe_deal);
    }

    #[tokio::test]
    async fn create_task_rejects_missing_fields_without_appending() {
        let f = fixture().await;
        let client = UserId::new("client");

        for params in [
            NewTask {
                title: None,
                ..new_task("x", TaskCategory::Design)
            },
            NewTask {
                description: Some("   ".to_string()),
                ..new_task("x", TaskCategory::Design)
            },
            NewTask {
                price: None,
                ..new_task("x", TaskCategory::Design)
            },
            NewTask {
                price: Some(Amount::ZERO),
                ..new_task("x", TaskCategory::Design)
            },
            NewTask {
                category: None,
                ..new_task("x", TaskCategory::Design)
            },
        ] {
            let err = f.registry.create_task(&client, params).await.unwrap_err();
            assert!(matches!(err, MarketError::Validation(_)), "{err}");
        }

        assert!(f.store.list_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_tasks_filters_by_category_and_search() {
        let f = fixture().await;
        let client = UserId::new("client");
        f.registry
            .create_task(&client, new_task("Logo design", TaskCategory::Design))
            .await
            .unwrap();
        f.registry
            .create_task(&client, new_task("Landing page", TaskCategory::Development))
            .await
            .unwrap();

        let by_category = f
            .registry
            .list_tasks(&TaskFilter {
                category: Some(TaskCategory::Design),
                search: None,
            })
            .await
            .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].task.title, "Logo design");

        let by_search = f
            .registry
            .list_tasks(&TaskFilter {
                category: None,
                search: Some("LANDING".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(by_search.len(), 1);
        assert_eq!(by_search[0].task.title, "Landing page");
    }

    #[tokio::test]
    async fn created_task_appears_in_its_category_exactly_once() {
        let f = fixture().await;
        let view = f
            .registry
            .create_task(&UserId::new("client"), new_task("Logo", TaskCategory::Design))
            .await
            .unwrap();

        let listed = f
            .registry
            .list_tasks(&TaskFilter {
                category: Some(TaskCategory::Design),
                search: None,
            })
            .await
            .unwrap();
        let hits = listed.iter().filter(|t| t.task.id == view.task.id).count();
        assert_eq!(hits, 1);
    }

    #[tokio::test]
    async fn respond_unknown_task_is_not_found() {
        let f = fixture().await;
        let err = f
            .registry
            .respond_to_task(&TaskId::generate(), &UserId::new("freelancer"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
    }

    #[tokio::test]
    async fn respond_appends_response_and_notifies_client() {
        let f = fixture().await;
        let client = UserId::new("client");
        let view = f
            .registry
            .create_task(&client, new_task("Logo", TaskCategory::Design))
            .await
            .unwrap();

        let response = f
            .registry
            .respond_to_task(&view.task.id, &UserId::new("freelancer"), None, None)
            .await
            .unwrap();

        // defaults: canned message, task price
        assert_eq!(response.message, DEFAULT_RESPONSE_MESSAGE);
        assert_eq!(response.proposed_price, view.task.price);

        let stored = f.store.get_task(&view.task.id).await.unwrap().unwrap();
        assert_eq!(stored.responses.len(), 1);

        let queued = f.notifications.list_for(&client).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].kind, NotificationKind::NewResponse);
    }

    #[tokio::test]
    async fn popular_view_is_capped() {
        let f = fixture().await;
        let client = UserId::new("client");
        for i in 0..12 {
            f.registry
                .create_task(&client, new_task(&format!("Task {i}"), TaskCategory::Text))
                .await
                .unwrap();
        }
        let popular = f.registry.popular_tasks(POPULAR_TASKS_LIMIT).await.unwrap();
        assert_eq!(popular.len(), POPULAR_TASKS_LIMIT);
        assert_eq!(popular[0].task.title, "Task 0");
    }
}
