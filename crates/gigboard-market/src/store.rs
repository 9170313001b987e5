use crate::types::{Deal, Notification, Task, User};
use async_trait::async_trait;
use gigboard_types::{DealId, Result, TaskId, UserId};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Repository owning the process-resident collections.
///
/// Passed by `Arc` handle to the registry and the ledger; there is no
/// ambient global state. `put_*` both inserts and replaces whole records;
/// listing preserves insertion order.
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;
    async fn put_user(&self, user: User) -> Result<()>;

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>>;
    async fn put_task(&self, task: Task) -> Result<()>;
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    async fn get_deal(&self, id: &DealId) -> Result<Option<Deal>>;
    async fn put_deal(&self, deal: Deal) -> Result<()>;
    async fn list_deals(&self) -> Result<Vec<Deal>>;

    async fn push_notification(&self, notification: Notification) -> Result<()>;
    async fn list_notifications(&self, user_id: &UserId) -> Result<Vec<Notification>>;
}

/// Id-keyed table that remembers insertion order for listings.
struct Table<K, V> {
    by_id: HashMap<K, V>,
    order: Vec<K>,
}

impl<K: std::hash::Hash + Eq + Clone, V: Clone> Table<K, V> {
    fn new() -> Self {
        Self {
            by_id: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn put(&mut self, id: K, value: V) {
        if !self.by_id.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.by_id.insert(id, value);
    }

    fn get(&self, id: &K) -> Option<V> {
        self.by_id.get(id).cloned()
    }

    fn list(&self) -> Vec<V> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .cloned()
            .collect()
    }
}

/// Volatile store; lifecycle is process start to process stop.
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    tasks: RwLock<Table<TaskId, Task>>,
    deals: RwLock<Table<DealId, Deal>>,
    notifications: RwLock<Vec<Notification>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            tasks: RwLock::new(Table::new()),
            deals: RwLock::new(Table::new()),
            notifications: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn put_user(&self, user: User) -> Result<()> {
        let mut users = self.users.write().await;
        debug!(user_id = %user.id, balance = %user.balance, "💾 User stored");
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(id))
    }

    async fn put_task(&self, task: Task) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        debug!(task_id = %task.id, status = ?task.status, "💾 Task stored");
        tasks.put(task.id, task);
        Ok(())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.list())
    }

    async fn get_deal(&self, id: &DealId) -> Result<Option<Deal>> {
        let deals = self.deals.read().await;
        Ok(deals.get(id))
    }

    async fn put_deal(&self, deal: Deal) -> Result<()> {
        let mut deals = self.deals.write().await;
        debug!(deal_id = %deal.id, status = ?deal.status, "💾 Deal stored");
        deals.put(deal.id, deal);
        Ok(())
    }

    async fn list_deals(&self) -> Result<Vec<Deal>> {
        let deals = self.deals.read().await;
        Ok(deals.list())
    }

    async fn push_notification(&self, notification: Notification) -> Result<()> {
        let mut notifications = self.notifications.write().await;
        notifications.push(notification);
        Ok(())
    }

    async fn list_notifications(&self, user_id: &UserId) -> Result<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .filter(|n| n.user_id == *user_id)
            .cloned()
            .collect())
    }
}
