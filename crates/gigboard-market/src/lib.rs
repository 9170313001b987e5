pub mod ledger;
pub mod notifications;
pub mod registry;
pub mod store;
pub mod types;

pub use ledger::{DealLedger, COMMISSION_BPS, DEAL_TERM_DAYS};
pub use notifications::NotificationCenter;
pub use registry::{NewTask, TaskFilter, TaskRegistry, POPULAR_TASKS_LIMIT};
pub use store::{MarketStore, MemoryStore};
pub use types::{
    Amount, ChatMessage, Deal, DealStatus, DealView, Notification, NotificationKind, Task,
    TaskCategory, TaskResponse, TaskStatus, TaskView, User, UserStats,
};

use std::sync::Arc;

/// The marketplace core: one store handle shared by the task registry, the
/// deal ledger and the notification center.
pub struct MarketEngine {
    pub store: Arc<dyn MarketStore>,
    pub notifications: Arc<NotificationCenter>,
    pub registry: Arc<TaskRegistry>,
    pub ledger: Arc<DealLedger>,
}

impl MarketEngine {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        let notifications = Arc::new(NotificationCenter::new(store.clone()));
        let registry = Arc::new(TaskRegistry::new(store.clone(), notifications.clone()));
        let ledger = Arc::new(DealLedger::new(store.clone(), notifications.clone()));
        Self {
            store,
            notifications,
            registry,
            ledger,
        }
    }

    /// Engine over a fresh volatile store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}
