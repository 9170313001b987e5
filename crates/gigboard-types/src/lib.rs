pub mod error;
pub mod id;

pub use error::{MarketError, Result};
pub use id::{ChatMessageId, DealId, NotificationId, ResponseId, TaskId, UserId};
