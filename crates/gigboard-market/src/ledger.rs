use crate::notifications::NotificationCenter;
use crate::store::MarketStore;
use crate::types::{
    ChatMessage, Deal, DealStatus, DealView, NotificationKind, TaskStatus, UserStats,
};
use chrono::{Duration, Utc};
use gigboard_types::{ChatMessageId, DealId, MarketError, Result, TaskId, UserId};
use std::sync::Arc;
use tracing::info;

/// Platform commission withheld on completion, in basis points.
pub const COMMISSION_BPS: u32 = 1_000;

/// Working term granted to every deal at creation.
pub const DEAL_TERM_DAYS: i64 = 7;

/// Holds deals derived from accepted responses: chat transcript, status
/// transitions and completion settlement.
pub struct DealLedger {
    store: Arc<dyn MarketStore>,
    notifications: Arc<NotificationCenter>,
}

impl DealLedger {
    pub fn new(store: Arc<dyn MarketStore>, notifications: Arc<NotificationCenter>) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Promotes an accepted response into a deal.
    ///
    /// The task price is copied into the deal amount once and never
    /// recalculated. The task must still be active: accepting a second
    /// response for a task already in progress is rejected rather than
    /// silently creating a duplicate deal.
    pub async fn create_deal(
        &self,
        client_id: &UserId,
        task_id: &TaskId,
        freelancer_id: &UserId,
    ) -> Result<DealView> {
        let mut task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| MarketError::NotFound("task".to_string()))?;
        if task.client_id != *client_id {
            return Err(MarketError::Permission(
                "only the task owner can start a deal".to_string(),
            ));
        }
        let freelancer = self
            .store
            .get_user(freelancer_id)
            .await?
            .ok_or_else(|| MarketError::NotFound("user".to_string()))?;
        let client = self
            .store
            .get_user(client_id)
            .await?
            .ok_or_else(|| MarketError::NotFound("user".to_string()))?;
        if task.status != TaskStatus::Active {
            return Err(MarketError::InvalidTransition(format!(
                "task already has a deal (status {:?})",
                task.status
            )));
        }

        let now = Utc::now();
        let deal = Deal {
            id: DealId::generate(),
            task_id: *task_id,
            task_title: task.title.clone(),
            client_id: client_id.clone(),
            freelancer_id: freelancer_id.clone(),
            amount: task.price,
            status: DealStatus::InProgress,
            commission: COMMISSION_BPS as f64 / 10_000.0,
            progress: 0,
            messages: Vec::new(),
            deadline: now + Duration::days(DEAL_TERM_DAYS),
            created_at: now,
            completed_at: None,
        };

        task.status = TaskStatus::InProgress;
        self.store.put_task(task).await?;
        self.store.put_deal(deal.clone()).await?;

        self.notifications
            .notify(
                freelancer_id.clone(),
                NotificationKind::DealStarted,
                "New deal",
                format!("You started working on \"{}\"", deal.task_title),
                serde_json::json!({ "dealId": deal.id }),
            )
            .await?;

        info!(
            deal_id = %deal.id,
            task_id = %task_id,
            client_id = %client_id,
            freelancer_id = %freelancer_id,
            amount = %deal.amount,
            deadline = %deal.deadline,
            "🤝 Deal created"
        );

        Ok(DealView {
            deal,
            client,
            freelancer,
        })
    }

    /// Every deal where the user participates, enriched with both user
    /// records, optionally narrowed to one status.
    pub async fn list_deals(
        &self,
        user_id: &UserId,
        status: Option<DealStatus>,
    ) -> Result<Vec<DealView>> {
        let mut views = Vec::new();
        for deal in self.store.list_deals().await? {
            if deal.client_id != *user_id && deal.freelancer_id != *user_id {
                continue;
            }
            if let Some(status) = status {
                if deal.status != status {
                    continue;
                }
            }
            let client = self
                .store
                .get_user(&deal.client_id)
                .await?
                .ok_or_else(|| MarketError::NotFound("user".to_string()))?;
            let freelancer = self
                .store
                .get_user(&deal.freelancer_id)
                .await?
                .ok_or_else(|| MarketError::NotFound("user".to_string()))?;
            views.push(DealView {
                deal,
                client,
                freelancer,
            });
        }
        Ok(views)
    }

    /// Appends a chat message and notifies the other participant.
    pub async fn post_message(
        &self,
        deal_id: &DealId,
        sender_id: &UserId,
        text: &str,
    ) -> Result<ChatMessage> {
        let mut deal = self
            .store
            .get_deal(deal_id)
            .await?
            .ok_or_else(|| MarketError::NotFound("deal".to_string()))?;
        if deal.client_id != *sender_id && deal.freelancer_id != *sender_id {
            return Err(MarketError::Permission(
                "sender is not part of this deal".to_string(),
            ));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(MarketError::Validation(
                "message text is required".to_string(),
            ));
        }

        let message = ChatMessage {
            id: ChatMessageId::generate(),
            sender_id: sender_id.clone(),
            text: text.to_string(),
            created_at: Utc::now(),
            read: false,
        };
        deal.messages.push(message.clone());

        let recipient = if deal.client_id == *sender_id {
            deal.freelancer_id.clone()
        } else {
            deal.client_id.clone()
        };
        let task_title = deal.task_title.clone();
        self.store.put_deal(deal).await?;

        self.notifications
            .notify(
                recipient,
                NotificationKind::NewMessage,
                "New message",
                format!("New message in deal \"{task_title}\""),
                serde_json::json!({ "dealId": deal_id }),
            )
            .await?;

        Ok(message)
    }

    /// Settles a deal: marks it completed, credits the freelancer the
    /// amount net of commission, bumps their completed-task counter and
    /// closes the originating task.
    ///
    /// Only the client may complete, and only once; a repeated call is
    /// rejected so the freelancer is never credited twice.
    pub async fn complete_deal(&self, deal_id: &DealId, requester_id: &UserId) -> Result<DealView> {
        let mut deal = self
            .store
            .get_deal(deal_id)
            .await?
            .ok_or_else(|| MarketError::NotFound("deal".to_string()))?;
        if deal.client_id != *requester_id {
            return Err(MarketError::Permission(
                "only the client can complete a deal".to_string(),
            ));
        }
        if deal.status != DealStatus::InProgress {
            return Err(MarketError::InvalidTransition(format!(
                "cannot complete a deal in status {:?}",
                deal.status
            )));
        }

        deal.status = DealStatus::Completed;
        deal.completed_at = Some(Utc::now());

        let payout = deal.amount.net_of_commission(COMMISSION_BPS);
        let mut freelancer = self
            .store
            .get_user(&deal.freelancer_id)
            .await?
            .ok_or_else(|| MarketError::NotFound("user".to_string()))?;
        let balance_before = freelancer.balance;
        freelancer.balance = freelancer.balance.saturating_add(payout);
        freelancer.completed_tasks += 1;
        self.store.put_user(freelancer.clone()).await?;

        if let Some(mut task) = self.store.get_task(&deal.task_id).await? {
            task.status = TaskStatus::Completed;
            self.store.put_task(task).await?;
        }
        self.store.put_deal(deal.clone()).await?;

        info!(
            deal_id = %deal.id,
            freelancer_id = %deal.freelancer_id,
            amount = %deal.amount,
            payout = %payout,
            balance_before = %balance_before,
            balance_after = %freelancer.balance,
            "💰 Deal completed, freelancer credited"
        );

        let client = self
            .store
            .get_user(requester_id)
            .await?
            .ok_or_else(|| MarketError::NotFound("user".to_string()))?;
        Ok(DealView {
            deal,
            client,
            freelancer,
        })
    }

    /// Recomputed on every call; completed/active counts come from the
    /// user's deals, rating and balance from the user record.
    pub async fn user_stats(&self, user_id: &UserId) -> Result<UserStats> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| MarketError::NotFound("user".to_string()))?;

        let mut completed = 0;
        let mut active = 0;
        for deal in self.store.list_deals().await? {
            if deal.client_id != *user_id && deal.freelancer_id != *user_id {
                continue;
            }
            match deal.status {
                DealStatus::Completed => completed += 1,
                DealStatus::InProgress => active += 1,
                DealStatus::Disputed => {}
            }
        }

        Ok(UserStats {
            completed_tasks: completed,
            rating: user.rating,
            balance: user.balance,
            active_deals: active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{NewTask, TaskRegistry};
    use crate::store::MemoryStore;
    use crate::types::{Amount, TaskCategory, User};

    struct Fixture {
        store: Arc<MemoryStore>,
        registry: TaskRegistry,
        ledger: DealLedger,
        notifications: Arc<NotificationCenter>,
    }

    async fn fixture() -> Fixture {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let notifications = Arc::new(NotificationCenter::new(store.clone()));
        let registry = TaskRegistry::new(store.clone(), notifications.clone());
        let ledger = DealLedger::new(store.clone(), notifications.clone());
        for id in ["client", "freelancer", "stranger"] {
            store
                .put_user(User::new(UserId::new(id), id.to_string(), "Test".into(), None))
                .await
                .unwrap();
        }
        Fixture {
            store,
            registry,
            ledger,
            notifications,
        }
    }

    async fn posted_task(f: &Fixture, price: u64) -> TaskId {
        f.registry
            .create_task(
                &UserId::new("client"),
                NewTask {
                    title: Some("Logo".to_string()),
                    description: Some("Coffee shop logo".to_string()),
                    price: Some(Amount::from_whole(price)),
                    category: Some(TaskCategory::Design),
                    safe_deal: None,
                },
            )
            .await
            .unwrap()
            .task
            .id
    }

    #[tokio::test]
    async fn create_deal_copies_price_and_flips_task_status() {
        let f = fixture().await;
        let task_id = posted_task(&f, 5000).await;

        let view = f
            .ledger
            .create_deal(&UserId::new("client"), &task_id, &UserId::new("freelancer"))
            .await
            .unwrap();

        assert_eq!(view.deal.amount, Amount::from_whole(5000));
        assert_eq!(view.deal.status, DealStatus::InProgress);
        assert_eq!(view.deal.commission, 0.1);
        assert_eq!(view.deal.progress, 0);
        assert_eq!(
            view.deal.deadline,
            view.deal.created_at + Duration::days(DEAL_TERM_DAYS)
        );

        let task = f.store.get_task(&task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);

        let queued = f
            .notifications
            .list_for(&UserId::new("freelancer"))
            .await
            .unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].kind, NotificationKind::DealStarted);
    }

    #[tokio::test]
    async fn create_deal_by_non_owner_is_rejected() {
        let f = fixture().await;
        let task_id = posted_task(&f, 100).await;

        let err = f
            .ledger
            .create_deal(&UserId::new("stranger"), &task_id, &UserId::new("freelancer"))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Permission(_)));
    }

    #[tokio::test]
    async fn create_deal_unknown_task_or_freelancer_is_not_found() {
        let f = fixture().await;
        let task_id = posted_task(&f, 100).await;

        let err = f
            .ledger
            .create_deal(&UserId::new("client"), &TaskId::generate(), &UserId::new("freelancer"))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));

        let err = f
            .ledger
            .create_deal(&UserId::new("client"), &task_id, &UserId::new("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_deal_requires_active_task() {
        let f = fixture().await;
        let task_id = posted_task(&f, 100).await;
        let client = UserId::new("client");
        let freelancer = UserId::new("freelancer");

        f.ledger
            .create_deal(&client, &task_id, &freelancer)
            .await
            .unwrap();
        let err = f
            .ledger
            .create_deal(&client, &task_id, &freelancer)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn complete_deal_credits_net_amount_once() {
        let f = fixture().await;
        let task_id = posted_task(&f, 5000).await;
        let client = UserId::new("client");
        let freelancer = UserId::new("freelancer");

        let deal = f
            .ledger
            .create_deal(&client, &task_id, &freelancer)
            .await
            .unwrap()
            .deal;
        let view = f.ledger.complete_deal(&deal.id, &client).await.unwrap();

        // price 5000, commission 0.1 -> payout 4500
        assert_eq!(view.freelancer.balance, Amount::from_whole(4500));
        assert_eq!(view.freelancer.completed_tasks, 1);
        assert_eq!(view.deal.status, DealStatus::Completed);
        assert!(view.deal.completed_at.is_some());

        let task = f.store.get_task(&task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn complete_deal_requires_the_client() {
        let f = fixture().await;
        let task_id = posted_task(&f, 100).await;
        let deal = f
            .ledger
            .create_deal(&UserId::new("client"), &task_id, &UserId::new("freelancer"))
            .await
            .unwrap()
            .deal;

        let err = f
            .ledger
            .complete_deal(&deal.id, &UserId::new("freelancer"))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Permission(_)));
    }

    #[tokio::test]
    async fn complete_twice_rejected_without_double_credit() {
        let f = fixture().await;
        let task_id = posted_task(&f, 5000).await;
        let client = UserId::new("client");
        let freelancer = UserId::new("freelancer");

        let deal = f
            .ledger
            .create_deal(&client, &task_id, &freelancer)
            .await
            .unwrap()
            .deal;
        f.ledger.complete_deal(&deal.id, &client).await.unwrap();

        let err = f.ledger.complete_deal(&deal.id, &client).await.unwrap_err();
        assert!(matches!(err, MarketError::InvalidTransition(_)));

        let balance = f
            .store
            .get_user(&freelancer)
            .await
            .unwrap()
            .unwrap()
            .balance;
        assert_eq!(balance, Amount::from_whole(4500));
    }

    #[tokio::test]
    async fn post_message_appends_and_notifies_other_participant() {
        let f = fixture().await;
        let task_id = posted_task(&f, 100).await;
        let client = UserId::new("client");
        let freelancer = UserId::new("freelancer");
        let deal = f
            .ledger
            .create_deal(&client, &task_id, &freelancer)
            .await
            .unwrap()
            .deal;

        let message = f
            .ledger
            .post_message(&deal.id, &client, "How is it going?")
            .await
            .unwrap();
        assert_eq!(message.text, "How is it going?");
        assert!(!message.read);

        let stored = f.store.get_deal(&deal.id).await.unwrap().unwrap();
        assert_eq!(stored.messages.len(), 1);

        // freelancer got the deal_started notification plus this message
        let queued = f.notifications.list_for(&freelancer).await.unwrap();
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[0].kind, NotificationKind::NewMessage);
    }

    #[tokio::test]
    async fn post_message_by_non_participant_is_rejected() {
        let f = fixture().await;
        let task_id = posted_task(&f, 100).await;
        let deal = f
            .ledger
            .create_deal(&UserId::new("client"), &task_id, &UserId::new("freelancer"))
            .await
            .unwrap()
            .deal;

        let err = f
            .ledger
            .post_message(&deal.id, &UserId::new("stranger"), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Permission(_)));
    }

    #[tokio::test]
    async fn post_message_rejects_blank_text() {
        let f = fixture().await;
        let task_id = posted_task(&f, 100).await;
        let client = UserId::new("client");
        let deal = f
            .ledger
            .create_deal(&client, &task_id, &UserId::new("freelancer"))
            .await
            .unwrap()
            .deal;

        let err = f
            .ledger
            .post_message(&deal.id, &client, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Validation(_)));

        let stored = f.store.get_deal(&deal.id).await.unwrap().unwrap();
        assert!(stored.messages.is_empty());
    }

    #[tokio::test]
    async fn list_deals_covers_both_roles_and_filters_by_status() {
        let f = fixture().await;
        let client = UserId::new("client");
        let freelancer = UserId::new("freelancer");

        let first = posted_task(&f, 100).await;
        let second = posted_task(&f, 200).await;
        let deal = f
            .ledger
            .create_deal(&client, &first, &freelancer)
            .await
            .unwrap()
            .deal;
        f.ledger
            .create_deal(&client, &second, &freelancer)
            .await
            .unwrap();
        f.ledger.complete_deal(&deal.id, &client).await.unwrap();

        assert_eq!(f.ledger.list_deals(&client, None).await.unwrap().len(), 2);
        assert_eq!(
            f.ledger.list_deals(&freelancer, None).await.unwrap().len(),
            2
        );
        let active = f
            .ledger
            .list_deals(&freelancer, Some(DealStatus::InProgress))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(
            f.ledger
                .list_deals(&UserId::new("stranger"), None)
                .await
                .unwrap()
                .len(),
            0
        );
    }

    #[tokio::test]
    async fn user_stats_counts_deals_by_status() {
        let f = fixture().await;
        let client = UserId::new("client");
        let freelancer = UserId::new("freelancer");

        let first = posted_task(&f, 5000).await;
        let second = posted_task(&f, 300).await;
        let deal = f
            .ledger
            .create_deal(&client, &first, &freelancer)
            .await
            .unwrap()
            .deal;
        f.ledger
            .create_deal(&client, &second, &freelancer)
            .await
            .unwrap();
        f.ledger.complete_deal(&deal.id, &client).await.unwrap();

        let stats = f.ledger.user_stats(&freelancer).await.unwrap();
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.active_deals, 1);
        assert_eq!(stats.balance, Amount::from_whole(4500));
        assert_eq!(stats.rating, 5.0);
    }
}
