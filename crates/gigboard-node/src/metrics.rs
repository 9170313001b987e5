use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    pub tasks_created: IntCounter,
    pub responses_submitted: IntCounter,
    pub deals_created: IntCounter,
    pub deals_completed: IntCounter,
    pub messages_posted: IntCounter,
    pub users_created: IntCounter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        let tasks_created =
            IntCounter::new("gigboard_tasks_created_total", "Total tasks posted").unwrap();
        let responses_submitted = IntCounter::new(
            "gigboard_responses_submitted_total",
            "Total freelancer responses submitted",
        )
        .unwrap();
        let deals_created =
            IntCounter::new("gigboard_deals_created_total", "Total deals created").unwrap();
        let deals_completed =
            IntCounter::new("gigboard_deals_completed_total", "Total deals completed").unwrap();
        let messages_posted =
            IntCounter::new("gigboard_messages_posted_total", "Total chat messages posted")
                .unwrap();
        let users_created = IntCounter::new(
            "gigboard_users_created_total",
            "Users created on first authenticated contact",
        )
        .unwrap();

        registry.register(Box::new(tasks_created.clone())).unwrap();
        registry
            .register(Box::new(responses_submitted.clone()))
            .unwrap();
        registry.register(Box::new(deals_created.clone())).unwrap();
        registry
            .register(Box::new(deals_completed.clone()))
            .unwrap();
        registry
            .register(Box::new(messages_posted.clone()))
            .unwrap();
        registry.register(Box::new(users_created.clone())).unwrap();

        Self {
            registry,
            tasks_created,
            responses_submitted,
            deals_created,
            deals_completed,
            messages_posted,
            users_created,
        }
    }

    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
