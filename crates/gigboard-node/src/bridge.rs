use crate::config::PlatformConfig;
use async_trait::async_trait;
use gigboard_market::{Amount, Notification};
use gigboard_types::{MarketError, Result, UserId};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Profile fields resolved from the host platform's identity service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub photo: Option<String>,
}

/// Narrow interface to the host platform.
///
/// The core decides when these are invoked and with what amounts; how they
/// execute is the platform's business. Failures surface as
/// `MarketError::ExternalService` and are never retried here.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Identity lookup, used once per user on first authenticated contact.
    async fn fetch_profile(&self, user_id: &UserId) -> Result<UserProfile>;

    /// Ask the platform to open its payment form for a user.
    async fn open_pay_form(
        &self,
        user_id: &UserId,
        amount: Amount,
        description: &str,
    ) -> Result<()>;

    /// Push a toast notification through the platform.
    async fn push_toast(&self, notification: &Notification) -> Result<()>;
}

/// Bridge over the host platform's HTTP API.
pub struct HttpBridge {
    client: reqwest::Client,
    base_url: String,
    service_token: String,
}

impl HttpBridge {
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| MarketError::ExternalService(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_token: config.service_token.clone(),
        })
    }
}

#[async_trait]
impl HostBridge for HttpBridge {
    async fn fetch_profile(&self, user_id: &UserId) -> Result<UserProfile> {
        let url = format!("{}/users/{}", self.base_url, user_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.service_token)
            .send()
            .await
            .map_err(|e| MarketError::ExternalService(format!("identity lookup failed: {e}")))?;
        if !response.status().is_success() {
            return Err(MarketError::ExternalService(format!(
                "identity lookup returned {}",
                response.status()
            )));
        }
        response
            .json::<UserProfile>()
            .await
            .map_err(|e| MarketError::ExternalService(format!("identity payload invalid: {e}")))
    }

    async fn open_pay_form(
        &self,
        user_id: &UserId,
        amount: Amount,
        description: &str,
    ) -> Result<()> {
        let url = format!("{}/payments/form", self.base_url);
        self.client
            .post(&url)
            .bearer_auth(&self.service_token)
            .json(&serde_json::json!({
                "userId": user_id,
                "amount": amount,
                "description": description,
            }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| MarketError::ExternalService(format!("pay form request failed: {e}")))?;
        Ok(())
    }

    async fn push_toast(&self, notification: &Notification) -> Result<()> {
        let url = format!("{}/notifications/push", self.base_url);
        self.client
            .post(&url)
            .bearer_auth(&self.service_token)
            .json(&serde_json::json!({
                "userId": notification.user_id,
                "text": notification.body,
            }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| MarketError::ExternalService(format!("toast push failed: {e}")))?;
        Ok(())
    }
}

/// In-process bridge for development and tests: deterministic profiles, no
/// network.
pub struct LocalBridge;

#[async_trait]
impl HostBridge for LocalBridge {
    async fn fetch_profile(&self, user_id: &UserId) -> Result<UserProfile> {
        debug!(user_id = %user_id, "Resolving profile locally");
        Ok(UserProfile {
            first_name: "Guest".to_string(),
            last_name: format!("#{user_id}"),
            photo: None,
        })
    }

    async fn open_pay_form(
        &self,
        user_id: &UserId,
        amount: Amount,
        description: &str,
    ) -> Result<()> {
        info!(user_id = %user_id, amount = %amount, description, "💳 Pay form requested");
        Ok(())
    }

    async fn push_toast(&self, notification: &Notification) -> Result<()> {
        debug!(
            user_id = %notification.user_id,
            body = %notification.body,
            "🔔 Toast pushed"
        );
        Ok(())
    }
}

pub fn bridge_from_config(config: &PlatformConfig) -> Result<Arc<dyn HostBridge>> {
    match config.mode.as_str() {
        "local" => Ok(Arc::new(LocalBridge)),
        "http" => Ok(Arc::new(HttpBridge::new(config)?)),
        other => Err(MarketError::Validation(format!(
            "unknown platform mode: {other}"
        ))),
    }
}
