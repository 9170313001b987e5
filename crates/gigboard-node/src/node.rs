use crate::api::{self, AppState};
use crate::bridge::{bridge_from_config, HostBridge};
use crate::config::NodeConfig;
use crate::metrics::Metrics;
use anyhow::Result;
use gigboard_market::MarketEngine;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// The assembled service: configuration, the marketplace core, the host
/// bridge and metrics.
pub struct GigNode {
    config: NodeConfig,
    pub market: Arc<MarketEngine>,
    pub bridge: Arc<dyn HostBridge>,
    pub metrics: Metrics,
}

impl GigNode {
    pub fn new(config: NodeConfig) -> Result<Self> {
        let market = Arc::new(MarketEngine::in_memory());
        let bridge = bridge_from_config(&config.platform)?;
        Ok(Self {
            config,
            market,
            bridge,
            metrics: Metrics::new(),
        })
    }

    pub fn app_state(&self) -> Arc<AppState> {
        Arc::new(AppState {
            market: self.market.clone(),
            bridge: self.bridge.clone(),
            metrics: self.metrics.clone(),
        })
    }

    /// Forward every stored notification to the host platform as a toast.
    fn spawn_toast_forwarder(&self) {
        let mut events = self.market.notifications.subscribe();
        let bridge = self.bridge.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(notification) => {
                        if let Err(e) = bridge.push_toast(&notification).await {
                            warn!(
                                user_id = %notification.user_id,
                                error = %e,
                                "⚠️ Toast push failed"
                            );
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Toast forwarder lagged, notifications dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    pub async fn start(&self) -> Result<()> {
        self.spawn_toast_forwarder();

        let app = api::router(self.app_state());
        let addr = self.config.api_addr();
        info!(name = %self.config.node.name, addr = %addr, "🚀 Starting API server");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }
}
