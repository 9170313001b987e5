pub mod api;
pub mod auth;
pub mod bridge;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod node;

pub use config::NodeConfig;
pub use metrics::Metrics;
pub use node::GigNode;
