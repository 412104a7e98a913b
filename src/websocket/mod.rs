// WebSocket module - organized into focused submodules
//
// - handler: WebSocket upgrade handler (entry point)
// - connection: Main WebSocket connection handling logic
// - sending: Message serialization and sending functions
// - routes: HTTP route setup (health, metrics, etc.)
// - metrics: Metrics endpoints and authentication
// - prometheus: Prometheus metrics rendering

mod connection;
mod handler;
mod metrics;
mod prometheus;
mod routes;
mod sending;

pub use handler::websocket_handler;
pub use metrics::{metrics_handler, prometheus_metrics_handler};
pub use routes::create_router;
