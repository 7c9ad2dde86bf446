#![cfg(not(tarpaulin_include))]

use log::info;
use pmo_dashboard::app;
use pmo_dashboard::config::DashboardConfig;
use std::env;

/// Main entry point for the dashboard web server
///
/// Settings come from `DASHBOARD_*` environment variables. An optional first
/// argument overrides the bind address.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let mut config = DashboardConfig::from_env();
    if let Some(addr) = env::args().nth(1) {
        config.bind_addr = addr;
    }

    info!(
        "Starting dashboard server (columns: {}, {}, {})",
        config.columns.project, config.columns.department, config.columns.manager
    );
    app::run(config).await
}
