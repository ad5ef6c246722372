// ==========================================
// College ERP - Server entry point
// ==========================================

use college_erp::config::AppConfig;
use college_erp::{app, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", college_erp::APP_NAME, college_erp::VERSION);
    tracing::info!("==================================================");

    let config = AppConfig::load()?;
    tracing::info!(db_path = %config.db_path, port = config.port, "configuration loaded");

    app::serve(config).await
}
