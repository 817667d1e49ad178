use std::env;

use anyhow::Context;
use serde_json::json;

use heartio_service::{
    app_state::AppState, config::Config, http, logging::init_logger,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = init_logger("heartio-service");

    let config = Config::load().context("failed to load configuration")?;

    if matches!(env::args().nth(1).as_deref(), Some("check-config")) {
        logger.info(
            "config.check_passed",
            serde_json::to_value(&config).unwrap_or_else(|_| json!({ "status": "ok" })),
        );
        return Ok(());
    }

    let state = AppState::initialize(config.clone())
        .context("failed to initialize application state")?;

    logger.info(
        "server.initialized",
        json!({
            "port": config.port,
            "iheartBaseUrl": config.iheart.base_url,
            "radioBrowserBaseUrl": config.radio_browser.default_base_url,
            "catalogLimit": config.catalog_limit,
        }),
    );

    if let Err(error) = http::serve(state).await {
        logger.error("server.failed", json!({ "error": format!("{error:#}") }));
        return Err(error.context("http server failed"));
    }
    Ok(())
}
