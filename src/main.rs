use anyhow::Result;
use heatgate::auth::SessionStore;
use heatgate::controller::spawn_automation;
use heatgate::logging::{get_logger, init_logging};
use heatgate::{Config, Controller};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    let logger = get_logger("main");
    logger.info(&format!("Heatgate {} starting up", env!("APP_VERSION")));

    let sessions = Arc::new(
        SessionStore::new(&config.auth)
            .map_err(|e| anyhow::anyhow!("Failed to set up login: {}", e))?,
    );
    let controller = Controller::from_config(config.clone())
        .map_err(|e| anyhow::anyhow!("Failed to create controller: {}", e))?
        .into_shared();

    let automation = spawn_automation(controller.clone(), &config);

    let result = heatgate::web::serve(controller, sessions, &config.web.host, config.web.port).await;

    if let Some(handle) = automation {
        handle.abort();
    }
    match result {
        Ok(()) => {
            logger.info("Web server stopped");
            Ok(())
        }
        Err(e) => {
            logger.error(&format!("Web server error: {}", e));
            Err(e)
        }
    }
}
