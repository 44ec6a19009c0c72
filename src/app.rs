use std::error::Error;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::application::UserImportUseCase;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::connect_user_store;
use crate::interfaces::http::{start_server, HttpState};

pub async fn run() -> Result<(), Box<dyn Error>> {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = AppConfig::load().map_err(|err| {
        error!(error = %err, "Failed to load configuration");
        err
    })?;

    info!(
        csv_path = %config.csv_path.display(),
        table = %config.table,
        "Configuration loaded"
    );

    let store = connect_user_store(&config).await.map_err(|err| {
        error!(error = %err, "Failed to connect to storage");
        err
    })?;

    store.ensure_schema().await.map_err(|err| {
        error!(error = %err, table = %config.table, "Failed to prepare users table");
        err
    })?;

    let state = HttpState {
        use_case: Arc::new(UserImportUseCase::new(store)),
        csv_path: config.csv_path.clone(),
    };

    let server = start_server(state, &config.host, config.port)?;
    info!("Server listening on http://{}:{}", config.host, config.port);

    server.await?;
    Ok(())
}
