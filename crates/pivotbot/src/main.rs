use std::sync::Arc;

use pivotbot_core::{config::Config, settings::SettingsStore};

#[tokio::main]
async fn main() -> Result<(), pivotbot_core::Error> {
    pivotbot_core::logging::init("pivotbot")?;

    let cfg = Config::load()?;
    tracing::info!(owner = %cfg.owner_id, "starting pivotbot");

    let store = Arc::new(SettingsStore::new(cfg.settings_file.clone(), cfg.owner_id));
    store.load_or_default().await;

    pivotbot_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| pivotbot_core::Error::Transport(format!("telegram bot failed: {e}")))?;

    Ok(())
}
