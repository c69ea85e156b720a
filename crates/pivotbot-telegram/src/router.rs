use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use pivotbot_core::{
    bot::PivotBot,
    config::Config,
    messaging::{port::MessagingPort, throttled::ThrottledMessenger},
    settings::SettingsStore,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<PivotBot>,
    pub user_locks: Arc<UserLocks>,
}

/// One update at a time per sender; different users proceed concurrently.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub async fn lock_user(&self, user_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(user_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run_polling(cfg: Config, store: Arc<SettingsStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!(username = %me.username(), "pivotbot started"),
        Err(e) => warn!(error = %e, "get_me failed; continuing"),
    }
    info!(
        owner = %cfg.owner_id,
        settings = %store.path().display(),
        "configuration loaded"
    );

    // Keep a 429 RetryAfter retry at the Telegram adapter layer; this only spaces requests out.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> =
        Arc::new(ThrottledMessenger::new(raw_messenger, cfg.throttle));

    let state = Arc::new(AppState {
        bot: Arc::new(PivotBot::new(cfg, store, messenger)),
        user_locks: Arc::new(UserLocks::default()),
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    info!("dispatcher stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_is_serialized() {
        let locks = Arc::new(UserLocks::default());
        let guard = locks.lock_user(7).await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.lock_user(7).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // A different user is not blocked.
        let _unrelated = tokio::time::timeout(Duration::from_millis(200), locks.lock_user(8))
            .await
            .unwrap();

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
