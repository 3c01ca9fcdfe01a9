//! BotAdapter: runs turns, one at a time per conversation, and recovers
//! from turn errors.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::activity::{Activity, ERROR_TRACE_VALUE_TYPE};
use crate::bot::DialogBot;
use crate::config::{BotConfig, StorageBackend};
use crate::dialogs::{Messages, UserProfileDialog};
use crate::error::Error;
use crate::state::{BotState, LibSqlStorage, MemoryStorage, Storage};
use crate::turn::TurnContext;

/// Turns into the bot and replies out.
pub struct BotAdapter {
    bot: Arc<DialogBot>,
    messages: Messages,
    /// One lock per conversation id; turns of the same conversation queue up.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl BotAdapter {
    pub fn new(bot: Arc<DialogBot>, messages: Messages) -> Self {
        Self {
            bot,
            messages,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wire storage, state, dialog and bot from configuration.
    pub async fn from_config(config: &BotConfig) -> crate::Result<Self> {
        let storage: Arc<dyn Storage> = match &config.storage {
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
            StorageBackend::LibSql(path) => Arc::new(LibSqlStorage::new_local(path).await?),
        };
        let messages = Messages::new(config.locale);
        let conversation_state = BotState::conversation(Arc::clone(&storage));
        let user_state = BotState::user(storage);
        let dialog = Arc::new(UserProfileDialog::new(&user_state, messages));
        let bot = DialogBot::builder()
            .conversation_state(conversation_state)
            .user_state(user_state)
            .dialog(dialog)
            .build()?;
        Ok(Self::new(Arc::new(bot), messages))
    }

    pub fn bot(&self) -> &Arc<DialogBot> {
        &self.bot
    }

    /// Run one turn for `activity` and return the activities to send back.
    pub async fn process_activity(&self, activity: Activity) -> Vec<Activity> {
        let Some(conversation_id) = activity.conversation_id().map(str::to_string) else {
            return self.run_turn(activity).await;
        };

        let lock = self.lock_for(&conversation_id).await;
        let replies = {
            let _guard = lock.lock().await;
            self.run_turn(activity).await
        };
        self.release_lock(&conversation_id, lock).await;
        replies
    }

    async fn run_turn(&self, activity: Activity) -> Vec<Activity> {
        let mut ctx = TurnContext::new(activity);
        if let Err(e) = self.bot.run(&mut ctx).await {
            self.on_turn_error(&mut ctx, &e).await;
        }
        ctx.into_replies()
    }

    /// Runtime-wide error hook: report, apologize, and reset the conversation.
    async fn on_turn_error(&self, ctx: &mut TurnContext, err: &Error) {
        error!(
            error = %err,
            conversation_id = ctx.activity().conversation_id().unwrap_or(""),
            "[on_turn_error] unhandled error"
        );

        ctx.send_trace(
            "OnTurnError Trace",
            serde_json::Value::String(err.to_string()),
            ERROR_TRACE_VALUE_TYPE,
            "TurnError",
        );
        for line in self.messages.turn_error() {
            ctx.send_text(line);
        }

        // Clear this conversation so the next message starts cleanly.
        if let Err(e) = self.bot.conversation_state().delete(ctx).await {
            warn!(error = %e, "Failed to clear conversation state after turn error");
        }
    }

    async fn lock_for(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry(conversation_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Drop the map entry once no other turn holds or waits on it.
    async fn release_lock(&self, conversation_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(conversation_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(conversation_id);
        }
    }
}
