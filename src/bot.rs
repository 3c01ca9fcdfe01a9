//! DialogBot: routes each activity to the handlers registered for its kind,
//! then saves conversation and user state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::activity::ActivityKind;
use crate::dialogs::{DialogState, Messages, UserProfileDialog, Waterfall};
use crate::error::{ConfigError, Result};
use crate::state::{BotState, StatePropertyAccessor};
use crate::turn::TurnContext;

/// Conversation-state property holding the active dialog.
pub const DIALOG_STATE: &str = "DialogState";

/// Something that reacts to one kind of activity.
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    /// Handler name, for logs.
    fn name(&self) -> &str;

    async fn handle(&self, ctx: &mut TurnContext) -> Result<()>;
}

/// Handlers keyed by activity kind, run in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<ActivityKind, Vec<Arc<dyn ActivityHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ActivityKind, handler: Arc<dyn ActivityHandler>) {
        tracing::debug!(kind = %kind, handler = handler.name(), "Registered activity handler");
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Handlers for `kind` (empty if none).
    pub fn handlers_for(&self, kind: &ActivityKind) -> &[Arc<dyn ActivityHandler>] {
        self.handlers.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Message handler: hands the turn to the order dialog.
pub struct DialogMessageHandler {
    dialog: Arc<UserProfileDialog>,
    dialog_state: StatePropertyAccessor<DialogState>,
}

impl DialogMessageHandler {
    pub fn new(dialog: Arc<UserProfileDialog>, dialog_state: StatePropertyAccessor<DialogState>) -> Self {
        Self {
            dialog,
            dialog_state,
        }
    }
}

#[async_trait]
impl ActivityHandler for DialogMessageHandler {
    fn name(&self) -> &str {
        "dialog"
    }

    async fn handle(&self, ctx: &mut TurnContext) -> Result<()> {
        tracing::debug!(
            conversation_id = ctx.activity().conversation_id().unwrap_or(""),
            "Running dialog with message activity"
        );
        let status = self.dialog.run(ctx, &self.dialog_state).await?;
        tracing::debug!(status = ?status, "Dialog turn finished");
        Ok(())
    }
}

/// ConversationUpdate handler: greets every newly added member except the bot.
pub struct WelcomeHandler {
    messages: Messages,
}

impl WelcomeHandler {
    pub fn new(messages: Messages) -> Self {
        Self { messages }
    }
}

#[async_trait]
impl ActivityHandler for WelcomeHandler {
    fn name(&self) -> &str {
        "welcome"
    }

    async fn handle(&self, ctx: &mut TurnContext) -> Result<()> {
        let Some(bot_id) = ctx.activity().recipient_id().map(str::to_string) else {
            tracing::warn!(
                members = ctx.activity().members_added.len(),
                "conversationUpdate without recipient, cannot tell the bot apart; not greeting"
            );
            return Ok(());
        };
        let newcomers = ctx
            .activity()
            .members_added
            .iter()
            .filter(|m| m.id != bot_id)
            .count();
        for _ in 0..newcomers {
            ctx.send_text(self.messages.welcome());
        }
        Ok(())
    }
}

/// The bot: a handler table plus the state it saves after every turn.
pub struct DialogBot {
    conversation_state: BotState,
    user_state: BotState,
    handlers: HandlerRegistry,
}

impl DialogBot {
    pub fn builder() -> DialogBotBuilder {
        DialogBotBuilder::default()
    }

    pub fn conversation_state(&self) -> &BotState {
        &self.conversation_state
    }

    pub fn user_state(&self) -> &BotState {
        &self.user_state
    }

    /// Process one turn.
    ///
    /// State is saved whether or not the dialog finished. A handler error
    /// skips the save so a failed turn never persists half-applied changes.
    pub async fn run(&self, ctx: &mut TurnContext) -> Result<()> {
        let kind = ctx.activity().kind.clone();
        let handlers = self.handlers.handlers_for(&kind);
        if handlers.is_empty() {
            tracing::debug!(kind = %kind, "No handler for activity kind");
        }
        for handler in handlers {
            handler.handle(ctx).await?;
        }

        self.conversation_state.save_changes(ctx, false).await?;
        self.user_state.save_changes(ctx, false).await?;
        Ok(())
    }
}

/// Builds a `DialogBot`. All three collaborators are required.
#[derive(Default)]
pub struct DialogBotBuilder {
    conversation_state: Option<BotState>,
    user_state: Option<BotState>,
    dialog: Option<Arc<UserProfileDialog>>,
}

impl DialogBotBuilder {
    pub fn conversation_state(mut self, state: BotState) -> Self {
        self.conversation_state = Some(state);
        self
    }

    pub fn user_state(mut self, state: BotState) -> Self {
        self.user_state = Some(state);
        self
    }

    pub fn dialog(mut self, dialog: Arc<UserProfileDialog>) -> Self {
        self.dialog = Some(dialog);
        self
    }

    pub fn build(self) -> std::result::Result<DialogBot, ConfigError> {
        let missing = |key: &str| ConfigError::MissingRequired {
            key: key.to_string(),
            hint: "[DialogBot] must be built with conversation state, user state and a dialog"
                .to_string(),
        };
        let conversation_state = self
            .conversation_state
            .ok_or_else(|| missing("conversation_state"))?;
        let user_state = self.user_state.ok_or_else(|| missing("user_state"))?;
        let dialog = self.dialog.ok_or_else(|| missing("dialog"))?;

        let dialog_state = conversation_state.create_property(DIALOG_STATE);
        let messages = *dialog.messages();

        let mut handlers = HandlerRegistry::new();
        handlers.register(
            ActivityKind::Message,
            Arc::new(DialogMessageHandler::new(dialog, dialog_state)),
        );
        handlers.register(
            ActivityKind::ConversationUpdate,
            Arc::new(WelcomeHandler::new(messages)),
        );

        Ok(DialogBot {
            conversation_state,
            user_state,
            handlers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{Activity, ChannelAccount};
    use crate::dialogs::Locale;
    use crate::state::{MemoryStorage, Storage};

    fn build_bot(storage: Arc<MemoryStorage>) -> DialogBot {
        let conversation = BotState::conversation(storage.clone());
        let user = BotState::user(storage);
        let dialog = Arc::new(UserProfileDialog::new(&user, Messages::new(Locale::English)));
        DialogBot::builder()
            .conversation_state(conversation)
            .user_state(user)
            .dialog(dialog)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_rejects_missing_collaborators() {
        let storage = Arc::new(MemoryStorage::new());
        let err = DialogBot::builder()
            .user_state(BotState::user(storage.clone()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::MissingRequired { ref key, .. } if key == "conversation_state"));

        let err = DialogBot::builder()
            .conversation_state(BotState::conversation(storage.clone()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::MissingRequired { ref key, .. } if key == "user_state"));

        let err = DialogBot::builder()
            .conversation_state(BotState::conversation(storage.clone()))
            .user_state(BotState::user(storage))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::MissingRequired { ref key, .. } if key == "dialog"));
    }

    #[test]
    fn builder_registers_both_handlers() {
        let bot = build_bot(Arc::new(MemoryStorage::new()));
        assert_eq!(bot.handlers.handlers_for(&ActivityKind::Message).len(), 1);
        assert_eq!(
            bot.handlers.handlers_for(&ActivityKind::ConversationUpdate)[0].name(),
            "welcome"
        );
        assert!(bot.handlers.handlers_for(&ActivityKind::Typing).is_empty());
    }

    #[tokio::test]
    async fn welcome_skips_the_bot_itself() {
        let bot = build_bot(Arc::new(MemoryStorage::new()));
        let activity = Activity::members_added(
            "test",
            "conv-1",
            vec![
                ChannelAccount::new("user-1"),
                ChannelAccount::new(crate::BOT_ID),
                ChannelAccount::new("user-2"),
            ],
        );
        let mut ctx = TurnContext::new(activity);
        bot.run(&mut ctx).await.unwrap();

        let replies = ctx.into_replies();
        assert_eq!(replies.len(), 2);
        assert!(replies.iter().all(|r| r.text().starts_with("Welcome")));
    }

    #[tokio::test]
    async fn welcome_needs_a_recipient() {
        let bot = build_bot(Arc::new(MemoryStorage::new()));
        let mut activity = Activity::members_added(
            "test",
            "conv-1",
            vec![ChannelAccount::new("user-1"), ChannelAccount::new(crate::BOT_ID)],
        );
        activity.recipient = None;

        let mut ctx = TurnContext::new(activity);
        bot.run(&mut ctx).await.unwrap();
        assert!(ctx.replies().is_empty());
    }

    #[tokio::test]
    async fn message_turn_saves_dialog_state() {
        let storage = Arc::new(MemoryStorage::new());
        let bot = build_bot(storage.clone());

        let mut ctx = TurnContext::new(Activity::message("test", "conv-1", "user-1", "hi"));
        bot.run(&mut ctx).await.unwrap();

        let record = storage.read("test/conversations/conv-1").await.unwrap().unwrap();
        assert_eq!(record[DIALOG_STATE]["active"]["step"], "name");
    }

    #[tokio::test]
    async fn unhandled_kind_is_ignored() {
        let storage = Arc::new(MemoryStorage::new());
        let bot = build_bot(storage.clone());
        let mut activity = Activity::message("test", "conv-1", "user-1", "");
        activity.kind = ActivityKind::Typing;

        let mut ctx = TurnContext::new(activity);
        bot.run(&mut ctx).await.unwrap();
        assert!(ctx.replies().is_empty());
        assert!(storage.is_empty().await);
    }
}
