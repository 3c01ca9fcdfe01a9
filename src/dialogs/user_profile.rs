//! The order dialog: name → size → age consent → age → confirm → summary.

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{DialogError, Result};
use crate::profile::{AGE_NOT_PROVIDED, USER_PROFILE, UserProfile};
use crate::state::{BotState, StatePropertyAccessor};
use crate::turn::TurnContext;

use super::messages::{Messages, SIZE_OPTIONS};
use super::prompts::{NumberValidator, PromptSpec, PromptValue};
use super::waterfall::{ProfileStep, StepResult, StepValues, Waterfall};

/// Dialog id recorded on every instance.
pub const USER_PROFILE_DIALOG: &str = "userProfileDialog";

/// Collects name, size and (optionally) age, then stores the profile once
/// the user confirms.
pub struct UserProfileDialog {
    profile: StatePropertyAccessor<UserProfile>,
    messages: Messages,
}

impl UserProfileDialog {
    pub fn new(user_state: &BotState, messages: Messages) -> Self {
        Self {
            profile: user_state.create_property(USER_PROFILE),
            messages,
        }
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    async fn summary_step(
        &self,
        ctx: &mut TurnContext,
        values: &StepValues,
        confirmed: bool,
    ) -> Result<StepResult> {
        if !confirmed {
            ctx.send_text(self.messages.not_stored());
            return Ok(StepResult::End);
        }

        let step = ProfileStep::Summary;
        let name = values.name.clone().ok_or_else(|| missing(step, "name"))?;
        let size = values.size.clone().ok_or_else(|| missing(step, "size"))?;
        let age = values.age.ok_or_else(|| missing(step, "age"))?;

        let mut profile = self.profile.get(ctx, UserProfile::default).await?;
        profile.name = name;
        profile.size = size;
        profile.age = age;
        profile.updated_at = Some(Utc::now());
        self.profile.set(ctx, &profile).await?;

        tracing::info!(
            user_id = ctx.activity().from_id().unwrap_or(""),
            size = %profile.size,
            age_provided = profile.age().is_some(),
            "Stored user profile"
        );

        let summary = self
            .messages
            .summary(&profile.name, &profile.size, profile.age());
        ctx.send_text(summary);
        Ok(StepResult::End)
    }
}

#[async_trait]
impl Waterfall for UserProfileDialog {
    fn dialog_id(&self) -> &str {
        USER_PROFILE_DIALOG
    }

    async fn run_step(
        &self,
        step: ProfileStep,
        ctx: &mut TurnContext,
        values: &mut StepValues,
        input: Option<PromptValue>,
    ) -> Result<StepResult> {
        let m = &self.messages;
        match step {
            ProfileStep::Name => Ok(StepResult::Prompt(
                PromptSpec::text(m.name_prompt()).with_retry(m.name_retry()),
            )),

            ProfileStep::Size => {
                let name = expect_text(step, input)?;
                ctx.send_text(m.greeting(&name));
                values.name = Some(name);
                Ok(StepResult::Prompt(
                    PromptSpec::choice(m.size_prompt(), &SIZE_OPTIONS).with_retry(m.size_retry()),
                ))
            }

            ProfileStep::AgeConsent => {
                let size = expect_text(step, input)?;
                ctx.send_text(m.size_ack(&size));
                values.size = Some(size);
                Ok(StepResult::Prompt(
                    PromptSpec::confirm(m.age_consent_prompt(), m.confirm_choices())
                        .with_retry(m.confirm_retry()),
                ))
            }

            ProfileStep::Age => {
                if expect_bool(step, input)? {
                    Ok(StepResult::Prompt(
                        PromptSpec::number(m.age_prompt(), Some(NumberValidator::AgeRange))
                            .with_retry(m.age_retry()),
                    ))
                } else {
                    Ok(StepResult::Next(PromptValue::Number(AGE_NOT_PROVIDED)))
                }
            }

            ProfileStep::Confirm => {
                let age = expect_number(step, input)?;
                if age == AGE_NOT_PROVIDED {
                    ctx.send_text(m.age_not_provided());
                } else {
                    ctx.send_text(m.age_ack(age));
                }
                values.age = Some(age);
                Ok(StepResult::Prompt(
                    PromptSpec::confirm(m.confirm_prompt(), m.confirm_choices())
                        .with_retry(m.confirm_retry()),
                ))
            }

            ProfileStep::Summary => {
                let confirmed = expect_bool(step, input)?;
                self.summary_step(ctx, values, confirmed).await
            }
        }
    }
}

fn missing(step: ProfileStep, field: &str) -> DialogError {
    DialogError::MissingValue {
        step: step.to_string(),
        field: field.to_string(),
    }
}

fn unexpected(step: ProfileStep, input: Option<&PromptValue>) -> DialogError {
    DialogError::UnexpectedInput {
        step: step.to_string(),
        input: input.map(|v| format!("{v:?}")).unwrap_or_else(|| "none".to_string()),
    }
}

fn expect_text(step: ProfileStep, input: Option<PromptValue>) -> Result<String> {
    match input.as_ref().and_then(PromptValue::as_text) {
        Some(text) => Ok(text.to_string()),
        None => Err(unexpected(step, input.as_ref()).into()),
    }
}

fn expect_bool(step: ProfileStep, input: Option<PromptValue>) -> Result<bool> {
    input
        .as_ref()
        .and_then(PromptValue::as_bool)
        .ok_or_else(|| unexpected(step, input.as_ref()).into())
}

fn expect_number(step: ProfileStep, input: Option<PromptValue>) -> Result<i64> {
    input
        .as_ref()
        .and_then(PromptValue::as_number)
        .ok_or_else(|| unexpected(step, input.as_ref()).into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::activity::{Activity, ActivityKind};
    use crate::dialogs::messages::Locale;
    use crate::dialogs::waterfall::{DialogState, DialogTurnStatus};
    use crate::error::{Error, StorageError};
    use crate::state::{MemoryStorage, Storage};

    /// Memory storage that counts writes per key.
    #[derive(Default)]
    struct CountingStorage {
        inner: MemoryStorage,
        writes: std::sync::Mutex<std::collections::HashMap<String, usize>>,
    }

    impl CountingStorage {
        fn writes_to(&self, key: &str) -> usize {
            self.writes.lock().unwrap().get(key).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Storage for CountingStorage {
        async fn read(&self, key: &str) -> std::result::Result<Option<serde_json::Value>, StorageError> {
            self.inner.read(key).await
        }

        async fn write(&self, key: &str, value: &serde_json::Value) -> std::result::Result<(), StorageError> {
            *self.writes.lock().unwrap().entry(key.to_string()).or_default() += 1;
            self.inner.write(key, value).await
        }

        async fn delete(&self, key: &str) -> std::result::Result<bool, StorageError> {
            self.inner.delete(key).await
        }
    }

    struct Harness {
        storage: Arc<CountingStorage>,
        conversation: BotState,
        user: BotState,
        dialog_state: StatePropertyAccessor<DialogState>,
        dialog: UserProfileDialog,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_locale(Locale::English)
        }

        fn with_locale(locale: Locale) -> Self {
            let storage = Arc::new(CountingStorage::default());
            let conversation = BotState::conversation(storage.clone());
            let user = BotState::user(storage.clone());
            let dialog = UserProfileDialog::new(&user, Messages::new(locale));
            Self {
                storage,
                dialog_state: conversation.create_property("DialogState"),
                conversation,
                user,
                dialog,
            }
        }

        /// One full turn, state saved afterwards. Returns status + reply texts.
        async fn say(&self, text: &str) -> (DialogTurnStatus, Vec<String>) {
            let mut ctx = TurnContext::new(Activity::message("test", "conv-1", "user-1", text));
            let status = self.dialog.run(&mut ctx, &self.dialog_state).await.unwrap();
            self.conversation.save_changes(&mut ctx, false).await.unwrap();
            self.user.save_changes(&mut ctx, false).await.unwrap();
            let texts = ctx
                .into_replies()
                .into_iter()
                .filter(|a| a.kind == ActivityKind::Message)
                .map(|a| a.text().to_string())
                .collect();
            (status, texts)
        }

        async fn profile(&self) -> Option<UserProfile> {
            self.user
                .read_property("test", "user-1", USER_PROFILE)
                .await
                .unwrap()
        }

        async fn active_step(&self) -> Option<ProfileStep> {
            let state: Option<DialogState> = self
                .conversation
                .read_property("test", "conv-1", "DialogState")
                .await
                .unwrap();
            state.and_then(|s| s.active).map(|a| a.step)
        }
    }

    #[tokio::test]
    async fn first_message_asks_for_name() {
        let h = Harness::new();
        let (status, replies) = h.say("hi").await;
        assert_eq!(status, DialogTurnStatus::Waiting);
        assert_eq!(replies, vec!["What is your name?"]);
        assert_eq!(h.active_step().await, Some(ProfileStep::Name));
    }

    #[tokio::test]
    async fn declining_age_skips_number_prompt() {
        let h = Harness::new();
        h.say("hi").await;
        h.say("Ana").await;
        h.say("500ml").await;

        let (status, replies) = h.say("no").await;
        assert_eq!(status, DialogTurnStatus::Waiting);
        assert_eq!(replies, vec!["Age not provided.", "Is this correct?"]);
        assert_eq!(h.active_step().await, Some(ProfileStep::Confirm));

        let (status, replies) = h.say("yes").await;
        assert_eq!(status, DialogTurnStatus::Complete);
        assert_eq!(
            replies,
            vec!["I noted your açaí size as 500ml and your name as Ana."]
        );

        let profile = h.profile().await.unwrap();
        assert_eq!(profile.name, "Ana");
        assert_eq!(profile.size, "500ml");
        assert_eq!(profile.age, -1);
        assert_eq!(h.active_step().await, None);
    }

    #[tokio::test]
    async fn full_run_with_age_stores_profile() {
        let h = Harness::new();
        h.say("hi").await;

        let (_, replies) = h.say("Ana").await;
        assert_eq!(replies[0], "Hello Ana! Shall we place your order?");

        let (_, replies) = h.say("500ml").await;
        assert_eq!(replies[0], "So you want a 500ml açaí.");

        let (_, replies) = h.say("yes").await;
        assert_eq!(replies, vec!["Please tell me your age."]);

        let (_, replies) = h.say("45").await;
        assert_eq!(replies, vec!["I have you down as 45 years old.", "Is this correct?"]);
        assert!(h.profile().await.is_none(), "nothing stored before confirmation");

        let (status, replies) = h.say("yes").await;
        assert_eq!(status, DialogTurnStatus::Complete);
        assert!(replies[0].ends_with("And you are 45 years old."));

        let profile = h.profile().await.unwrap();
        assert_eq!(
            (profile.name.as_str(), profile.size.as_str(), profile.age),
            ("Ana", "500ml", 45)
        );
    }

    #[tokio::test]
    async fn out_of_range_age_is_retried() {
        let h = Harness::new();
        for text in ["hi", "Ana", "700ml", "yes"] {
            h.say(text).await;
        }

        for bad in ["200", "0", "-5", "old"] {
            let (status, replies) = h.say(bad).await;
            assert_eq!(status, DialogTurnStatus::Waiting);
            assert_eq!(
                replies,
                vec!["The value must be greater than 0 and less than 150."],
                "input {bad}"
            );
            assert_eq!(h.active_step().await, Some(ProfileStep::Age));
        }

        let (_, replies) = h.say("149").await;
        assert_eq!(replies[0], "I have you down as 149 years old.");
    }

    #[tokio::test]
    async fn declining_final_confirmation_leaves_store_untouched() {
        let h = Harness::new();
        for text in ["hi", "Ana", "300ml", "yes", "30"] {
            h.say(text).await;
        }

        let (status, replies) = h.say("no").await;
        assert_eq!(status, DialogTurnStatus::Complete);
        assert_eq!(replies, vec!["Thank you. Your profile will not be stored."]);
        assert!(h.profile().await.is_none());
        assert!(h.storage.read("test/users/user-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn confirmed_order_writes_user_record_once() {
        let h = Harness::new();
        for text in ["hi", "Ana", "500ml", "yes", "45"] {
            h.say(text).await;
        }
        assert_eq!(h.storage.writes_to("test/users/user-1"), 0);

        h.say("yes").await;
        assert_eq!(h.storage.writes_to("test/users/user-1"), 1);
    }

    #[tokio::test]
    async fn declined_order_never_writes_user_record() {
        let h = Harness::new();
        for text in ["hi", "Ana", "500ml", "yes", "45", "no"] {
            h.say(text).await;
        }
        assert_eq!(h.storage.writes_to("test/users/user-1"), 0);
        assert!(h.storage.writes_to("test/conversations/conv-1") > 0);
    }

    #[tokio::test]
    async fn declining_keeps_previous_profile() {
        let h = Harness::new();
        for text in ["hi", "Ana", "300ml", "no", "yes"] {
            h.say(text).await;
        }
        let before = h.profile().await.unwrap();

        for text in ["hi", "Bia", "700ml", "yes", "22", "no"] {
            h.say(text).await;
        }
        assert_eq!(h.profile().await.unwrap(), before);
    }

    #[tokio::test]
    async fn confirmed_run_overwrites_previous_profile() {
        let h = Harness::new();
        for text in ["hi", "Ana", "300ml", "yes", "45", "yes"] {
            h.say(text).await;
        }
        for text in ["hi", "Bia", "700ml", "no", "yes"] {
            h.say(text).await;
        }

        let profile = h.profile().await.unwrap();
        assert_eq!(profile.name, "Bia");
        assert_eq!(profile.size, "700ml");
        assert_eq!(profile.age, -1);
    }

    #[tokio::test]
    async fn unrecognized_size_reprompts() {
        let h = Harness::new();
        h.say("hi").await;
        h.say("Ana").await;

        let (_, replies) = h.say("huge").await;
        assert_eq!(replies, vec!["Please pick one of: 300ml, 500ml or 700ml"]);
        assert_eq!(h.active_step().await, Some(ProfileStep::Size));

        let (_, replies) = h.say("2").await;
        assert_eq!(replies[0], "So you want a 500ml açaí.");
    }

    #[tokio::test]
    async fn portuguese_locale_and_answers() {
        let h = Harness::with_locale(Locale::Portuguese);
        let (_, replies) = h.say("oi").await;
        assert_eq!(replies, vec!["Qual o seu nome?"]);

        h.say("Ana").await;
        h.say("500").await;
        let (_, replies) = h.say("não").await;
        assert_eq!(replies, vec!["Idade não informada.", "Está certo?"]);

        let (_, replies) = h.say("sim").await;
        assert_eq!(replies, vec!["Marquei que seu açaí é de 500ml e seu nome é Ana."]);
    }

    #[tokio::test]
    async fn summary_without_values_is_an_error() {
        let h = Harness::new();
        let mut ctx = TurnContext::new(Activity::message("test", "conv-1", "user-1", "yes"));
        let err = h
            .dialog
            .run_step(
                ProfileStep::Summary,
                &mut ctx,
                &mut StepValues::default(),
                Some(PromptValue::Bool(true)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dialog(DialogError::MissingValue { .. })));
    }

    #[tokio::test]
    async fn wrong_input_type_is_an_error() {
        let h = Harness::new();
        let mut ctx = TurnContext::new(Activity::message("test", "conv-1", "user-1", "x"));
        let err = h
            .dialog
            .run_step(
                ProfileStep::Confirm,
                &mut ctx,
                &mut StepValues::default(),
                Some(PromptValue::Text("x".into())),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dialog(DialogError::UnexpectedInput { .. })));
    }
}
