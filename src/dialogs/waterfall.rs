//! Waterfall controller: a linear list of steps driven across turns.
//!
//! The dialog's position is an explicit `ProfileStep` plus a value bag,
//! serialized into conversation state between turns. A step either prompts
//! (the controller records the pending prompt and returns), advances
//! immediately with a value, or ends the dialog. The next inbound message is
//! recognized against the pending prompt and, if accepted, becomes the input
//! of the following step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DialogError, Result};
use crate::state::StatePropertyAccessor;
use crate::turn::TurnContext;

use super::prompts::{PendingPrompt, PromptSpec, PromptValue};

/// Steps of the order waterfall, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStep {
    Name,
    Size,
    AgeConsent,
    Age,
    Confirm,
    Summary,
}

impl ProfileStep {
    pub fn first() -> Self {
        Self::Name
    }

    /// The step after this one, if any.
    pub fn next(&self) -> Option<ProfileStep> {
        use ProfileStep::*;
        match self {
            Name => Some(Size),
            Size => Some(AgeConsent),
            AgeConsent => Some(Age),
            Age => Some(Confirm),
            Confirm => Some(Summary),
            Summary => None,
        }
    }
}

impl std::fmt::Display for ProfileStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Size => "size",
            Self::AgeConsent => "age_consent",
            Self::Age => "age",
            Self::Confirm => "confirm",
            Self::Summary => "summary",
        };
        write!(f, "{s}")
    }
}

/// Values accumulated by the steps of one dialog run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
}

/// One running waterfall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogInstance {
    pub dialog_id: String,
    /// Step that is running, or whose prompt is pending.
    pub step: ProfileStep,
    pub values: StepValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingPrompt>,
    pub started_at: DateTime<Utc>,
}

impl DialogInstance {
    pub fn new(dialog_id: impl Into<String>) -> Self {
        Self {
            dialog_id: dialog_id.into(),
            step: ProfileStep::first(),
            values: StepValues::default(),
            pending: None,
            started_at: Utc::now(),
        }
    }
}

/// Persisted dialog state for a conversation. At most one instance is active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<DialogInstance>,
}

/// What a step asks the controller to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// Send the prompt and wait for the next turn.
    Prompt(PromptSpec),
    /// Run the next step now with this value as its input.
    Next(PromptValue),
    /// Finish the dialog.
    End,
}

/// Where the dialog stands after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogTurnStatus {
    /// No dialog was active.
    Empty,
    /// Suspended on a prompt.
    Waiting,
    /// The dialog ended this turn.
    Complete,
}

/// A waterfall dialog: supplies the step bodies, inherits the sequencing.
#[async_trait]
pub trait Waterfall: Send + Sync {
    /// Identifier recorded on every instance of this dialog.
    fn dialog_id(&self) -> &str;

    /// Execute one step. `input` is the accepted answer to the previous
    /// step's prompt, or the value it advanced with.
    async fn run_step(
        &self,
        step: ProfileStep,
        ctx: &mut TurnContext,
        values: &mut StepValues,
        input: Option<PromptValue>,
    ) -> Result<StepResult>;

    /// Start a new instance at the first step.
    ///
    /// If one is already active it is left untouched and its pending prompt
    /// is asked again.
    async fn begin_dialog(
        &self,
        ctx: &mut TurnContext,
        state: &mut DialogState,
    ) -> Result<DialogTurnStatus> {
        if let Some(active) = &state.active {
            tracing::warn!(
                dialog = %active.dialog_id,
                step = %active.step,
                "Dialog already active, not starting another"
            );
            if let Some(pending) = &active.pending {
                let activity = pending.spec.render(ctx.activity(), false);
                ctx.send_activity(activity);
            }
            return Ok(DialogTurnStatus::Waiting);
        }

        let instance = DialogInstance::new(self.dialog_id());
        tracing::info!(
            dialog = %instance.dialog_id,
            conversation_id = ctx.activity().conversation_id().unwrap_or(""),
            "Starting dialog"
        );
        self.run_from(ctx, state, instance, None).await
    }

    /// Feed this turn's message to the active instance.
    async fn continue_dialog(
        &self,
        ctx: &mut TurnContext,
        state: &mut DialogState,
    ) -> Result<DialogTurnStatus> {
        let Some(mut instance) = state.active.take() else {
            return Ok(DialogTurnStatus::Empty);
        };

        let Some(mut pending) = instance.pending.take() else {
            // Nothing to answer; re-run the recorded step from scratch.
            tracing::warn!(step = %instance.step, "Active dialog had no pending prompt");
            return self.run_from(ctx, state, instance, None).await;
        };

        match pending.spec.kind.evaluate(ctx.activity().text()) {
            Some(answer) => {
                tracing::debug!(step = %instance.step, answer = %answer, "Prompt answered");
                let next = instance
                    .step
                    .next()
                    .ok_or_else(|| DialogError::StepExhausted {
                        step: instance.step.to_string(),
                    })?;
                instance.step = next;
                self.run_from(ctx, state, instance, Some(answer)).await
            }
            None => {
                pending.attempts += 1;
                tracing::debug!(
                    step = %instance.step,
                    attempts = pending.attempts,
                    "Prompt answer rejected, retrying"
                );
                let activity = pending.spec.render(ctx.activity(), true);
                ctx.send_activity(activity);
                instance.pending = Some(pending);
                state.active = Some(instance);
                Ok(DialogTurnStatus::Waiting)
            }
        }
    }

    /// Run steps starting at `instance.step` until one prompts or the dialog ends.
    async fn run_from(
        &self,
        ctx: &mut TurnContext,
        state: &mut DialogState,
        mut instance: DialogInstance,
        mut input: Option<PromptValue>,
    ) -> Result<DialogTurnStatus> {
        loop {
            let step = instance.step;
            match self
                .run_step(step, ctx, &mut instance.values, input.take())
                .await?
            {
                StepResult::Prompt(spec) => {
                    let activity = spec.render(ctx.activity(), false);
                    ctx.send_activity(activity);
                    instance.pending = Some(PendingPrompt::new(spec));
                    state.active = Some(instance);
                    return Ok(DialogTurnStatus::Waiting);
                }
                StepResult::Next(value) => {
                    let next = step.next().ok_or_else(|| DialogError::StepExhausted {
                        step: step.to_string(),
                    })?;
                    tracing::debug!(from = %step, to = %next, "Step advanced without prompting");
                    instance.step = next;
                    input = Some(value);
                }
                StepResult::End => {
                    let elapsed = Utc::now() - instance.started_at;
                    tracing::info!(
                        dialog = %instance.dialog_id,
                        step = %step,
                        elapsed_secs = elapsed.num_seconds(),
                        "Dialog complete"
                    );
                    state.active = None;
                    return Ok(DialogTurnStatus::Complete);
                }
            }
        }
    }

    /// Turn entry point: continue the active instance, or start one if none.
    ///
    /// The state property is removed once the dialog completes.
    async fn run(
        &self,
        ctx: &mut TurnContext,
        accessor: &StatePropertyAccessor<DialogState>,
    ) -> Result<DialogTurnStatus> {
        let mut state = accessor.get(ctx, DialogState::default).await?;
        let mut status = self.continue_dialog(ctx, &mut state).await?;
        if status == DialogTurnStatus::Empty {
            status = self.begin_dialog(ctx, &mut state).await?;
        }
        if state.active.is_some() {
            accessor.set(ctx, &state).await?;
        } else {
            accessor.delete(ctx).await?;
        }
        Ok(status)
    }
}
