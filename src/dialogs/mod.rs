//! Dialogs: the order waterfall and the prompt machinery it runs on.
//!
//! Each step of the waterfall either asks the user something (and the turn
//! ends) or hands a value straight to the next step. The dialog's position
//! and collected values live in conversation state, so a conversation
//! resumes exactly where it left off on the next message.

pub mod messages;
pub mod prompts;
pub mod user_profile;
pub mod waterfall;

pub use messages::{Locale, Messages};
pub use prompts::{PromptKind, PromptSpec, PromptValue, Recognized, age_prompt_validator};
pub use user_profile::{USER_PROFILE_DIALOG, UserProfileDialog};
pub use waterfall::{DialogState, DialogTurnStatus, ProfileStep, StepResult, StepValues, Waterfall};
