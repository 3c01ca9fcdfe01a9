//! Activity payloads exchanged with the hosting channel.
//!
//! Field names follow the Bot Framework activity schema (camelCase on the
//! wire) so emulator and Web Chat payloads deserialize unchanged. Only the
//! fields this bot reads or writes are modeled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value type attached to error trace activities.
pub const ERROR_TRACE_VALUE_TYPE: &str = "https://www.botframework.com/schemas/error";

/// Kind of activity, taken from the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    Message,
    ConversationUpdate,
    Trace,
    Typing,
    EndOfConversation,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Message => "message",
            Self::ConversationUpdate => "conversationUpdate",
            Self::Trace => "trace",
            Self::Typing => "typing",
            Self::EndOfConversation => "endOfConversation",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// A user or bot taking part in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Conversation the activity belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationAccount {
    pub id: String,
}

/// A single button offered alongside a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub title: String,
    pub value: String,
}

impl CardAction {
    /// An "imBack" action: clicking it posts `value` back as user text.
    pub fn im_back(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            action_type: "imBack".to_string(),
            title: value.clone(),
            value,
        }
    }
}

/// Quick-reply buttons rendered under a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedActions {
    pub actions: Vec<CardAction>,
}

/// An inbound or outbound activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members_added: Vec<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_actions: Option<SuggestedActions>,
    // Trace-only fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl Activity {
    fn empty(kind: ActivityKind) -> Self {
        Self {
            kind,
            id: None,
            timestamp: None,
            channel_id: String::new(),
            from: None,
            recipient: None,
            conversation: None,
            text: None,
            locale: None,
            members_added: Vec::new(),
            reply_to_id: None,
            suggested_actions: None,
            name: None,
            label: None,
            value_type: None,
            value: None,
        }
    }

    /// Inbound message from `user_id` in `conversation_id`.
    pub fn message(
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            timestamp: Some(Utc::now()),
            channel_id: channel_id.into(),
            from: Some(ChannelAccount::new(user_id)),
            recipient: Some(ChannelAccount::new(crate::BOT_ID).with_name(crate::BOT_NAME)),
            conversation: Some(ConversationAccount {
                id: conversation_id.into(),
            }),
            text: Some(text.into()),
            ..Self::empty(ActivityKind::Message)
        }
    }

    /// Inbound conversationUpdate announcing `members` joined.
    pub fn members_added(
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        members: Vec<ChannelAccount>,
    ) -> Self {
        let from = members.first().cloned();
        Self {
            id: Some(Uuid::new_v4().to_string()),
            timestamp: Some(Utc::now()),
            channel_id: channel_id.into(),
            from,
            recipient: Some(ChannelAccount::new(crate::BOT_ID).with_name(crate::BOT_NAME)),
            conversation: Some(ConversationAccount {
                id: conversation_id.into(),
            }),
            members_added: members,
            ..Self::empty(ActivityKind::ConversationUpdate)
        }
    }

    /// Outbound message replying to `self`, addressed back to the sender.
    pub fn reply(&self, text: impl Into<String>) -> Activity {
        Activity {
            id: Some(Uuid::new_v4().to_string()),
            timestamp: Some(Utc::now()),
            channel_id: self.channel_id.clone(),
            from: self.recipient.clone(),
            recipient: self.from.clone(),
            conversation: self.conversation.clone(),
            text: Some(text.into()),
            locale: self.locale.clone(),
            reply_to_id: self.id.clone(),
            ..Self::empty(ActivityKind::Message)
        }
    }

    /// Outbound trace activity, visible only in developer tooling.
    pub fn trace(
        &self,
        name: impl Into<String>,
        value: serde_json::Value,
        value_type: impl Into<String>,
        label: impl Into<String>,
    ) -> Activity {
        Activity {
            id: Some(Uuid::new_v4().to_string()),
            timestamp: Some(Utc::now()),
            channel_id: self.channel_id.clone(),
            from: self.recipient.clone(),
            recipient: self.from.clone(),
            conversation: self.conversation.clone(),
            reply_to_id: self.id.clone(),
            name: Some(name.into()),
            label: Some(label.into()),
            value_type: Some(value_type.into()),
            value: Some(value),
            ..Self::empty(ActivityKind::Trace)
        }
    }

    /// Attach quick-reply buttons.
    pub fn with_suggested_actions<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggested_actions = Some(SuggestedActions {
            actions: values.into_iter().map(CardAction::im_back).collect(),
        });
        self
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation.as_ref().map(|c| c.id.as_str())
    }

    pub fn from_id(&self) -> Option<&str> {
        self.from.as_ref().map(|f| f.id.as_str())
    }

    pub fn recipient_id(&self) -> Option<&str> {
        self.recipient.as_ref().map(|r| r.id.as_str())
    }

    /// Trimmed message text, empty when absent.
    pub fn text(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or("")
    }
}
