//! Per-turn context: the inbound activity, buffered replies, and cached state.

use std::collections::HashMap;

use crate::activity::Activity;

/// A state record loaded for the current turn.
#[derive(Debug, Clone)]
pub(crate) struct CachedState {
    /// Current (possibly modified) record.
    pub record: serde_json::Map<String, serde_json::Value>,
    /// Serialized form as last read from or written to storage.
    pub snapshot: String,
}

impl CachedState {
    pub fn new(record: serde_json::Map<String, serde_json::Value>) -> Self {
        let snapshot = serde_json::Value::Object(record.clone()).to_string();
        Self { record, snapshot }
    }

    pub fn is_changed(&self) -> bool {
        serde_json::Value::Object(self.record.clone()).to_string() != self.snapshot
    }

    pub fn mark_saved(&mut self) {
        self.snapshot = serde_json::Value::Object(self.record.clone()).to_string();
    }
}

/// Everything one turn can see and produce.
///
/// A turn owns its inbound activity and collects outbound activities in
/// order; the adapter returns them once the turn finishes.
#[derive(Debug)]
pub struct TurnContext {
    activity: Activity,
    replies: Vec<Activity>,
    /// State records keyed by scope name (`ConversationState`, `UserState`).
    pub(crate) state_cache: HashMap<String, CachedState>,
}

impl TurnContext {
    pub fn new(activity: Activity) -> Self {
        Self {
            activity,
            replies: Vec::new(),
            state_cache: HashMap::new(),
        }
    }

    /// The inbound activity for this turn.
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Queue a plain text reply.
    pub fn send_text(&mut self, text: impl Into<String>) {
        let reply = self.activity.reply(text);
        self.send_activity(reply);
    }

    /// Queue a prepared outbound activity.
    pub fn send_activity(&mut self, activity: Activity) {
        tracing::debug!(
            kind = %activity.kind,
            text = activity.text.as_deref().unwrap_or(""),
            "Queued outbound activity"
        );
        self.replies.push(activity);
    }

    /// Queue a trace activity for developer tooling.
    pub fn send_trace(
        &mut self,
        name: &str,
        value: serde_json::Value,
        value_type: &str,
        label: &str,
    ) {
        let trace = self.activity.trace(name, value, value_type, label);
        self.send_activity(trace);
    }

    /// Outbound activities queued so far.
    pub fn replies(&self) -> &[Activity] {
        &self.replies
    }

    /// Consume the context and return all queued activities.
    pub fn into_replies(self) -> Vec<Activity> {
        self.replies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityKind;

    #[test]
    fn replies_keep_order() {
        let mut ctx = TurnContext::new(Activity::message("test", "c1", "u1", "hi"));
        ctx.send_text("first");
        ctx.send_trace("t", serde_json::json!(1), "type", "label");
        ctx.send_text("second");

        let replies = ctx.into_replies();
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0].text(), "first");
        assert_eq!(replies[1].kind, ActivityKind::Trace);
        assert_eq!(replies[2].text(), "second");
    }

    #[test]
    fn cached_state_tracks_changes() {
        let mut cached = CachedState::new(serde_json::Map::new());
        assert!(!cached.is_changed());

        cached
            .record
            .insert("k".to_string(), serde_json::json!("v"));
        assert!(cached.is_changed());

        cached.mark_saved();
        assert!(!cached.is_changed());
    }
}
