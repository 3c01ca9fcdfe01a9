//! Conversation- and user-scoped state with typed property accessors.
//!
//! A `BotState` maps the current turn to one storage record (for example
//! `emulator/conversations/<id>`). The record is read once per turn into the
//! `TurnContext` cache, property accessors read and write fields of the cached
//! record, and `save_changes` writes it back only when something changed.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::activity::Activity;
use crate::error::StateError;
use crate::state::storage::Storage;
use crate::turn::{CachedState, TurnContext};

/// Which identity a state record is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateScope {
    Conversation,
    User,
}

impl StateScope {
    /// Name used for the per-turn cache slot.
    fn cache_name(self) -> &'static str {
        match self {
            Self::Conversation => "ConversationState",
            Self::User => "UserState",
        }
    }

    fn segment(self) -> &'static str {
        match self {
            Self::Conversation => "conversations",
            Self::User => "users",
        }
    }

    /// Storage key for the record this scope owns in `activity`.
    pub fn storage_key(self, activity: &Activity) -> Result<String, StateError> {
        let missing = |field: &str| StateError::MissingIdentity {
            scope: self.to_string(),
            field: field.to_string(),
        };

        if activity.channel_id.is_empty() {
            return Err(missing("channelId"));
        }
        let owner = match self {
            Self::Conversation => activity
                .conversation_id()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| missing("conversation.id"))?,
            Self::User => activity
                .from_id()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| missing("from.id"))?,
        };
        Ok(self.key_for(&activity.channel_id, owner))
    }

    /// Storage key for an explicit channel and owner id.
    pub fn key_for(self, channel_id: &str, owner_id: &str) -> String {
        format!("{}/{}/{}", channel_id, self.segment(), owner_id)
    }
}

impl std::fmt::Display for StateScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conversation => write!(f, "conversation"),
            Self::User => write!(f, "user"),
        }
    }
}

/// State for one scope, backed by a shared `Storage`.
#[derive(Clone)]
pub struct BotState {
    storage: Arc<dyn Storage>,
    scope: StateScope,
}

impl BotState {
    pub fn new(storage: Arc<dyn Storage>, scope: StateScope) -> Self {
        Self { storage, scope }
    }

    /// Conversation-scoped state.
    pub fn conversation(storage: Arc<dyn Storage>) -> Self {
        Self::new(storage, StateScope::Conversation)
    }

    /// User-scoped state.
    pub fn user(storage: Arc<dyn Storage>) -> Self {
        Self::new(storage, StateScope::User)
    }

    /// Typed accessor for one property of this scope's record.
    pub fn create_property<T>(&self, name: &str) -> StatePropertyAccessor<T> {
        StatePropertyAccessor {
            state: self.clone(),
            name: name.to_string(),
            _marker: PhantomData,
        }
    }

    /// Read the record into the turn cache. Skipped if already cached unless `force`.
    pub async fn load(&self, ctx: &mut TurnContext, force: bool) -> Result<(), StateError> {
        let name = self.scope.cache_name();
        if !force && ctx.state_cache.contains_key(name) {
            return Ok(());
        }

        let key = self.scope.storage_key(ctx.activity())?;
        let record = match self.storage.read(&key).await? {
            Some(serde_json::Value::Object(map)) => map,
            Some(other) => {
                tracing::warn!(key = %key, found = %other, "State record is not an object, starting fresh");
                serde_json::Map::new()
            }
            None => serde_json::Map::new(),
        };
        ctx.state_cache
            .insert(name.to_string(), CachedState::new(record));
        Ok(())
    }

    /// Write the cached record if it changed (or always, with `force`).
    ///
    /// Returns whether a write happened.
    pub async fn save_changes(&self, ctx: &mut TurnContext, force: bool) -> Result<bool, StateError> {
        let key = match self.scope.storage_key(ctx.activity()) {
            Ok(key) => key,
            // Nothing could have been loaded without a key.
            Err(_) if !ctx.state_cache.contains_key(self.scope.cache_name()) => return Ok(false),
            Err(e) => return Err(e),
        };
        let Some(cached) = ctx.state_cache.get_mut(self.scope.cache_name()) else {
            return Ok(false);
        };
        if !force && !cached.is_changed() {
            return Ok(false);
        }

        let value = serde_json::Value::Object(cached.record.clone());
        self.storage.write(&key, &value).await?;
        cached.mark_saved();
        tracing::debug!(key = %key, "Saved state");
        Ok(true)
    }

    /// Drop the cached record and delete it from storage right away.
    pub async fn delete(&self, ctx: &mut TurnContext) -> Result<(), StateError> {
        ctx.state_cache.remove(self.scope.cache_name());
        let key = self.scope.storage_key(ctx.activity())?;
        let removed = self.storage.delete(&key).await?;
        tracing::debug!(key = %key, removed, "Deleted state");
        Ok(())
    }

    /// Read one property straight from storage, outside of any turn.
    pub async fn read_property<T: DeserializeOwned>(
        &self,
        channel_id: &str,
        owner_id: &str,
        property: &str,
    ) -> Result<Option<T>, StateError> {
        let key = self.scope.key_for(channel_id, owner_id);
        let Some(record) = self.storage.read(&key).await? else {
            return Ok(None);
        };
        match record.get(property) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| StateError::Serialization {
                    property: property.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    async fn cached<'a>(
        &self,
        ctx: &'a mut TurnContext,
    ) -> Result<&'a mut CachedState, StateError> {
        self.load(ctx, false).await?;
        Ok(ctx
            .state_cache
            .entry(self.scope.cache_name().to_string())
            .or_insert_with(|| CachedState::new(serde_json::Map::new())))
    }
}

/// Typed handle to a single property inside a `BotState` record.
pub struct StatePropertyAccessor<T> {
    state: BotState,
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for StatePropertyAccessor<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> StatePropertyAccessor<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Read the property, storing and returning `default()` if it is absent.
    pub async fn get<F>(&self, ctx: &mut TurnContext, default: F) -> Result<T, StateError>
    where
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get_optional(ctx).await? {
            return Ok(value);
        }
        let value = default();
        self.set(ctx, &value).await?;
        Ok(value)
    }

    /// Read the property if present.
    pub async fn get_optional(&self, ctx: &mut TurnContext) -> Result<Option<T>, StateError> {
        let cached = self.state.cached(ctx).await?;
        match cached.record.get(&self.name) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| self.serialization_error(e)),
            None => Ok(None),
        }
    }

    /// Replace the property in the turn cache.
    pub async fn set(&self, ctx: &mut TurnContext, value: &T) -> Result<(), StateError> {
        let json = serde_json::to_value(value).map_err(|e| self.serialization_error(e))?;
        let cached = self.state.cached(ctx).await?;
        cached.record.insert(self.name.clone(), json);
        Ok(())
    }

    /// Remove the property from the turn cache.
    pub async fn delete(&self, ctx: &mut TurnContext) -> Result<(), StateError> {
        let cached = self.state.cached(ctx).await?;
        cached.record.remove(&self.name);
        Ok(())
    }

    fn serialization_error(&self, e: serde_json::Error) -> StateError {
        StateError::Serialization {
            property: self.name.clone(),
            reason: e.to_string(),
        }
    }
}
