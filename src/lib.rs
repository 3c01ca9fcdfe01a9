//! Açaí order bot: a multi-turn waterfall dialog over Bot Framework activities.

pub mod activity;
pub mod adapter;
pub mod bot;
pub mod cli;
pub mod config;
pub mod dialogs;
pub mod error;
pub mod profile;
pub mod routes;
pub mod state;
pub mod turn;

pub use error::{Error, Result};

/// Account id the bot uses for itself on outbound activities.
pub const BOT_ID: &str = "acai-bot";
/// Display name for the bot account.
pub const BOT_NAME: &str = "Açaí Bot";
