//! Persistence layer: keyed storage plus conversation/user state on top.

pub mod bot_state;
pub mod libsql_backend;
pub mod migrations;
pub mod storage;

pub use bot_state::{BotState, StatePropertyAccessor, StateScope};
pub use libsql_backend::LibSqlStorage;
pub use storage::{MemoryStorage, Storage};
