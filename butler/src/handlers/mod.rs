//! Chat handlers: persistence, slash commands and the butler reply.

mod butler_handler;
mod command_handler;
mod persistence_handler;

pub use butler_handler::{ButlerHandler, CHAT_HISTORY_LIMIT, CHAT_MAX_TOKENS, CREATED_BY_TELEGRAM};
pub use command_handler::CommandHandler;
pub use persistence_handler::PersistenceHandler;
