//! Telegram transport: adapters, Bot implementation, polling runner and webhook plumbing.

mod adapters;
mod bot_adapter;
mod runner;
mod webhook;

pub use adapters::{TelegramMessageWrapper, TelegramUserWrapper};
pub use bot_adapter::{build_teloxide_bot, TelegramBotAdapter};
pub use runner::run_polling;
pub use webhook::{parse_update, register_webhook, secret_matches, webhook_secret, SECRET_TOKEN_HEADER};
