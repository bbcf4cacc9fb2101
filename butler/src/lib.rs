//! # Household butler
//!
//! A Telegram butler backed by a SQLite notebook of memories. Wires the handler chain, the daily
//! briefing, the importers (weather, calendar, USPS mail, fun facts), the dashboard and the
//! scheduler. Config comes from env via [`BotConfig`].

pub mod briefing;
pub mod chain;
pub mod cli;
pub mod clock;
pub mod components;
pub mod config;
pub mod core;
pub mod dashboard;
pub mod directives;
pub mod handlers;
pub mod importers;
pub mod persona;
pub mod scheduler;
pub mod telegram;

pub use cli::{execute, Cli, Commands, DbCommand};

pub use core::{
    init_tracing, Bot, ButlerError, Chat, Handler, HandlerError, HandlerResponse, Message,
    MessageDirection, Result, ToCoreMessage, ToCoreUser, User,
};

pub use chain::HandlerChain;

pub use telegram::{
    build_teloxide_bot, run_polling, TelegramBotAdapter, TelegramMessageWrapper,
    TelegramUserWrapper,
};

pub use briefing::{split_message, Briefing};
pub use components::ButlerComponents;
pub use config::{BotConfig, ScheduleConfig};
pub use dashboard::{build_router, DashboardState, TelegramWebhook};
pub use directives::{parse_reply, ParsedReply};
pub use handlers::{ButlerHandler, CommandHandler, PersistenceHandler};
pub use scheduler::{Job, Scheduler};
