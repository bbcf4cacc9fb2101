//! Butler configuration loaded from the environment (after `.env` via dotenvy).

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use llm_client::EnvLlmConfig;
use std::env;
use storage::MemoryTable;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:butler.db";
pub const DEFAULT_LOG_FILE: &str = "logs/butler.log";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";
pub const DEFAULT_WEATHER_LOCATION: &str = "Washington, DC";
pub const DEFAULT_WEATHER_API_URL: &str = "https://wttr.in";
pub const DEFAULT_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_DASHBOARD_ADDR: &str = "0.0.0.0:3000";

/// Cron expressions (5 or 6 fields, evaluated in the configured timezone) for `serve --schedule`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub briefing: String,
    pub weather: String,
    pub calendar: String,
    pub fun_facts: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            briefing: "0 7 * * *".to_string(),
            weather: "0 5 * * *".to_string(),
            calendar: "0 * * * *".to_string(),
            fun_facts: "0 4 * * Sun".to_string(),
        }
    }
}

/// Butler configuration. Only malformed values fail [`BotConfig::load`]; missing credentials are
/// reported by the `require_*` accessors of the jobs that need them.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// Optional Telegram Bot API base URL (points the bot at a mock server in tests).
    pub telegram_api_url: Option<String>,
    /// Public URL registered with `setWebhook` on `serve`; polling is used when unset.
    pub telegram_webhook_url: Option<String>,
    pub telegram_chat_id: Option<i64>,
    pub test_telegram_chat_id: Option<i64>,
    pub database_url: String,
    pub memory_table: MemoryTable,
    pub log_file: String,
    /// None when `OPENAI_API_KEY` is not set.
    pub llm: Option<EnvLlmConfig>,
    pub timezone: Tz,
    pub weather_location: String,
    pub weather_api_url: String,
    pub google_calendar_id: Option<String>,
    pub google_calendar_access_token: Option<String>,
    pub google_calendar_api_url: String,
    pub dashboard_addr: String,
    pub static_dir: String,
    pub image_dir: String,
    pub schedule: ScheduleConfig,
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn or_default(key: &str, default: &str) -> String {
    non_empty(key).unwrap_or_else(|| default.to_string())
}

fn chat_id(key: &str) -> Result<Option<i64>> {
    non_empty(key)
        .map(|v| {
            v.trim()
                .parse::<i64>()
                .with_context(|| format!("{key} must be an integer chat id, got {v:?}"))
        })
        .transpose()
}

impl BotConfig {
    /// Loads from env. `token` overrides `BOT_TOKEN` / `TELEGRAM_TOKEN`.
    pub fn load(token: Option<String>) -> Result<Self> {
        let bot_token = token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| non_empty("BOT_TOKEN"))
            .or_else(|| non_empty("TELEGRAM_TOKEN"))
            .unwrap_or_default();

        let memory_table = match non_empty("MEMORY_TABLE") {
            Some(v) => MemoryTable::parse(&v)
                .with_context(|| format!("MEMORY_TABLE must be production or demo, got {v:?}"))?,
            None => MemoryTable::Production,
        };

        let tz_name = or_default("TIMEZONE", DEFAULT_TIMEZONE);
        let timezone: Tz = tz_name
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid TIMEZONE {tz_name:?}: {e}"))?;

        let defaults = ScheduleConfig::default();
        let schedule = ScheduleConfig {
            briefing: or_default("SCHEDULE_BRIEFING", &defaults.briefing),
            weather: or_default("SCHEDULE_WEATHER", &defaults.weather),
            calendar: or_default("SCHEDULE_CALENDAR", &defaults.calendar),
            fun_facts: or_default("SCHEDULE_FUN_FACTS", &defaults.fun_facts),
        };

        Ok(Self {
            bot_token,
            telegram_api_url: non_empty("TELEGRAM_API_URL").or_else(|| non_empty("TELOXIDE_API_URL")),
            telegram_webhook_url: non_empty("TELEGRAM_WEBHOOK_URL"),
            telegram_chat_id: chat_id("TELEGRAM_CHAT_ID")?,
            test_telegram_chat_id: chat_id("TEST_TELEGRAM_CHAT_ID")?,
            database_url: or_default("DATABASE_URL", DEFAULT_DATABASE_URL),
            memory_table,
            log_file: or_default("LOG_FILE", DEFAULT_LOG_FILE),
            llm: EnvLlmConfig::from_env().ok(),
            timezone,
            weather_location: or_default("WEATHER_LOCATION", DEFAULT_WEATHER_LOCATION),
            weather_api_url: or_default("WEATHER_API_URL", DEFAULT_WEATHER_API_URL),
            google_calendar_id: non_empty("GOOGLE_CALENDAR_ID"),
            google_calendar_access_token: non_empty("GOOGLE_CALENDAR_ACCESS_TOKEN"),
            google_calendar_api_url: or_default("GOOGLE_CALENDAR_API_URL", DEFAULT_CALENDAR_API_URL),
            dashboard_addr: or_default("DASHBOARD_ADDR", DEFAULT_DASHBOARD_ADDR),
            static_dir: or_default("STATIC_DIR", "static"),
            image_dir: or_default("IMAGE_DIR", "images"),
            schedule,
        })
    }

    /// Checks URLs, the listen address and cron expressions.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("WEATHER_API_URL", Some(self.weather_api_url.as_str())),
            ("GOOGLE_CALENDAR_API_URL", Some(self.google_calendar_api_url.as_str())),
            ("TELEGRAM_API_URL", self.telegram_api_url.as_deref()),
            ("TELEGRAM_WEBHOOK_URL", self.telegram_webhook_url.as_deref()),
        ] {
            if let Some(url) = url {
                reqwest::Url::parse(url).with_context(|| format!("{name} is not a valid URL: {url}"))?;
            }
        }
        self.dashboard_addr
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("DASHBOARD_ADDR is not a socket address: {}", self.dashboard_addr))?;
        for (name, expr) in [
            ("SCHEDULE_BRIEFING", &self.schedule.briefing),
            ("SCHEDULE_WEATHER", &self.schedule.weather),
            ("SCHEDULE_CALENDAR", &self.schedule.calendar),
            ("SCHEDULE_FUN_FACTS", &self.schedule.fun_facts),
        ] {
            crate::scheduler::parse_cron(expr).with_context(|| format!("{name} is invalid"))?;
        }
        Ok(())
    }

    pub fn require_bot_token(&self) -> Result<&str> {
        if self.bot_token.trim().is_empty() {
            bail!("BOT_TOKEN (or TELEGRAM_TOKEN) not set");
        }
        Ok(&self.bot_token)
    }

    pub fn require_llm(&self) -> Result<&EnvLlmConfig> {
        self.llm.as_ref().context("OPENAI_API_KEY not set")
    }

    pub fn require_chat_id(&self) -> Result<i64> {
        self.telegram_chat_id.context("TELEGRAM_CHAT_ID not set")
    }

    pub fn require_test_chat_id(&self) -> Result<i64> {
        self.test_telegram_chat_id
            .context("TEST_TELEGRAM_CHAT_ID not set")
    }

    /// `(calendar id, access token)` for the calendar importer.
    pub fn require_calendar(&self) -> Result<(&str, &str)> {
        let id = self
            .google_calendar_id
            .as_deref()
            .context("GOOGLE_CALENDAR_ID not set")?;
        let token = self
            .google_calendar_access_token
            .as_deref()
            .context("GOOGLE_CALENDAR_ACCESS_TOKEN not set")?;
        Ok((id, token))
    }
}
