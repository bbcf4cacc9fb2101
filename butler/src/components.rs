//! Component factory: builds repositories, clients and jobs from [`BotConfig`].
//!
//! Storage is opened eagerly; everything that needs a credential (bot token, LLM key, calendar
//! token) is built on demand so commands that do not need it still run without it.

use crate::briefing::Briefing;
use crate::chain::HandlerChain;
use crate::clock::today_in;
use crate::config::BotConfig;
use crate::core::Bot;
use crate::dashboard::{DashboardState, TelegramWebhook};
use crate::handlers::{ButlerHandler, CommandHandler, PersistenceHandler};
use crate::importers::{CalendarImporter, FunFactGenerator, UspsProcessor, WeatherImporter};
use crate::scheduler::Job;
use crate::telegram::{build_teloxide_bot, webhook_secret, TelegramBotAdapter};
use anyhow::{Context, Result};
use llm_client::{LlmClient, OpenAILlmClient};
use std::sync::Arc;
use storage::{ChatRepository, MemoryRepository, MemoryTable, SqlitePoolManager};
use tracing::{error, info, instrument};

#[derive(Clone)]
pub struct ButlerComponents {
    pub config: BotConfig,
    pub pool: SqlitePoolManager,
    pub memories: MemoryRepository,
    pub chats: ChatRepository,
    pub http: reqwest::Client,
}

impl ButlerComponents {
    /// Opens the database (creating tables as needed) and the shared HTTP client.
    #[instrument(skip(config), fields(database_url = %config.database_url, table = %config.memory_table.name()))]
    pub async fn build(config: BotConfig) -> Result<Self> {
        let pool = SqlitePoolManager::new(&config.database_url)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to open database");
                anyhow::anyhow!("Failed to open database {}: {}", config.database_url, e)
            })?;
        let memories = MemoryRepository::with_pool(pool.clone(), config.memory_table)
            .await
            .context("Failed to initialize memory table")?;
        let chats = ChatRepository::with_pool(pool.clone())
            .await
            .context("Failed to initialize chat table")?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("butler/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        info!("Components ready");
        Ok(Self {
            config,
            pool,
            memories,
            chats,
            http,
        })
    }

    /// A repository on the same database bound to another table.
    pub async fn memories_for(&self, table: MemoryTable) -> Result<MemoryRepository> {
        Ok(MemoryRepository::with_pool(self.pool.clone(), table).await?)
    }

    /// Chat model client.
    pub fn llm(&self) -> Result<Arc<dyn LlmClient>> {
        let config = self.config.require_llm()?;
        Ok(Arc::new(OpenAILlmClient::from_config(config)))
    }

    /// Client for the (possibly larger) briefing model.
    pub fn briefing_llm(&self) -> Result<Arc<dyn LlmClient>> {
        let config = self.config.require_llm()?;
        Ok(Arc::new(
            OpenAILlmClient::from_config(config).with_model(config.briefing_model.clone()),
        ))
    }

    pub fn teloxide_bot(&self) -> Result<teloxide::Bot> {
        let token = self.config.require_bot_token()?;
        Ok(build_teloxide_bot(
            token,
            self.config.telegram_api_url.as_deref(),
        ))
    }

    pub fn bot(&self) -> Result<Arc<dyn Bot>> {
        Ok(Arc::new(TelegramBotAdapter::new(self.teloxide_bot()?)))
    }

    /// Persistence → commands → butler reply.
    pub fn handler_chain(&self, bot: Arc<dyn Bot>) -> Result<HandlerChain> {
        let butler = ButlerHandler::new(
            self.memories.clone(),
            self.chats.clone(),
            self.llm()?,
            bot.clone(),
            self.config.timezone,
        );
        Ok(HandlerChain::new()
            .add_handler(Arc::new(PersistenceHandler::new(self.chats.clone())))
            .add_handler(Arc::new(CommandHandler::new(bot)))
            .add_handler(Arc::new(butler)))
    }

    pub fn briefing(&self) -> Result<Briefing> {
        Ok(Briefing::new(
            self.memories.clone(),
            self.chats.clone(),
            self.briefing_llm()?,
            self.bot()?,
        ))
    }

    pub fn weather_importer(&self) -> Result<WeatherImporter> {
        Ok(WeatherImporter::new(
            self.http.clone(),
            self.memories.clone(),
            self.llm()?,
            self.config.weather_api_url.clone(),
            self.config.weather_location.clone(),
        ))
    }

    pub fn calendar_importer(&self) -> Result<CalendarImporter> {
        let (calendar_id, token) = self.config.require_calendar()?;
        Ok(CalendarImporter::new(
            self.http.clone(),
            self.memories.clone(),
            self.config.google_calendar_api_url.clone(),
            calendar_id,
            token,
            self.config.timezone,
        ))
    }

    pub fn usps_processor(&self) -> Result<UspsProcessor> {
        Ok(UspsProcessor::new(self.memories.clone(), self.llm()?))
    }

    pub fn fun_fact_generator(&self) -> Result<FunFactGenerator> {
        Ok(FunFactGenerator::new(self.memories.clone(), self.llm()?))
    }

    /// Dashboard state. The webhook needs a bot token and an LLM key, USPS an LLM key; routes
    /// whose dependencies are missing answer with an error instead.
    pub fn dashboard_state(&self) -> DashboardState {
        let mut state = DashboardState::new(
            self.memories.clone(),
            self.config.static_dir.clone(),
            self.config.image_dir.clone(),
            self.config.timezone,
        );
        match self.bot().and_then(|bot| self.handler_chain(bot)) {
            Ok(chain) => {
                state = state.with_telegram(TelegramWebhook {
                    chain,
                    secret: webhook_secret(&self.config.bot_token),
                })
            }
            Err(e) => info!(reason = %e, "Telegram webhook disabled"),
        }
        match self.usps_processor() {
            Ok(usps) => state = state.with_usps(usps),
            Err(e) => info!(reason = %e, "USPS hook disabled"),
        }
        state
    }

    /// Runs one scheduled job to completion.
    #[instrument(skip(self), fields(job = job.name()))]
    pub async fn run_job(&self, job: Job) -> Result<()> {
        let today = today_in(self.config.timezone);
        match job {
            Job::Briefing => {
                let chat_id = self.config.require_chat_id()?;
                self.briefing()?.send(chat_id, today).await?;
            }
            Job::Weather => {
                self.weather_importer()?.run().await?;
            }
            Job::Calendar => {
                self.calendar_importer()?.run().await?;
            }
            Job::FunFacts => {
                self.fun_fact_generator()?.run(today).await?;
            }
        }
        Ok(())
    }
}
