//! CLI parser and command dispatch.

use crate::clock::{iso_day, today_in};
use crate::components::ButlerComponents;
use crate::dashboard;
use crate::importers::EmailPayload;
use crate::scheduler::Scheduler;
use crate::telegram::{register_webhook, run_polling, webhook_secret};
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storage::MemoryTable;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "butler")]
#[command(about = "Household butler: Telegram chat, daily briefing, importers and dashboard", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Telegram bot token; overrides BOT_TOKEN / TELEGRAM_TOKEN.
    #[arg(short, long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the dashboard and Telegram webhook (or polling when no webhook URL is set).
    Serve {
        /// Also run the cron scheduler for briefing and importers.
        #[arg(long)]
        schedule: bool,
    },
    /// Chat over Telegram long polling.
    Chat,
    /// Generate and send the daily briefing.
    Brief {
        #[arg(long, allow_hyphen_values = true)]
        chat_id: Option<i64>,
        /// Briefing day (YYYY-MM-DD); defaults to today in TIMEZONE.
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Send tomorrow's briefing to TEST_TELEGRAM_CHAT_ID.
        #[arg(long)]
        test: bool,
    },
    /// Import the weather forecast.
    Weather,
    /// Import upcoming calendar events.
    Calendar,
    /// Process a USPS Informed Delivery e-mail saved as JSON.
    Usps {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Generate fun facts for the coming week.
    FunFacts,
    /// Database maintenance.
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbCommand {
    /// Create missing tables and indexes.
    Migrate,
    /// Give rows without an id a fresh id.
    BackfillIds,
    /// Infer createdBy / tags for rows without a source.
    BackfillCreatedBy,
    /// Replace the demo table with the bundled demo household.
    PopulateDemo,
}

/// Target chat and day for `brief`.
pub fn briefing_target(
    components: &ButlerComponents,
    chat_id: Option<i64>,
    date: Option<NaiveDate>,
    test: bool,
) -> Result<(i64, NaiveDate)> {
    let today = today_in(components.config.timezone);
    if test {
        return Ok((
            components.config.require_test_chat_id()?,
            today + Duration::days(1),
        ));
    }
    let chat_id = match chat_id {
        Some(id) => id,
        None => components.config.require_chat_id()?,
    };
    Ok((chat_id, date.unwrap_or(today)))
}

pub async fn execute(command: Commands, components: ButlerComponents) -> Result<()> {
    match command {
        Commands::Serve { schedule } => serve(components, schedule).await,
        Commands::Chat => {
            let bot = components.bot()?;
            let chain = components.handler_chain(bot)?;
            run_polling(components.teloxide_bot()?, chain).await
        }
        Commands::Brief {
            chat_id,
            date,
            test,
        } => {
            let (chat_id, day) = briefing_target(&components, chat_id, date, test)?;
            let sent = components.briefing()?.send(chat_id, day).await?;
            println!("Sent briefing for {} to {} in {} message(s)", iso_day(day), chat_id, sent);
            Ok(())
        }
        Commands::Weather => {
            let days = components.weather_importer()?.run().await?;
            println!("Stored forecasts for {} day(s)", days.len());
            Ok(())
        }
        Commands::Calendar => {
            let stored = components.calendar_importer()?.run().await?;
            println!("Imported {} calendar event(s)", stored);
            Ok(())
        }
        Commands::Usps { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let email: EmailPayload =
                serde_json::from_str(&raw).context("e-mail file is not valid JSON")?;
            let today = today_in(components.config.timezone);
            let report = components.usps_processor()?.process(&email, today).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::FunFacts => {
            let today = today_in(components.config.timezone);
            let stored = components.fun_fact_generator()?.run(today).await?;
            println!("Generated and stored {} fun facts", stored);
            Ok(())
        }
        Commands::Db { command } => db(command, &components).await,
    }
}

async fn db(command: DbCommand, components: &ButlerComponents) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    match command {
        DbCommand::Migrate => {
            // The configured table was already upgraded while the components were built.
            for table in [MemoryTable::Production, MemoryTable::Demo] {
                let repo = components.memories_for(table).await?;
                let added = repo.migrate().await?;
                if !added.is_empty() {
                    println!("Added {} to {}", added.join(", "), table.name());
                }
            }
            println!("Database schema is up to date");
        }
        DbCommand::BackfillIds => {
            let report = components.memories.backfill_ids(now).await?;
            println!("Assigned ids to {} of {} row(s)", report.updated, report.scanned);
        }
        DbCommand::BackfillCreatedBy => {
            let report = components.memories.backfill_created_by(now).await?;
            println!("Set createdBy on {} of {} row(s)", report.updated, report.scanned);
        }
        DbCommand::PopulateDemo => {
            let demo = components.memories_for(MemoryTable::Demo).await?;
            let count = storage::seed::populate_demo(&demo).await?;
            println!("Inserted {} demo memories into {}", count, MemoryTable::Demo.name());
        }
    }
    Ok(())
}

/// Dashboard plus Telegram intake, and the scheduler when asked.
async fn serve(components: ButlerComponents, schedule: bool) -> Result<()> {
    components.config.validate()?;

    if schedule {
        let scheduler =
            Scheduler::from_config(&components.config.schedule, components.config.timezone)?;
        let jobs = components.clone();
        tokio::spawn(scheduler.run(move |job| {
            let jobs = jobs.clone();
            async move { jobs.run_job(job).await }
        }));
        info!("Scheduler started");
    }

    let state = components.dashboard_state();
    if state.telegram.is_some() {
        let bot = components.teloxide_bot()?;
        match components.config.telegram_webhook_url.as_deref() {
            Some(url) => {
                register_webhook(&bot, url, webhook_secret(&components.config.bot_token)).await?
            }
            None => {
                let chain = components.handler_chain(components.bot()?)?;
                tokio::spawn(async move {
                    if let Err(e) = run_polling(bot, chain).await {
                        error!(error = %e, "Polling stopped");
                    }
                });
            }
        }
    }

    dashboard::serve(&components.config.dashboard_addr, state).await
}
