//! In-process cron scheduler for `butler serve --schedule`.
//!
//! Expressions accept the standard 5-field crontab form (a seconds field of `0` is prepended) or
//! the 6/7-field form of the `cron` crate, and are evaluated in the configured timezone.
//! Due jobs run one at a time.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use tracing::{error, info};

use crate::config::ScheduleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Briefing,
    Weather,
    Calendar,
    FunFacts,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::Briefing => "briefing",
            Job::Weather => "weather",
            Job::Calendar => "calendar",
            Job::FunFacts => "fun_facts",
        }
    }
}

/// Parses a cron expression, prepending a seconds field to 5-field crontab lines.
pub fn parse_cron(expr: &str) -> Result<Schedule> {
    let expr = expr.trim();
    let normalized = if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    };
    Schedule::from_str(&normalized).with_context(|| format!("invalid cron expression {expr:?}"))
}

pub struct Scheduler {
    entries: Vec<(Job, Schedule)>,
    timezone: Tz,
}

impl Scheduler {
    pub fn from_config(config: &ScheduleConfig, timezone: Tz) -> Result<Self> {
        let entries = vec![
            (Job::Briefing, parse_cron(&config.briefing)?),
            (Job::Weather, parse_cron(&config.weather)?),
            (Job::Calendar, parse_cron(&config.calendar)?),
            (Job::FunFacts, parse_cron(&config.fun_facts)?),
        ];
        Ok(Self { entries, timezone })
    }

    /// The earliest fire time strictly after `after`, with every job due at that instant
    /// (in declaration order).
    pub fn next_due(&self, after: DateTime<Tz>) -> Option<(DateTime<Tz>, Vec<Job>)> {
        let mut best: Option<(DateTime<Tz>, Vec<Job>)> = None;
        for (job, schedule) in &self.entries {
            let Some(at) = schedule.after(&after).next() else {
                continue;
            };
            match &mut best {
                Some((best_at, jobs)) if at == *best_at => jobs.push(*job),
                Some((best_at, _)) if at > *best_at => {}
                _ => best = Some((at, vec![*job])),
            }
        }
        best
    }

    /// Sleeps until each fire time and awaits `run_job` for every due job. Job errors are logged
    /// and do not stop the loop. Returns only when no job has a future fire time.
    pub async fn run<F, Fut>(self, mut run_job: F)
    where
        F: FnMut(Job) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut cursor = Utc::now().with_timezone(&self.timezone);
        while let Some((at, jobs)) = self.next_due(cursor) {
            let wait = (at.with_timezone(&Utc) - Utc::now())
                .to_std()
                .unwrap_or_default();
            info!(
                next_run = %at,
                jobs = ?jobs.iter().map(Job::name).collect::<Vec<_>>(),
                wait_secs = wait.as_secs(),
                "Scheduler waiting"
            );
            tokio::time::sleep(wait).await;

            for job in jobs {
                info!(job = job.name(), "Scheduled job started");
                match run_job(job).await {
                    Ok(()) => info!(job = job.name(), "Scheduled job finished"),
                    Err(e) => error!(job = job.name(), error = %e, "Scheduled job failed"),
                }
            }
            cursor = at;
        }
    }
}
