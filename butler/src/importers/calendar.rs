//! Google Calendar importer.
//!
//! Pulls the next [`LOOKAHEAD_DAYS`] of events from the Calendar v3 REST API, drops every memory
//! previously created by this importer and stores one natural-language memory per event.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Offset, SecondsFormat, Utc};
use chrono_tz::Tz;
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use std::sync::OnceLock;
use storage::{MemoryRepository, NewMemory};
use tracing::{info, instrument, warn};

pub const CALENDAR_SOURCE: &str = "calendar";
pub const LOOKAHEAD_DAYS: i64 = 14;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarEvent {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start: Option<EventTime>,
    #[serde(default)]
    pub end: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<CalendarEvent>,
    #[serde(default)]
    next_page_token: Option<String>,
}

fn clock_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"T(\d{2}):(\d{2}):").expect("static regex"))
}

fn offset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[+-]\d{2}:\d{2}$").expect("static regex"))
}

/// Wall-clock time written in an RFC 3339 string, as `h:mm am`, without converting zones.
fn clock_time(date_time: &str) -> Option<String> {
    let caps = clock_regex().captures(date_time)?;
    let hours: u32 = caps[1].parse().ok()?;
    let period = if hours >= 12 { "pm" } else { "am" };
    let hour12 = match hours % 12 {
        0 => 12,
        h => h,
    };
    Some(format!("{hour12}:{} {period}", &caps[2]))
}

/// `America/Los_Angeles` → `los angeles time`.
fn friendly_zone_name(zone: &str) -> String {
    let city = zone.split('/').nth(1).unwrap_or(zone);
    format!("{} time", city.replacen('_', " ", 1).to_lowercase())
}

impl CalendarEvent {
    /// `YYYY-MM-DD` of the start; None when the event has no usable start.
    pub fn start_date(&self) -> Option<String> {
        let start = self.start.as_ref()?;
        if let Some(date_time) = start.date_time.as_deref() {
            return date_time.split('T').next().map(str::to_string);
        }
        start.date.clone()
    }

    /// Whether the event's zone matches `local` (same name, or same UTC offset at the event's start).
    fn is_local(zone: &str, date_time: &str, local: Tz) -> bool {
        if zone.contains('/') {
            return zone == local.name();
        }
        match DateTime::parse_from_rfc3339(date_time) {
            Ok(at) => {
                let local_offset = at.with_timezone(&local).offset().fix();
                local_offset == *at.offset()
            }
            Err(_) => false,
        }
    }

    /// Memory text for the event, e.g. `Dentist from 9:00 am - 10:00 am at Main St`.
    pub fn to_memory_text(&self, local: Tz) -> String {
        let summary = self
            .summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("Untitled event");
        let location = self.location.as_deref().filter(|l| !l.trim().is_empty());
        let Some(start) = self.start.as_ref() else {
            return summary.to_string();
        };

        if let Some(start_dt) = start.date_time.as_deref() {
            let start_time = clock_time(start_dt).unwrap_or_else(|| start_dt.to_string());
            let end_time = self
                .end
                .as_ref()
                .and_then(|e| e.date_time.as_deref())
                .and_then(clock_time);
            let mut text = match end_time {
                Some(end_time) => format!("{summary} from {start_time} - {end_time}"),
                None => format!("{summary} at {start_time}"),
            };

            let zone = start
                .time_zone
                .clone()
                .filter(|z| !z.trim().is_empty())
                .or_else(|| offset_regex().find(start_dt).map(|m| m.as_str().to_string()));
            if let Some(zone) = zone {
                if !Self::is_local(&zone, start_dt, local) {
                    if zone.contains('/') {
                        text.push_str(&format!(" ({})", friendly_zone_name(&zone)));
                    } else if offset_regex().is_match(&zone) {
                        text.push_str(&format!(" ({zone})"));
                    }
                }
            }

            if let Some(location) = location {
                text.push_str(&format!(" at {location}"));
            }
            return text;
        }

        if start.date.is_some() {
            return match location {
                Some(location) => format!("All-day event: {summary} at {location}"),
                None => format!("All-day event: {summary}"),
            };
        }

        summary.to_string()
    }
}

#[derive(Clone)]
pub struct CalendarImporter {
    http: reqwest::Client,
    memories: MemoryRepository,
    api_url: String,
    calendar_id: String,
    access_token: String,
    timezone: Tz,
}

impl CalendarImporter {
    pub fn new(
        http: reqwest::Client,
        memories: MemoryRepository,
        api_url: impl Into<String>,
        calendar_id: impl Into<String>,
        access_token: impl Into<String>,
        timezone: Tz,
    ) -> Self {
        Self {
            http,
            memories,
            api_url: api_url.into(),
            calendar_id: calendar_id.into(),
            access_token: access_token.into(),
            timezone,
        }
    }

    fn events_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.api_url)
            .with_context(|| format!("invalid calendar API URL {:?}", self.api_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("calendar API URL cannot be a base: {}", self.api_url))?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        Ok(url)
    }

    /// Every single (expanded) event starting between `from` and `from + 14 days`, in start order.
    pub async fn fetch_events(&self, from: DateTime<Utc>) -> Result<Vec<CalendarEvent>> {
        let url = self.events_url()?;
        let time_min = from.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = (from + Duration::days(LOOKAHEAD_DAYS)).to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![
                ("timeMin", time_min.clone()),
                ("timeMax", time_max.clone()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let page: EventsPage = self
                .http
                .get(url.clone())
                .bearer_auth(&self.access_token)
                .query(&query)
                .send()
                .await
                .context("calendar request failed")?
                .error_for_status()
                .context("calendar API returned an error")?
                .json()
                .await
                .context("calendar response was not valid JSON")?;

            events.extend(page.items);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(count = events.len(), "Fetched calendar events");
        Ok(events)
    }

    /// Replaces all calendar memories with the upcoming events. Returns the number stored.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<usize> {
        let events = self.fetch_events(Utc::now()).await?;

        self.memories.delete_by_creator(CALENDAR_SOURCE).await?;

        let mut stored = 0;
        for event in &events {
            let Some(date) = event.start_date() else {
                warn!(summary = ?event.summary, "Calendar event has no start, skipping");
                continue;
            };
            let text = event.to_memory_text(self.timezone);
            self.memories
                .create(
                    NewMemory::new(text.clone())
                        .with_date(Some(date.clone()))
                        .created_by(CALENDAR_SOURCE)
                        .with_tags(CALENDAR_SOURCE),
                )
                .await?;
            info!(date = %date, text = %text, "Stored calendar event");
            stored += 1;
        }

        info!(stored = stored, "Calendar events imported");
        Ok(stored)
    }
}
