//! Weather forecast importer (wttr.in `format=j1` JSON).
//!
//! One memory per forecast day: `weather forecast: {summary}`, where the summary is a single
//! sentence from the LLM (or the day's JSON when the model call fails).

use anyhow::{anyhow, Context, Result};
use llm_client::LlmClient;
use prompt::ChatMessage;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{MemoryRepository, NewMemory};
use tracing::{error, info, instrument};

pub const WEATHER_SOURCE: &str = "weather";
pub const FORECAST_PREFIX: &str = "weather forecast:";
const SUMMARY_MAX_TOKENS: u32 = 150;

#[derive(Debug, Deserialize)]
struct WttrResponse {
    #[serde(default)]
    weather: Vec<WttrDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WttrDay {
    date: String,
    #[serde(default, rename = "maxtempF")]
    max_temp_f: String,
    #[serde(default, rename = "mintempF")]
    min_temp_f: String,
    #[serde(default)]
    hourly: Vec<WttrHour>,
}

#[derive(Debug, Deserialize)]
struct WttrHour {
    #[serde(default)]
    time: String,
    #[serde(default, rename = "tempF")]
    temp_f: String,
    #[serde(default)]
    chanceofrain: String,
    #[serde(default)]
    chanceofsnow: String,
    #[serde(default, rename = "weatherDesc")]
    weather_desc: Vec<WttrValue>,
}

#[derive(Debug, Deserialize)]
struct WttrValue {
    #[serde(default)]
    value: String,
}

/// The per-day shape handed to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: String,
    pub high_temp: String,
    pub low_temp: String,
    pub hourly: Vec<HourSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourSummary {
    pub time: String,
    pub temp: String,
    pub chance_of_rain: String,
    pub chance_of_snow: String,
    pub desc: String,
}

impl From<WttrDay> for DaySummary {
    fn from(day: WttrDay) -> Self {
        Self {
            date: day.date,
            high_temp: day.max_temp_f,
            low_temp: day.min_temp_f,
            hourly: day
                .hourly
                .into_iter()
                .map(|hour| HourSummary {
                    time: hour.time,
                    temp: hour.temp_f,
                    chance_of_rain: hour.chanceofrain,
                    chance_of_snow: hour.chanceofsnow,
                    desc: hour
                        .weather_desc
                        .into_iter()
                        .map(|d| d.value)
                        .collect::<Vec<_>>()
                        .join(", "),
                })
                .collect(),
        }
    }
}

impl DaySummary {
    /// `YYYY-MM-DD` key the forecast memory is stored under.
    pub fn day(&self) -> &str {
        let date = self.date.trim();
        date.get(..10).unwrap_or(date)
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

fn summary_prompt(day: &DaySummary) -> String {
    let data = serde_json::to_string_pretty(day).unwrap_or_else(|_| day.to_json());
    format!(
        r#"You are a weather forecaster. Create a very concise summary of this weather forecast data.
Include the high and low temperatures and a brief summary of the overall weather conditions throughout the day.
The summary should be helpful for someone planning their day: mention any precipitation, temperature changes, or other notable patterns.
Keep it under 25 words if possible, no more than one sentence. Do not include the date.

Examples:
- "High of 50, low of 31, clear and sunny all day."
- "High of 80, low of 50, cool and clear morning, warmer afternoon with scattered showers starting around 2pm."

Weather data:
{data}

Your concise summary:"#
    )
}

/// Strips an echoed "Your concise summary:" label and one pair of wrapping quotes.
pub fn clean_summary(raw: &str) -> String {
    const LABEL: &str = "your concise summary:";
    let mut summary = raw.trim();
    if summary
        .get(..LABEL.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(LABEL))
    {
        summary = summary[LABEL.len()..].trim();
    }
    let summary = summary
        .strip_prefix(['"', '\''])
        .unwrap_or(summary);
    let summary = summary
        .strip_suffix(['"', '\''])
        .unwrap_or(summary);
    summary.trim().to_string()
}

#[derive(Clone)]
pub struct WeatherImporter {
    http: reqwest::Client,
    memories: MemoryRepository,
    llm: Arc<dyn LlmClient>,
    api_url: String,
    location: String,
}

impl WeatherImporter {
    pub fn new(
        http: reqwest::Client,
        memories: MemoryRepository,
        llm: Arc<dyn LlmClient>,
        api_url: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            http,
            memories,
            llm,
            api_url: api_url.into(),
            location: location.into(),
        }
    }

    fn forecast_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.api_url)
            .with_context(|| format!("invalid weather API URL {:?}", self.api_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("weather API URL cannot be a base: {}", self.api_url))?
            .pop_if_empty()
            .push(&self.location);
        url.query_pairs_mut().append_pair("format", "j1");
        Ok(url)
    }

    /// Downloads the forecast and reduces it to one [`DaySummary`] per day.
    pub async fn fetch(&self) -> Result<Vec<DaySummary>> {
        let url = self.forecast_url()?;
        info!(url = %url, "step: fetching weather forecast");
        let response: WttrResponse = self
            .http
            .get(url)
            .send()
            .await
            .context("weather request failed")?
            .error_for_status()
            .context("weather service returned an error")?
            .json()
            .await
            .context("weather response was not valid JSON")?;
        Ok(response.weather.into_iter().map(DaySummary::from).collect())
    }

    async fn summarize(&self, day: &DaySummary) -> String {
        let result = self
            .llm
            .complete(
                "",
                vec![ChatMessage::user(summary_prompt(day))],
                Some(SUMMARY_MAX_TOKENS),
            )
            .await;
        match result {
            Ok(raw) => {
                let summary = clean_summary(&raw);
                if summary.is_empty() {
                    day.to_json()
                } else {
                    summary
                }
            }
            Err(e) => {
                error!(date = %day.day(), error = %e, "Weather summary failed, storing raw forecast");
                day.to_json()
            }
        }
    }

    /// Replaces each forecast day's `weather forecast:` memory. Returns the days imported.
    #[instrument(skip(self), fields(location = %self.location))]
    pub async fn run(&self) -> Result<Vec<DaySummary>> {
        let days = self.fetch().await?;

        for day in &days {
            let summary = self.summarize(day).await;
            let date = day.day().to_string();
            self.memories
                .delete_by_date_and_text_prefix(&date, FORECAST_PREFIX)
                .await?;
            self.memories
                .create(
                    NewMemory::new(format!("{FORECAST_PREFIX} {summary}"))
                        .with_date(Some(date.clone()))
                        .created_by(WEATHER_SOURCE)
                        .with_tags(WEATHER_SOURCE),
                )
                .await?;
            info!(date = %date, summary = %summary, "Stored weather forecast");
        }

        info!(days = days.len(), "Weather forecast updated");
        Ok(days)
    }
}
