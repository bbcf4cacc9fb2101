//! Weekly fun-fact generator: one short fact per day for the coming week.

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use llm_client::LlmClient;
use prompt::ChatMessage;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use storage::{MemoryRepository, NewMemory};
use tracing::{error, info, instrument, warn};

pub const FUN_FACT_TAG: &str = "fun_fact";
pub const FUN_FACT_SOURCE: &str = "fun_fact_generator";
pub const FACT_DAYS: i64 = 7;
const PREVIOUS_FACTS_LIMIT: i64 = 50;
const FACTS_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunFact {
    pub date: String,
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl FunFact {
    fn new(date: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            text: text.into(),
            category: None,
        }
    }
}

fn facts_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<facts>(.*?)</facts>").expect("static regex"))
}

fn date_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)(\d{4}-\d{2}-\d{2})["']?[,:]?\s*["']?(.*?)["']?[,}]"#)
            .expect("static regex")
    })
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("static regex"))
}

fn sentence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^.!?]+[.!?]+").expect("static regex"))
}

fn strip_quotes(s: &str) -> String {
    s.replace(['"', '\''], "").trim().to_string()
}

/// Extracts facts from a model reply.
///
/// The JSON array inside `<facts>` is preferred. If that block is present but not valid JSON the
/// whole reply is scanned for date/text pairs, then for a date line followed by a text line, and
/// finally split into sentences assigned to `expected_dates` in order. A reply without a
/// `<facts>` block yields nothing.
pub fn parse_facts(response: &str, expected_dates: &[String]) -> Vec<FunFact> {
    let Some(caps) = facts_block_regex().captures(response) else {
        error!("Model reply has no <facts> block");
        return Vec::new();
    };

    match serde_json::from_str::<Vec<FunFact>>(caps[1].trim()) {
        Ok(facts) => facts,
        Err(e) => {
            warn!(error = %e, "Facts JSON did not parse, using fallback parsing");
            parse_fallback(response, expected_dates)
        }
    }
}

fn parse_fallback(response: &str, expected_dates: &[String]) -> Vec<FunFact> {
    let facts: Vec<FunFact> = date_text_regex()
        .captures_iter(response)
        .map(|c| FunFact::new(&c[1], c[2].trim()))
        .filter(|f| !f.text.is_empty())
        .collect();
    if !facts.is_empty() {
        return facts;
    }

    let mut facts = Vec::new();
    let mut current_date: Option<String> = None;
    for line in response.lines().map(str::trim) {
        if let Some(m) = date_regex().find(line) {
            current_date = Some(m.as_str().to_string());
        } else if line.chars().count() > 10 {
            if let Some(date) = current_date.take() {
                facts.push(FunFact::new(date, strip_quotes(line)));
            }
        }
    }
    if !facts.is_empty() {
        return facts;
    }

    sentence_regex()
        .find_iter(response)
        .zip(expected_dates)
        .filter_map(|(sentence, date)| {
            let text = strip_quotes(sentence.as_str());
            (text.chars().count() > 10).then(|| FunFact::new(date.clone(), text))
        })
        .collect()
}

/// `today` and the following six days, `YYYY-MM-DD`.
pub fn fact_dates(today: NaiveDate) -> Vec<String> {
    (0..FACT_DAYS)
        .map(|i| (today + Duration::days(i)).format("%Y-%m-%d").to_string())
        .collect()
}

fn facts_prompt(previous: &str, today: NaiveDate, dates: &[String]) -> String {
    format!(
        r#"Generate 7 unique fun facts, one for each of the next 7 days. Each fact should be brief (1-2 sentences) and relate to one of these categories:

1. Early childhood development (today is {today})
2. Cute animals: capybaras, border collies, elephants or penguins
3. Plants: monsteras, orchids, ficus or other common houseplants

Requirements:
- Each fact must be interesting, educational and suitable for formal communication
- Keep each fact to 1-2 sentences
- Vary the categories across the 7 days
- Ensure facts are scientifically accurate
- Do not repeat any previous fact from this list:

{previous}

FORMAT YOUR RESPONSE AS STRUCTURED JSON INSIDE XML TAGS:
<facts>
[
  {{
    "date": "YYYY-MM-DD",
    "text": "The fun fact text here",
    "category": "child" | "animal" | "plant"
  }}
]
</facts>

Use these dates for the 7 facts:
{dates}"#,
        today = today.format("%Y-%m-%d"),
        dates = dates.join("\n"),
    )
}

#[derive(Clone)]
pub struct FunFactGenerator {
    memories: MemoryRepository,
    llm: Arc<dyn LlmClient>,
}

impl FunFactGenerator {
    pub fn new(memories: MemoryRepository, llm: Arc<dyn LlmClient>) -> Self {
        Self { memories, llm }
    }

    async fn previous_facts(&self) -> Result<String> {
        let previous = self
            .memories
            .recent_by_tag(FUN_FACT_TAG, PREVIOUS_FACTS_LIMIT)
            .await
            .context("failed to load previous fun facts")?;
        Ok(previous
            .iter()
            .map(|m| format!("- {}: {}", m.day().unwrap_or_default(), m.text))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Generates facts for the week starting `today` and replaces any stored for those dates.
    /// Returns the number of facts stored.
    #[instrument(skip(self))]
    pub async fn run(&self, today: NaiveDate) -> Result<usize> {
        let dates = fact_dates(today);
        let previous = self.previous_facts().await?;

        let response = self
            .llm
            .complete(
                "",
                vec![ChatMessage::user(facts_prompt(&previous, today, &dates))],
                Some(FACTS_MAX_TOKENS),
            )
            .await
            .context("fun fact generation failed")?;

        let facts = parse_facts(&response, &dates);
        if facts.is_empty() {
            bail!("Failed to generate fun facts");
        }

        for date in &dates {
            self.memories
                .delete_by_date_and_tag(date, FUN_FACT_TAG)
                .await?;
        }
        for fact in &facts {
            self.memories
                .create(
                    NewMemory::new(format!("fun fact: {}", fact.text))
                        .with_date(Some(fact.date.clone()))
                        .created_by(FUN_FACT_SOURCE)
                        .with_tags(FUN_FACT_TAG),
                )
                .await?;
        }

        info!(count = facts.len(), "Generated and stored fun facts");
        Ok(facts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates() -> Vec<String> {
        fact_dates(NaiveDate::from_ymd_opt(2025, 4, 11).unwrap())
    }

    #[test]
    fn test_fact_dates_cover_a_week() {
        let dates = dates();
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], "2025-04-11");
        assert_eq!(dates[6], "2025-04-17");
    }

    #[test]
    fn test_parses_facts_json() {
        let reply = r#"Here you are.
<facts>
[
  {"date": "2025-04-11", "text": "Capybaras can sleep in water.", "category": "animal"},
  {"date": "2025-04-12", "text": "Orchids can live for decades.", "category": "plant"}
]
</facts>"#;
        let facts = parse_facts(reply, &dates());
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].date, "2025-04-11");
        assert_eq!(facts[1].text, "Orchids can live for decades.");
        assert_eq!(facts[1].category.as_deref(), Some("plant"));
    }

    #[test]
    fn test_missing_block_yields_nothing() {
        assert!(parse_facts("Capybaras can sleep in water.", &dates()).is_empty());
    }

    #[test]
    fn test_fallback_date_text_pairs() {
        let reply = r#"<facts>{"2025-04-11": "Capybaras can sleep in water.", "2025-04-12": "Penguins propose with pebbles."}</facts>"#;
        let facts = parse_facts(reply, &dates());
        assert_eq!(
            facts,
            vec![
                FunFact::new("2025-04-11", "Capybaras can sleep in water."),
                FunFact::new("2025-04-12", "Penguins propose with pebbles."),
            ]
        );
    }

    #[test]
    fn test_fallback_date_then_line() {
        let reply = "<facts>\nDay one 2025-04-11\n\"Capybaras can sleep in water.\"\n2025-04-12\nPenguins propose with pebbles.\n</facts>";
        let facts = parse_facts(reply, &dates());
        assert_eq!(
            facts,
            vec![
                FunFact::new("2025-04-11", "Capybaras can sleep in water."),
                FunFact::new("2025-04-12", "Penguins propose with pebbles."),
            ]
        );
    }

    #[test]
    fn test_fallback_sentences_follow_expected_dates() {
        let reply = "<facts>Capybaras can sleep in water. Ok. Penguins propose with pebbles!</facts>";
        let facts = parse_facts(reply, &dates());
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].date, "2025-04-11");
        assert!(facts[0].text.ends_with("Capybaras can sleep in water."));
        // The short middle sentence is dropped but still consumes its date.
        assert_eq!(facts[1].date, "2025-04-13");
        assert_eq!(facts[1].text, "Penguins propose with pebbles!");
    }
}
