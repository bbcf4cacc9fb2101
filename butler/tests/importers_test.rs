//! Importer tests: weather and calendar against mockito servers, USPS and fun facts with a
//! scripted model.

mod common;

use butler::importers::{
    CalendarImporter, EmailAttachment, EmailPayload, FunFactGenerator, UspsProcessor,
    WeatherImporter,
};
use chrono::NaiveDate;
use common::{repositories, ScriptedLlm};
use mockito::Matcher;
use serde_json::json;
use storage::{Memory, MemoryRepository, NewMemory};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 11).unwrap()
}

async fn texts_on(memories: &MemoryRepository, date: &str) -> Vec<String> {
    let mut texts: Vec<String> = memories
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.day() == Some(date))
        .map(|m| m.text)
        .collect();
    texts.sort();
    texts
}

fn by_creator(all: &[Memory], creator: &str) -> Vec<Memory> {
    all.iter()
        .filter(|m| m.created_by.as_deref() == Some(creator))
        .cloned()
        .collect()
}

fn wttr_body() -> String {
    json!({
        "weather": [
            {
                "date": "2025-04-11",
                "maxtempF": "68",
                "mintempF": "49",
                "hourly": [
                    { "time": "900", "tempF": "55", "chanceofrain": "10", "chanceofsnow": "0",
                      "weatherDesc": [{ "value": "Sunny" }] }
                ]
            },
            {
                "date": "2025-04-12",
                "maxtempF": "61",
                "mintempF": "45",
                "hourly": [
                    { "time": "1500", "tempF": "58", "chanceofrain": "80", "chanceofsnow": "0",
                      "weatherDesc": [{ "value": "Light rain" }] }
                ]
            }
        ]
    })
    .to_string()
}

/// **Test: Each forecast day replaces its old forecast memory; a failed summary stores raw JSON.**
///
/// **Setup:** mockito serving two days for `/London?format=j1`; an old forecast and a dinner note on
/// the first day; model summarizes day one and fails on day two.
/// **Action:** `WeatherImporter::run()`.
/// **Expected:** Day one holds the dinner note and the new summary only; day two holds the JSON
/// forecast; both rows are created by and tagged `weather`.
#[tokio::test]
async fn test_weather_import_replaces_forecasts() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/London")
        .match_query(Matcher::UrlEncoded("format".into(), "j1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(wttr_body())
        .create_async()
        .await;

    let (memories, _) = repositories().await;
    memories
        .create(
            NewMemory::new("weather forecast: Snow all day.")
                .with_date(Some("2025-04-11".into()))
                .created_by("weather"),
        )
        .await
        .unwrap();
    memories
        .create(NewMemory::new("Dinner at the Hendersons").with_date(Some("2025-04-11".into())))
        .await
        .unwrap();

    let llm = ScriptedLlm::new();
    llm.push_reply("Your concise summary: \"High of 68, low of 49, sunny all day.\"");
    llm.push_error("overloaded");
    let importer = WeatherImporter::new(
        reqwest::Client::new(),
        memories.clone(),
        llm.clone(),
        server.url(),
        "London",
    );

    let days = importer.run().await.unwrap();

    mock.assert_async().await;
    assert_eq!(days.len(), 2);
    assert_eq!(
        texts_on(&memories, "2025-04-11").await,
        vec![
            "Dinner at the Hendersons".to_string(),
            "weather forecast: High of 68, low of 49, sunny all day.".to_string(),
        ]
    );

    let second = texts_on(&memories, "2025-04-12").await;
    assert_eq!(second.len(), 1);
    let raw = second[0].strip_prefix("weather forecast: ").unwrap();
    let parsed: serde_json::Value = serde_json::from_str(raw).unwrap();
    assert_eq!(parsed["highTemp"], "61");
    assert_eq!(parsed["hourly"][0]["desc"], "Light rain");

    let all = memories.list_all().await.unwrap();
    let weather = by_creator(&all, "weather");
    assert_eq!(weather.len(), 2);
    assert!(weather.iter().all(|m| m.tags.as_deref() == Some("weather")));

    let requests = llm.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].max_tokens, Some(150));
    assert!(requests[0].messages[0].content.contains("\"highTemp\": \"68\""));
}

#[tokio::test]
async fn test_weather_import_fails_on_http_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/London")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let (memories, _) = repositories().await;
    let importer = WeatherImporter::new(
        reqwest::Client::new(),
        memories.clone(),
        ScriptedLlm::new(),
        server.url(),
        "London",
    );

    assert!(importer.run().await.is_err());
    assert!(memories.list_all().await.unwrap().is_empty());
}

/// **Test: Calendar import follows pages, authenticates and replaces earlier calendar memories.**
///
/// **Setup:** Two event pages behind bearer auth; an old calendar memory and a chat memory stored.
/// **Action:** `CalendarImporter::run()`.
/// **Expected:** Two events stored (the one without a start is skipped); old calendar row gone;
/// chat row kept.
#[tokio::test]
async fn test_calendar_import_pages_and_replaces() {
    let mut server = mockito::Server::new_async().await;
    let first_page = server
        .mock("GET", "/calendars/primary/events")
        .match_header("authorization", "Bearer cal-token")
        .match_query(Matcher::Regex("orderBy=startTime$".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    {
                        "summary": "Dentist",
                        "location": "12 Main St",
                        "start": { "dateTime": "2025-04-14T09:00:00-04:00", "timeZone": "America/New_York" },
                        "end": { "dateTime": "2025-04-14T10:00:00-04:00", "timeZone": "America/New_York" }
                    },
                    { "summary": "Mystery entry" }
                ],
                "nextPageToken": "page-2"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let second_page = server
        .mock("GET", "/calendars/primary/events")
        .match_header("authorization", "Bearer cal-token")
        .match_query(Matcher::UrlEncoded("pageToken".into(), "page-2".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    { "summary": "School holiday", "start": { "date": "2025-04-18" }, "end": { "date": "2025-04-19" } }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (memories, _) = repositories().await;
    memories
        .create(
            NewMemory::new("Cancelled recital")
                .with_date(Some("2025-04-13".into()))
                .created_by("calendar"),
        )
        .await
        .unwrap();
    memories
        .create(NewMemory::new("Grandma visits in May").created_by("telegram"))
        .await
        .unwrap();

    let importer = CalendarImporter::new(
        reqwest::Client::new(),
        memories.clone(),
        server.url(),
        "primary",
        "cal-token",
        chrono_tz::America::New_York,
    );

    let stored = importer.run().await.unwrap();

    first_page.assert_async().await;
    second_page.assert_async().await;
    assert_eq!(stored, 2);

    let all = memories.list_all().await.unwrap();
    let mut calendar: Vec<(Option<String>, String)> = by_creator(&all, "calendar")
        .into_iter()
        .map(|m| (m.date, m.text))
        .collect();
    calendar.sort();
    assert_eq!(
        calendar,
        vec![
            (
                Some("2025-04-14".to_string()),
                "Dentist from 9:00 am - 10:00 am at 12 Main St".to_string()
            ),
            (
                Some("2025-04-18".to_string()),
                "All-day event: School holiday".to_string()
            ),
        ]
    );
    assert_eq!(by_creator(&all, "telegram").len(), 1);
}

fn attachment(content_type: &str, data: &str, filename: &str) -> EmailAttachment {
    EmailAttachment {
        content_type: content_type.to_string(),
        data: data.to_string(),
        filename: Some(filename.to_string()),
    }
}

/// **Test: A USPS digest becomes mail and package memories; a failed scan becomes an error entry.**
///
/// **Setup:** Two scanned images and a calendar attachment; the model reads the first image,
/// fails on the second and reports one package.
/// **Action:** `process(email, 2025-04-11)`.
/// **Expected:** Only images go to the model; report lists two pieces (second is the error entry)
/// and one package; two `mail` memories dated 2025-04-11.
#[tokio::test]
async fn test_usps_email_creates_memories() {
    let (memories, _) = repositories().await;
    let llm = ScriptedLlm::new();
    llm.push_image_reply(
        "Here you go:\n{\"sender\": \"City Water\", \"recipient\": \"Margaret\", \"type\": \"bill\"}",
    );
    llm.push_image_error("image too blurry");
    llm.push_reply(
        r#"{"packages": [{"sender": "Garden Supply Co", "status": "expected today"}],
            "summary": "One package arriving today and a water bill."}"#,
    );
    let processor = UspsProcessor::new(memories.clone(), llm.clone());

    let email = EmailPayload {
        subject: Some("Your Daily Digest".to_string()),
        html: Some("<p>1 package expected today</p>".to_string()),
        text: None,
        attachments: vec![
            attachment("image/jpeg", "aGVsbG8=", "scan1.jpg"),
            attachment("text/calendar", "QkVHSU4=", "invite.ics"),
            attachment("image/png", "d29ybGQ=", "scan2.png"),
        ],
    };

    let report = processor.process(&email, day()).await.unwrap();

    let images = llm.image_requests();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0].media_type, "image/jpeg");
    assert_eq!(images[0].bytes, b"hello");
    assert_eq!(images[1].bytes, b"world");

    assert_eq!(report.mail.len(), 2);
    assert_eq!(report.mail[0].sender, "City Water");
    assert_eq!(report.mail[0].kind, "bill");
    assert_eq!(report.mail[1].kind, "error");
    assert!(report.mail[1]
        .notes
        .as_deref()
        .unwrap()
        .starts_with("Image 2 Analysis Failed"));
    assert_eq!(report.packages.len(), 1);
    assert_eq!(report.summary, "One package arriving today and a water bill.");
    assert_eq!(report.memories_created, 2);

    let all = memories.list_all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|m| m.day() == Some("2025-04-11")
        && m.created_by.as_deref() == Some("usps")
        && m.tags.as_deref() == Some("mail")));
    let mail = all
        .iter()
        .find(|m| m.text.starts_with("expecting mail: "))
        .unwrap();
    assert!(mail.text.contains("\"type\":\"bill\""));
    let package = all
        .iter()
        .find(|m| m.text.starts_with("expecting package: "))
        .unwrap();
    assert!(package.text.contains("Garden Supply Co"));
}

/// **Test: When the summary call fails the report carries the fallback summary.**
#[tokio::test]
async fn test_usps_analysis_failure_uses_fallback() {
    let (memories, _) = repositories().await;
    let llm = ScriptedLlm::new();
    llm.push_error("timeout");
    let processor = UspsProcessor::new(memories.clone(), llm);

    let email = EmailPayload {
        subject: None,
        html: None,
        text: None,
        attachments: Vec::new(),
    };
    let report = processor.process(&email, day()).await.unwrap();

    assert!(report.mail.is_empty());
    assert!(report.packages.is_empty());
    assert_eq!(report.summary, butler::importers::usps::ANALYSIS_FALLBACK_SUMMARY);
    assert_eq!(report.memories_created, 0);
    assert!(memories.list_all().await.unwrap().is_empty());
}

fn week_of_facts() -> String {
    let facts: Vec<serde_json::Value> = (11..=17)
        .map(|d| {
            json!({
                "date": format!("2025-04-{d}"),
                "text": format!("Fact number {d}."),
                "category": "plant"
            })
        })
        .collect();
    format!(
        "Here are this week's facts.\n<facts>\n{}\n</facts>",
        serde_json::to_string_pretty(&facts).unwrap()
    )
}

/// **Test: Fun facts for the week replace earlier facts on those dates and avoid repeats.**
///
/// **Setup:** An older fun fact on 2025-04-12 and a birthday note on the same day.
/// **Action:** `FunFactGenerator::run(2025-04-11)`.
/// **Expected:** Seven `fun fact:` memories, one per date; the old fact is gone and was listed in
/// the prompt; the birthday note stays.
#[tokio::test]
async fn test_fun_facts_replace_week() {
    let (memories, _) = repositories().await;
    memories
        .create(
            NewMemory::new("fun fact: Penguins propose with pebbles.")
                .with_date(Some("2025-04-12".into()))
                .created_by("fun_fact_generator")
                .with_tags("fun_fact"),
        )
        .await
        .unwrap();
    memories
        .create(NewMemory::new("Leo's birthday").with_date(Some("2025-04-12".into())))
        .await
        .unwrap();

    let llm = ScriptedLlm::with_replies([week_of_facts()]);
    let generator = FunFactGenerator::new(memories.clone(), llm.clone());

    let stored = generator.run(day()).await.unwrap();

    assert_eq!(stored, 7);
    assert_eq!(
        texts_on(&memories, "2025-04-12").await,
        vec![
            "Leo's birthday".to_string(),
            "fun fact: Fact number 12.".to_string()
        ]
    );
    let all = memories.list_all().await.unwrap();
    let facts = by_creator(&all, "fun_fact_generator");
    assert_eq!(facts.len(), 7);
    assert!(facts.iter().all(|m| m.tags.as_deref() == Some("fun_fact")));

    let prompt = &llm.requests()[0].messages[0].content;
    assert!(prompt.contains("Penguins propose with pebbles."));
    assert!(prompt.contains("2025-04-17"));
}

#[tokio::test]
async fn test_fun_facts_without_block_fail_and_keep_old_facts() {
    let (memories, _) = repositories().await;
    memories
        .create(
            NewMemory::new("fun fact: Orchids can live for decades.")
                .with_date(Some("2025-04-13".into()))
                .with_tags("fun_fact"),
        )
        .await
        .unwrap();

    let llm = ScriptedLlm::with_replies(["I'm afraid I have no facts today."]);
    let generator = FunFactGenerator::new(memories.clone(), llm);

    let err = generator.run(day()).await.unwrap_err();

    assert!(err.to_string().contains("Failed to generate fun facts"));
    assert_eq!(memories.list_all().await.unwrap().len(), 1);
}
