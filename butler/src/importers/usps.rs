//! USPS Informed Delivery e-mail processor.
//!
//! Each scanned mail piece (image attachment) is described by a vision call; the e-mail HTML plus
//! those descriptions are then summarized into expected packages. Results become
//! `expecting mail: [...]` and `expecting package: [...]` memories dated today.

use crate::directives::extract_json;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use llm_client::LlmClient;
use prompt::ChatMessage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{MemoryRepository, NewMemory};
use tracing::{error, info, instrument, warn};

pub const USPS_SOURCE: &str = "usps";
pub const MAIL_TAG: &str = "mail";
pub const ANALYSIS_FALLBACK_SUMMARY: &str = "Unable to analyze email content.";
const ANALYSIS_MAX_TOKENS: u32 = 4096;

const MAIL_PIECE_INSTRUCTION: &str = r#"This is a scan of a piece of mail we received at our household. Respond with a JSON blob summarizing the piece of mail, with the following fields:

{
  /* Name of sender as written on the mail, e.g. "Delta Airlines" for a business or "John Doe" for an individual */
  "sender": string,
  /* Name of the household member it is addressed to. If it is addressed to the whole household use "Both"; for anyone else use "Other" */
  "recipient": string,
  /* Mail from an individual is usually personal. Bills, statements or anything that may require action are transactional. Obvious offers and catalogues are ads. When unsure, lean transactional. */
  "type": "personal" | "transactional" | "ad",
  /* Optional: any extra writing on the scan, e.g. "important, action required" */
  "notes": string
}

Do not return any other text, only the JSON blob."#;

/// An inbound e-mail as delivered by the mail webhook.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailPayload {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<EmailAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAttachment {
    pub content_type: String,
    /// Base64 body.
    pub data: String,
    #[serde(default)]
    pub filename: Option<String>,
}

impl EmailAttachment {
    fn is_image(&self) -> bool {
        self.content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailPiece {
    pub sender: String,
    pub recipient: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MailPiece {
    fn failed(index: usize, reason: impl std::fmt::Display) -> Self {
        Self {
            sender: "Error".to_string(),
            recipient: "Error".to_string(),
            kind: "error".to_string(),
            notes: Some(format!("Image {index} Analysis Failed: {reason}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageNotice {
    pub sender: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
struct EmailAnalysis {
    #[serde(default)]
    packages: Vec<PackageNotice>,
    #[serde(default)]
    summary: String,
}

impl Default for EmailAnalysis {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            summary: ANALYSIS_FALLBACK_SUMMARY.to_string(),
        }
    }
}

/// What one e-mail produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UspsReport {
    pub mail: Vec<MailPiece>,
    pub packages: Vec<PackageNotice>,
    pub summary: String,
    pub memories_created: usize,
}

fn analysis_prompt(html: &str, mail: &[MailPiece]) -> String {
    let mail_json = serde_json::to_string(mail).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"Analyze the following content from an email and respond with a JSON blob (only JSON, no other text) with two parts.

The email is from USPS and shows mail the household is receiving. Package metadata is in the email itself. Mail pieces are scanned images, summarized below.

1. An array of upcoming packages, each with:
   - sender: string (name of the sender)
   - status: "expected today" | "expected 1-2 days" | "awaiting from sender"

2. A short, positive summary of the mail in a sentence or two, the way a competent assistant would put it. Examples:
   - "Quiet day today! Just a couple of ads, nothing of note."
   - "A few packages arriving soon, keep an eye out!"
   - "A couple of possibly important items today; make sure to review the letter from the IRS."

Respond with a JSON object in this format:
{{
  "packages": [{{ "sender": string, "status": string }}],
  "summary": string
}}

Here is the HTML content of the email:

{html}

And here is info about the mail pieces:

{mail_json}"#
    )
}

#[derive(Clone)]
pub struct UspsProcessor {
    memories: MemoryRepository,
    llm: Arc<dyn LlmClient>,
}

impl UspsProcessor {
    pub fn new(memories: MemoryRepository, llm: Arc<dyn LlmClient>) -> Self {
        Self { memories, llm }
    }

    async fn describe_piece(&self, index: usize, attachment: &EmailAttachment) -> MailPiece {
        let result: Result<MailPiece> = async {
            let bytes = STANDARD
                .decode(attachment.data.trim())
                .context("attachment is not valid base64")?;
            let raw = self
                .llm
                .describe_image(
                    attachment.content_type.trim(),
                    &bytes,
                    MAIL_PIECE_INSTRUCTION,
                    Some(ANALYSIS_MAX_TOKENS),
                )
                .await?;
            let value = extract_json(&raw).context("model reply contained no JSON")?;
            let piece: MailPiece =
                serde_json::from_value(value).context("model reply was not a mail piece")?;
            Ok(piece)
        }
        .await;

        match result {
            Ok(piece) => piece,
            Err(e) => {
                error!(image = index, error = %e, "Mail piece analysis failed");
                MailPiece::failed(index, e)
            }
        }
    }

    async fn analyze_email(&self, html: &str, mail: &[MailPiece]) -> EmailAnalysis {
        let result: Result<EmailAnalysis> = async {
            let raw = self
                .llm
                .complete(
                    "",
                    vec![ChatMessage::user(analysis_prompt(html, mail))],
                    Some(ANALYSIS_MAX_TOKENS),
                )
                .await?;
            let value = extract_json(&raw).context("model reply contained no JSON")?;
            Ok(serde_json::from_value(value)?)
        }
        .await;

        result.unwrap_or_else(|e| {
            error!(error = %e, "E-mail analysis failed");
            EmailAnalysis::default()
        })
    }

    /// Analyzes one e-mail and stores the resulting memories under `today`.
    #[instrument(skip(self, email), fields(subject = ?email.subject, attachments = email.attachments.len()))]
    pub async fn process(&self, email: &EmailPayload, today: NaiveDate) -> Result<UspsReport> {
        let mut mail = Vec::new();
        let mut index = 0;
        for attachment in &email.attachments {
            if !attachment.is_image() {
                warn!(
                    content_type = %attachment.content_type,
                    filename = ?attachment.filename,
                    "Skipping non-image attachment"
                );
                continue;
            }
            index += 1;
            mail.push(self.describe_piece(index, attachment).await);
        }

        let analysis = self
            .analyze_email(email.html.as_deref().unwrap_or_default(), &mail)
            .await;

        let date = today.format("%Y-%m-%d").to_string();
        let mut texts = Vec::new();
        if !mail.is_empty() {
            texts.push(format!("expecting mail: {}", serde_json::to_string(&mail)?));
        }
        if !analysis.packages.is_empty() {
            texts.push(format!(
                "expecting package: {}",
                serde_json::to_string(&analysis.packages)?
            ));
        }

        for text in &texts {
            self.memories
                .create(
                    NewMemory::new(text.clone())
                        .with_date(Some(date.clone()))
                        .created_by(USPS_SOURCE)
                        .with_tags(MAIL_TAG),
                )
                .await?;
        }

        info!(
            mail = mail.len(),
            packages = analysis.packages.len(),
            memories = texts.len(),
            "USPS e-mail processed"
        );
        Ok(UspsReport {
            mail,
            packages: analysis.packages,
            summary: analysis.summary,
            memories_created: texts.len(),
        })
    }
}
