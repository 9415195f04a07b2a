//! AI extraction: prompt a completion service, then normalize its JSON answer

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::ExtractionConfig;
use crate::coupon::{parse_date, Category, CouponDraft, CouponRecord, ExtractionInput};
use crate::error::ExtractionError;
use crate::extract::completion::{CompletionRequest, CompletionService, OpenRouterClient};
use crate::extract::traits::Extractor;

const SYSTEM_PROMPT: &str =
    "You are a specialized email parser that extracts structured data from promotional emails.";

/// Extractor backed by an external chat-completion model
pub struct AiExtractor {
    service: Arc<dyn CompletionService>,
    enabled: bool,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    max_tokens: u32,
    reference_date: Option<NaiveDate>,
}

impl AiExtractor {
    pub fn new(service: Arc<dyn CompletionService>, config: &ExtractionConfig) -> Self {
        Self {
            service,
            enabled: config.enabled,
            api_key: config.credential().map(|k| k.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            reference_date: None,
        }
    }

    /// Build with the HTTP client described by `config`
    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        let client = OpenRouterClient::new(config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Run one completion round-trip and normalize the result
    pub async fn try_extract(&self, input: &ExtractionInput) -> Result<CouponRecord, ExtractionError> {
        if !self.enabled {
            return Err(ExtractionError::Disabled);
        }
        let api_key = self.api_key.as_deref().ok_or(ExtractionError::NotConfigured)?;

        let request = CompletionRequest {
            model: self.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            user: build_prompt(&input.content, &input.subject),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let reply = self.service.complete(api_key, &request).await?;
        let payload = decode_payload(&reply)?;

        Ok(normalize_payload(&payload, self.today()))
    }
}

#[async_trait]
impl Extractor for AiExtractor {
    fn name(&self) -> &str {
        "ai"
    }

    async fn extract(&self, input: &ExtractionInput) -> Result<Option<CouponRecord>> {
        match self.try_extract(input).await {
            Ok(record) => Ok(Some(record)),
            Err(ExtractionError::Disabled) => {
                tracing::debug!("AI extraction disabled in config, skipping");
                Ok(None)
            }
            Err(ExtractionError::NotConfigured) => {
                tracing::info!("Completion API key is not configured, skipping AI extraction");
                Ok(None)
            }
            Err(e) if e.is_service_unavailable() => {
                tracing::warn!("AI extraction via {} failed: {}", self.service.name(), e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Field list and output rules sent ahead of the email
pub fn build_prompt(content: &str, subject: &str) -> String {
    let categories: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();

    format!(
        "Extract these fields from the email:\n\
         - brand\n\
         - savings\n\
         - description\n\
         - expiration_date (YYYY-MM-DD)\n\
         - criteria\n\
         - category ({})\n\
         - deal_link\n\
         - promo_code\n\
         \n\
         Return ONLY a JSON object.\n\
         \n\
         EMAIL CONTENT:\n\
         Subject: {}\n\
         \n\
         {}",
        categories.join("/"),
        subject,
        content
    )
}

/// Locate the first balanced `{...}` in free text, ignoring braces inside JSON strings
pub fn locate_json_object(text: &str) -> Option<&str> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(start, _)| balanced_end(&text[start..]).map(|end| &text[start..start + end]))
}

/// Byte length of the balanced object at the start of `s`
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

/// Find and decode the JSON object in a completion reply
pub fn decode_payload(reply: &str) -> Result<Map<String, Value>, ExtractionError> {
    let json = locate_json_object(reply).ok_or(ExtractionError::NoPayload)?;

    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        other => Err(ExtractionError::Decode(format!("expected object, got {}", other))),
    }
}

/// Apply defaults to a decoded payload. The logo is always derived from the brand.
pub fn normalize_payload(payload: &Map<String, Value>, today: NaiveDate) -> CouponRecord {
    CouponDraft {
        brand: field_text(payload, "brand"),
        savings: field_text(payload, "savings"),
        description: field_text(payload, "description"),
        expiration_date: field_text(payload, "expiration_date").as_deref().and_then(parse_date),
        criteria: field_text(payload, "criteria"),
        category: field_text(payload, "category").as_deref().and_then(Category::from_label),
        deal_link: field_text(payload, "deal_link"),
        promo_code: field_text(payload, "promo_code"),
    }
    .finalize(today)
}

/// String (or numeric) value of a payload key
fn field_text(payload: &Map<String, Value>, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
