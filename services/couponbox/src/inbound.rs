//! Payload models for the two ways email reaches the pipeline:
//! an inbound-mail webhook and a direct parse request

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::coupon::ExtractionInput;
use crate::error::ExtractionError;

static ANGLE_ADDRESS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([^>]+)>").unwrap());

/// Inbound-mail webhook body (Postmark-style field names)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InboundEmail {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text_body: Option<String>,
    #[serde(default)]
    pub html_body: Option<String>,
}

impl InboundEmail {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Address inside `<...>` when present, otherwise the raw `From` value
    pub fn sender_address(&self) -> Option<String> {
        let from = self.from.as_deref()?.trim();
        if from.is_empty() {
            return None;
        }

        let address = ANGLE_ADDRESS
            .captures(from)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(from);
        Some(address.to_string())
    }

    /// Plain-text body preferred over HTML
    pub fn body(&self) -> Option<&str> {
        non_empty(self.text_body.as_deref()).or_else(|| non_empty(self.html_body.as_deref()))
    }

    /// A webhook without any body is rejected even if it has a subject
    pub fn to_input(&self) -> Result<ExtractionInput, ExtractionError> {
        let body = self.body().ok_or(ExtractionError::NoInput)?;
        ExtractionInput::new(Some(body), self.subject.as_deref())
    }
}

/// Direct parse request: either field may be missing, not both
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseEmailRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

impl ParseEmailRequest {
    pub fn to_input(&self) -> Result<ExtractionInput, ExtractionError> {
        ExtractionInput::new(self.content.as_deref(), self.subject.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
