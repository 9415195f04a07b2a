//! Email → coupon orchestration: preferred strategies first, heuristic last

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;
use crate::coupon::{CouponRecord, ExtractionInput};
use crate::error::ExtractionError;
use crate::extract::ai::AiExtractor;
use crate::extract::heuristic::HeuristicExtractor;
use crate::extract::traits::Extractor;

/// Record plus the name of the strategy that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    pub strategy: String,
    pub record: CouponRecord,
}

pub struct EmailCouponPipeline {
    strategies: Vec<Box<dyn Extractor>>,
    fallback: HeuristicExtractor,
}

impl EmailCouponPipeline {
    /// Pipeline with only the guaranteed fallback
    pub fn new(fallback: HeuristicExtractor) -> Self {
        Self {
            strategies: Vec::new(),
            fallback,
        }
    }

    /// Append a strategy tried before the fallback, in insertion order
    pub fn with_strategy(mut self, strategy: Box<dyn Extractor>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// AI first, heuristic fallback
    pub fn from_config(config: &Config) -> Result<Self> {
        let ai = AiExtractor::from_config(&config.extraction)?;
        if !ai.is_enabled() {
            tracing::info!("AI extraction disabled in config, running in fallback-only mode");
        } else if !ai.is_configured() {
            tracing::info!("No completion credential configured, running in fallback-only mode");
        }
        Ok(Self::new(HeuristicExtractor::new()).with_strategy(Box::new(ai)))
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(self.fallback.name()))
            .collect()
    }

    /// Extract a coupon; `None` only when both parts are empty or absent
    pub async fn process(&self, content: Option<&str>, subject: Option<&str>) -> Option<CouponRecord> {
        self.process_detailed(content, subject)
            .await
            .ok()
            .map(|outcome| outcome.record)
    }

    pub async fn process_detailed(
        &self,
        content: Option<&str>,
        subject: Option<&str>,
    ) -> Result<PipelineOutcome, ExtractionError> {
        let input = ExtractionInput::new(content, subject)?;
        Ok(self.run(&input).await)
    }

    /// Try each strategy in order; the heuristic fallback always answers
    pub async fn run(&self, input: &ExtractionInput) -> PipelineOutcome {
        for strategy in &self.strategies {
            match strategy.extract(input).await {
                Ok(Some(record)) => {
                    tracing::info!("Parsed email with {} extractor", strategy.name());
                    return PipelineOutcome {
                        record,
                        strategy: strategy.name().to_string(),
                    };
                }
                Ok(None) => {
                    tracing::debug!("{} extractor declined, trying next", strategy.name());
                }
                Err(e) => {
                    tracing::warn!("{} extractor failed, falling back: {:#}", strategy.name(), e);
                }
            }
        }

        tracing::info!("Parsed email with {} fallback", self.fallback.name());
        PipelineOutcome {
            record: self.fallback.extract_record(&input.content, &input.subject),
            strategy: self.fallback.name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::coupon::Category;
    use crate::extract::completion::{CompletionRequest, CompletionService};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Arc;

    struct CannedService(String);

    #[async_trait]
    impl CompletionService for CannedService {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _api_key: &str, _request: &CompletionRequest) -> Result<String, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenExtractor;

    #[async_trait]
    impl Extractor for BrokenExtractor {
        fn name(&self) -> &str {
            "broken"
        }

        async fn extract(&self, _input: &ExtractionInput) -> Result<Option<CouponRecord>> {
            anyhow::bail!("upstream exploded")
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn heuristic() -> HeuristicExtractor {
        HeuristicExtractor::new().with_reference_date(today())
    }

    fn pipeline_with_reply(reply: &str, api_key: Option<&str>) -> EmailCouponPipeline {
        let config = ExtractionConfig {
            api_key: api_key.map(|k| k.to_string()),
            ..ExtractionConfig::default()
        };
        let ai = AiExtractor::new(Arc::new(CannedService(reply.to_string())), &config)
            .with_reference_date(today());
        EmailCouponPipeline::new(heuristic()).with_strategy(Box::new(ai))
    }

    const CONTENT: &str = "Use code SAVE20 at checkout. Expires on June 15, 2025. $20 and over";
    const SUBJECT: &str = "Nike: $20 off";

    #[tokio::test]
    async fn test_no_input_is_absent() {
        let pipeline = EmailCouponPipeline::new(heuristic());
        assert_eq!(pipeline.process(None, None).await, None);
        assert_eq!(pipeline.process(Some(""), Some("")).await, None);
        assert!(matches!(
            pipeline.process_detailed(Some(""), None).await,
            Err(ExtractionError::NoInput)
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_matches_heuristic() {
        let pipeline = pipeline_with_reply(r#"{"brand": "Wrong"}"#, None);

        let outcome = pipeline.process_detailed(Some(CONTENT), Some(SUBJECT)).await.unwrap();
        let direct = heuristic().extract_record(CONTENT, SUBJECT);

        assert_eq!(outcome.strategy, "heuristic");
        assert_eq!(outcome.record, direct);
    }

    #[tokio::test]
    async fn test_ai_result_wins_when_available() {
        let pipeline = pipeline_with_reply(
            r#"{"brand": "Nike", "savings": "$20 off", "category": "Clothing", "expiration_date": "2025-06-15"}"#,
            Some("key"),
        );

        let outcome = pipeline.process_detailed(Some(CONTENT), Some(SUBJECT)).await.unwrap();

        assert_eq!(outcome.strategy, "ai");
        assert_eq!(outcome.record.category, Category::Clothing);
        assert_eq!(outcome.record.description, "$20 off at Nike");
    }

    #[tokio::test]
    async fn test_malformed_ai_reply_falls_back() {
        let pipeline = pipeline_with_reply("Sorry, I can't help with that.", Some("key"));

        let record = pipeline.process(Some(CONTENT), Some(SUBJECT)).await.unwrap();

        assert_eq!(record, heuristic().extract_record(CONTENT, SUBJECT));
    }

    #[tokio::test]
    async fn test_strategy_error_falls_back() {
        let pipeline = EmailCouponPipeline::new(heuristic()).with_strategy(Box::new(BrokenExtractor));

        let outcome = pipeline.process_detailed(None, Some(SUBJECT)).await.unwrap();

        assert_eq!(outcome.strategy, "heuristic");
        assert_eq!(outcome.record.brand, "Nike");
        assert_eq!(pipeline.strategy_names(), vec!["broken", "heuristic"]);
    }

    #[tokio::test]
    async fn test_outcome_json_names_strategy() {
        let pipeline = EmailCouponPipeline::new(heuristic());
        let outcome = pipeline.process_detailed(Some(CONTENT), Some(SUBJECT)).await.unwrap();

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["strategy"], "heuristic");
        assert_eq!(json["record"]["brand"], "Nike");
        assert_eq!(json["record"]["promo_code"], "SAVE20");
    }

    #[tokio::test]
    async fn test_every_field_populated() {
        let pipeline = pipeline_with_reply("{}", Some("key"));
        let inputs = [
            (Some("x"), None),
            (None, Some("y")),
            (Some("{\"weird\": true}"), Some("::")),
            (Some("From: <a@b.c>"), Some("From: ")),
        ];

        for (content, subject) in inputs {
            let record = pipeline.process(content, subject).await.unwrap();
            assert!(!record.brand.is_empty());
            assert!(!record.savings.is_empty());
            assert!(!record.description.is_empty());
            assert!(!record.criteria.is_empty());
            assert!(!record.deal_link.is_empty());
            assert!(!record.brand_logo.is_empty());
        }
    }
}
